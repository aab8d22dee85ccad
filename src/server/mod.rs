//! Preview server with live reload

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::Blog;

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// Server state
struct ServerState {
    public_dir: PathBuf,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

/// Start the preview server
pub async fn start(blog: &Blog, ip: &str, port: u16, watch: bool, open: bool) -> Result<()> {
    let (reload_tx, _) = broadcast::channel::<()>(16);

    let state = Arc::new(ServerState {
        public_dir: blog.public_dir.clone(),
        reload_tx: reload_tx.clone(),
        live_reload: watch,
    });

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    if watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    if watch {
        let blog = blog.clone();
        tokio::spawn(async move {
            if let Err(e) = watch_and_reload(blog, reload_tx).await {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/__livereload", get(livereload_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Watch the config, static files and labels and regenerate on change
async fn watch_and_reload(mut blog: Blog, reload_tx: broadcast::Sender<()>) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    // Debounce to avoid multiple rapid rebuilds
    let mut debouncer = new_debouncer(
        Duration::from_millis(500),
        move |res: DebounceEventResult| {
            let _ = tx.send(res);
        },
    )?;

    let config_path = blog.config_path();
    if config_path.exists() {
        debouncer
            .watcher()
            .watch(&config_path, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching: {:?}", config_path);
    }
    for dir in [&blog.static_dir, &blog.languages_dir] {
        if dir.exists() {
            debouncer.watcher().watch(dir, RecursiveMode::Recursive)?;
            tracing::debug!("Watching: {:?}", dir);
        }
    }

    while let Some(result) = rx.recv().await {
        let events = match result {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("Watch error: {:?}", e);
                continue;
            }
        };

        let relevant: Vec<_> = events
            .iter()
            .filter(|e| {
                let path_str = e.path.to_string_lossy();
                !path_str.contains(".DS_Store") && !path_str.ends_with('~')
            })
            .collect();
        if relevant.is_empty() {
            continue;
        }

        println!();
        for event in &relevant {
            println!("📝 File changed: {}", event.path.display());
        }

        println!("\n🔄 Regenerating...");
        match Blog::new(&blog.base_dir) {
            Ok(reloaded) => blog = reloaded,
            Err(e) => {
                println!("❌ Invalid config: {:#}", e);
                continue;
            }
        }
        match blog.generate().await {
            Ok(()) => {
                println!("✅ Regenerated successfully!");
                let _ = reload_tx.send(());
            }
            Err(e) => {
                println!("❌ Generation failed: {:#}", e);
            }
        }
    }

    Ok(())
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Map a request path to a file under the public dir, `None` if it escapes it
fn resolve_path(public_dir: &Path, path: &str) -> Option<PathBuf> {
    let clean_path = path.trim_start_matches('/');
    let relative = Path::new(clean_path);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let candidate = public_dir.join(relative);
    if candidate.is_dir() {
        return Some(candidate.join("index.html"));
    }
    if candidate.exists() {
        return Some(candidate);
    }

    // Try adding .html extension
    let with_html = public_dir.join(format!("{}.html", clean_path));
    if with_html.exists() {
        Some(with_html)
    } else {
        Some(candidate)
    }
}

/// Serves files, injecting the live reload script into HTML and
/// answering unknown paths with `404.html`
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let path = match percent_decode_str(request.uri().path()).decode_utf8() {
        Ok(path) => path.into_owned(),
        Err(_) => return not_found(&state).await,
    };
    let file_path = match resolve_path(&state.public_dir, &path) {
        Some(path) if path.is_file() => path,
        _ => return not_found(&state).await,
    };

    let is_html = file_path
        .extension()
        .map(|ext| ext == "html" || ext == "htm")
        .unwrap_or(false);

    if is_html && state.live_reload {
        match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => Html(inject_live_reload(&content)).into_response(),
            Err(_) => not_found(&state).await,
        }
    } else {
        // Serve static file using tower-http
        let mut service = ServeDir::new(&state.public_dir).append_index_html_on_directories(true);
        match service.try_call(request).await {
            Ok(response) => response.into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
        }
    }
}

async fn not_found(state: &ServerState) -> Response {
    match tokio::fs::read_to_string(state.public_dir.join("404.html")).await {
        Ok(content) => {
            let content = if state.live_reload {
                inject_live_reload(&content)
            } else {
                content
            };
            (StatusCode::NOT_FOUND, Html(content)).into_response()
        }
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Inject live reload script into HTML content
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replace("</body>", LIVE_RELOAD_SCRIPT)
    } else {
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn public_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("post/hooks")).unwrap();
        fs::write(
            dir.path().join("post/hooks/index.html"),
            "<html><body>Hooks</body></html>",
        )
        .unwrap();
        fs::write(dir.path().join("404.html"), "<body>Post não encontrado</body>").unwrap();
        fs::write(dir.path().join("Logo.svg"), "<svg/>").unwrap();
        fs::create_dir_all(dir.path().join("post/ação")).unwrap();
        fs::write(
            dir.path().join("post/ação/index.html"),
            "<html><body>Ação</body></html>",
        )
        .unwrap();
        fs::write(dir.path().join("my logo.svg"), "<svg id=\"spaced\"/>").unwrap();
        dir
    }

    async fn serve(public: &Path, live_reload: bool) -> String {
        let (reload_tx, _) = broadcast::channel::<()>(16);
        let state = Arc::new(ServerState {
            public_dir: public.to_path_buf(),
            reload_tx,
            live_reload,
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        base
    }

    #[test]
    fn test_resolve_path() {
        let dir = public_dir();
        assert_eq!(
            resolve_path(dir.path(), "/post/hooks/"),
            Some(dir.path().join("post/hooks/index.html"))
        );
        assert_eq!(
            resolve_path(dir.path(), "/Logo.svg"),
            Some(dir.path().join("Logo.svg"))
        );
        assert_eq!(resolve_path(dir.path(), "/../secret"), None);
    }

    #[test]
    fn test_inject_live_reload() {
        let html = inject_live_reload("<html><body>Hi</body></html>");
        assert!(html.contains("__livereload"));
        assert!(html.ends_with("</html>"));
        assert!(inject_live_reload("Hi").contains("__livereload"));
    }

    #[tokio::test]
    async fn test_serves_pages_with_live_reload() {
        let dir = public_dir();
        let base = serve(dir.path(), true).await;

        let response = reqwest::get(format!("{}/post/hooks/", base)).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body = response.text().await.unwrap();
        assert!(body.contains("Hooks"));
        assert!(body.contains("__livereload"));

        let response = reqwest::get(format!("{}/post/missing/", base)).await.unwrap();
        assert_eq!(response.status().as_u16(), 404);
        assert!(response.text().await.unwrap().contains("Post não encontrado"));
    }

    #[tokio::test]
    async fn test_serves_static_files() {
        let dir = public_dir();
        let base = serve(dir.path(), false).await;

        let response = reqwest::get(format!("{}/Logo.svg", base)).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.text().await.unwrap(), "<svg/>");

        let response = reqwest::get(format!("{}/post/hooks/", base)).await.unwrap();
        assert!(!response.text().await.unwrap().contains("__livereload"));
    }

    #[tokio::test]
    async fn test_serves_percent_encoded_paths() {
        let dir = public_dir();
        for live_reload in [true, false] {
            let base = serve(dir.path(), live_reload).await;

            let response = reqwest::get(format!("{}/post/a%C3%A7%C3%A3o/", base))
                .await
                .unwrap();
            assert_eq!(response.status().as_u16(), 200);
            assert!(response.text().await.unwrap().contains("Ação"));

            let response = reqwest::get(format!("{}/my%20logo.svg", base)).await.unwrap();
            assert_eq!(response.status().as_u16(), 200);
            assert_eq!(response.text().await.unwrap(), "<svg id=\"spaced\"/>");

            let response = reqwest::get(format!("{}/post/%FF/", base)).await.unwrap();
            assert_eq!(response.status().as_u16(), 404);

            let response = reqwest::get(format!("{}/%2E%2E/secret", base)).await.unwrap();
            assert_eq!(response.status().as_u16(), 404);
        }
    }
}
