//! In-process stand-in for a Prismic repository, used by tests

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct MockState {
    base: String,
    docs: Mutex<Vec<Value>>,
    master_ref: Mutex<String>,
    api_requests: AtomicUsize,
    search_requests: AtomicUsize,
}

/// A running mock repository
pub struct MockPrismic {
    /// API entry point, `http://127.0.0.1:<port>/api/v2`
    pub endpoint: String,
    state: Arc<MockState>,
}

impl MockPrismic {
    /// Serve `docs` (in result order) on a random local port
    pub async fn spawn(docs: Vec<Value>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let state = Arc::new(MockState {
            base: base.clone(),
            docs: Mutex::new(docs),
            master_ref: Mutex::new("master-1".to_string()),
            api_requests: AtomicUsize::new(0),
            search_requests: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/api/v2", get(api_root))
            .route("/api/v2/documents/search", get(search))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            endpoint: format!("{}/api/v2", base),
            state,
        }
    }

    /// Publish a new release: replace documents and bump the master ref
    pub fn publish(&self, docs: Vec<Value>, master_ref: &str) {
        *self.state.docs.lock().unwrap() = docs;
        *self.state.master_ref.lock().unwrap() = master_ref.to_string();
    }

    pub fn api_requests(&self) -> usize {
        self.state.api_requests.load(Ordering::SeqCst)
    }

    pub fn search_requests(&self) -> usize {
        self.state.search_requests.load(Ordering::SeqCst)
    }
}

async fn api_root(State(state): State<Arc<MockState>>) -> Json<Value> {
    state.api_requests.fetch_add(1, Ordering::SeqCst);
    let master = state.master_ref.lock().unwrap().clone();
    Json(json!({
        "refs": [
            {"id": "master", "ref": master, "label": "Master", "isMasterRef": true}
        ],
        "types": {"posts": "Posts"}
    }))
}

async fn search(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.search_requests.fetch_add(1, Ordering::SeqCst);

    let master = state.master_ref.lock().unwrap().clone();
    if params.get("ref") != Some(&master) {
        return (StatusCode::BAD_REQUEST, "unknown ref").into_response();
    }

    let q = params.get("q").cloned().unwrap_or_default();
    let wanted_uid = q
        .split_once(".uid, \"")
        .and_then(|(_, rest)| rest.split_once('"'))
        .map(|(uid, _)| uid.to_string());

    let docs: Vec<Value> = state
        .docs
        .lock()
        .unwrap()
        .iter()
        .filter(|d| match &wanted_uid {
            Some(uid) => d["uid"].as_str() == Some(uid.as_str()),
            None => true,
        })
        .cloned()
        .collect();

    let page_size: usize = params
        .get("pageSize")
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);
    let page: usize = params
        .get("page")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);
    let total_pages = docs.len().div_ceil(page_size);
    let results: Vec<Value> = docs
        .iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .cloned()
        .collect();

    let page_url = |n: usize| {
        let mut pairs: Vec<(String, String)> = params
            .iter()
            .filter(|(k, _)| k.as_str() != "page")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.push(("page".to_string(), n.to_string()));
        url::Url::parse_with_params(&format!("{}/api/v2/documents/search", state.base), pairs)
            .unwrap()
            .to_string()
    };

    let next_page = (page < total_pages).then(|| page_url(page + 1));
    let prev_page = (page > 1).then(|| page_url(page - 1));

    Json(json!({
        "page": page,
        "results_per_page": page_size,
        "results_size": results.len(),
        "total_results_size": docs.len(),
        "total_pages": total_pages,
        "next_page": next_page,
        "prev_page": prev_page,
        "results": results,
    }))
    .into_response()
}

/// A `posts` document with two content groups
pub fn post_doc(uid: &str, title: &str, published: &str) -> Value {
    json!({
        "id": format!("id-{}", uid),
        "uid": uid,
        "type": "posts",
        "first_publication_date": published,
        "last_publication_date": published,
        "data": {
            "title": title,
            "subtitle": format!("About {}", title),
            "author": "Joseph Oliveira",
            "banner": {"url": format!("https://images.prismic.io/{}.png", uid), "alt": null},
            "content": [
                {
                    "heading": "Proin et varius",
                    "body": [
                        {"type": "paragraph", "text": "Nullam dolor sapien, vulputate eu diam at.", "spans": [
                            {"start": 0, "end": 6, "type": "strong"}
                        ]}
                    ]
                },
                {
                    "heading": "Cras laoreet mi",
                    "body": [
                        {"type": "list-item", "text": "Ut varius", "spans": []},
                        {"type": "list-item", "text": "Nunc viverra", "spans": []}
                    ]
                }
            ]
        }
    })
}
