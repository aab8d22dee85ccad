//! Generate static files

use anyhow::{Context as _, Result};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use std::time::{Duration, Instant};

use crate::cache::{self, CacheDb, ChangeSet};
use crate::content::{ContentLoader, Post};
use crate::generator::Generator;
use crate::Blog;

/// Generate the static site (with incremental support)
pub async fn run(blog: &Blog) -> Result<()> {
    run_with_options(blog, false).await
}

/// Generate with force option
pub async fn run_with_options(blog: &Blog, force: bool) -> Result<()> {
    let start = Instant::now();

    let loader = ContentLoader::new(blog)?;
    let master_ref = loader
        .client()
        .master_ref()
        .await
        .context("Failed to read the repository's master ref")?
        .to_string();
    let stamps = loader.load_post_uids().await?;
    tracing::info!("Found {} posts at ref {}", stamps.len(), master_ref);

    let cache = CacheDb::load(&blog.base_dir);
    let config_hash = config_hash(blog)?;
    let assets_hash = cache::hash_directory(&blog.static_dir)?;

    let changeset = if force {
        tracing::info!("Full generation (force)");
        ChangeSet::full_rebuild()
    } else {
        cache::detect_changes(&cache, &master_ref, config_hash, assets_hash, &stamps)
    };

    if !changeset.has_changes() {
        tracing::info!("No changes detected, skipping generation");
        tracing::info!(
            "Completed in {:.2}s (no changes)",
            start.elapsed().as_secs_f64()
        );
        return Ok(());
    }

    tracing::info!("Changes detected: {}", changeset.summary());

    let pages = loader.load_all_pages().await?;
    let generator = Generator::new(blog)?;

    if changeset.full_rebuild {
        let uids: Vec<&str> = stamps.iter().map(|s| s.uid.as_str()).collect();
        let posts = load_posts(&loader, &uids).await?;
        generator.generate(&pages, &posts)?;
    } else {
        let uids: Vec<&str> = changeset.changed_posts.iter().map(String::as_str).collect();
        let posts = load_posts(&loader, &uids).await?;
        generator.generate_incremental(&pages, &posts, &changeset.deleted_posts)?;
    }

    let mut new_cache = CacheDb::new();
    cache::update_cache(&mut new_cache, &master_ref, config_hash, assets_hash, &stamps);
    new_cache.save(&blog.base_dir)?;

    tracing::info!("Generated in {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}

/// Fetch full posts one by one, skipping uids that vanished meanwhile
async fn load_posts(loader: &ContentLoader<'_>, uids: &[&str]) -> Result<Vec<Post>> {
    let mut posts = Vec::with_capacity(uids.len());
    for uid in uids {
        match loader.load_post(uid).await? {
            Some(post) => posts.push(post),
            None => tracing::warn!("Post {} disappeared while generating", uid),
        }
    }
    tracing::debug!("Loaded {} posts", posts.len());
    Ok(posts)
}

/// Hash of everything besides CMS content that shapes the output
fn config_hash(blog: &Blog) -> Result<u64> {
    let file_hash = cache::hash_file(&blog.config_path())?;
    let languages_hash = cache::hash_directory(&blog.languages_dir)?;
    Ok(cache::hash_content(&format!(
        "{}\n{}\n{}",
        file_hash, languages_hash, blog.config.prismic.endpoint
    )))
}

/// Regenerate on config/static changes and poll the repository every `interval`
pub async fn watch(blog: &Blog, interval: Duration) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

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
    }
    for dir in [&blog.static_dir, &blog.languages_dir] {
        if dir.exists() {
            debouncer.watcher().watch(dir, RecursiveMode::Recursive)?;
            tracing::debug!("Watching: {:?}", dir);
        }
    }

    tracing::info!(
        "Watching for changes, polling Prismic every {}s. Press Ctrl+C to stop.",
        interval.as_secs()
    );

    let mut blog = blog.clone();
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(Ok(events)) => {
                    for event in &events {
                        tracing::debug!("File changed: {:?}", event.path);
                    }
                    tracing::info!("Files changed, regenerating...");
                    match Blog::new(&blog.base_dir) {
                        Ok(reloaded) => blog = reloaded,
                        Err(e) => {
                            tracing::error!("Failed to reload config: {:#}", e);
                            continue;
                        }
                    }
                    if let Err(e) = run(&blog).await {
                        tracing::error!("Generation failed: {:#}", e);
                    }
                }
                Some(Err(e)) => tracing::error!("Watch error: {:?}", e),
                None => break,
            },
            _ = ticker.tick() => {
                tracing::debug!("Checking Prismic for a new release");
                if let Err(e) = run(&blog).await {
                    tracing::error!("Generation failed: {:#}", e);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CACHE_DIR;
    use crate::test_support::{post_doc, MockPrismic};
    use std::fs;
    use tempfile::TempDir;

    fn site(mock: &MockPrismic) -> (TempDir, Blog) {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("_config.yml"),
            format!(
                "title: spacetraveling\ntimezone: UTC\nprismic:\n  endpoint: {}\n  page_size: 1\n",
                mock.endpoint
            ),
        )
        .unwrap();
        let mut blog = Blog::new(dir.path()).unwrap();
        blog.config.prismic.endpoint = mock.endpoint.clone();
        blog.config.prismic.access_token = None;
        (dir, blog)
    }

    #[tokio::test]
    async fn test_generate_then_incremental() {
        let mock = MockPrismic::spawn(vec![
            post_doc("second", "Second", "2021-03-19T10:00:00+0000"),
            post_doc("first", "First", "2021-03-18T10:00:00+0000"),
        ])
        .await;
        let (dir, blog) = site(&mock);

        run(&blog).await.unwrap();
        let public = &blog.public_dir;
        let index = fs::read_to_string(public.join("index.html")).unwrap();
        assert!(index.contains("Second"));
        assert!(index.contains(r#"href="/page/2/#first""#));
        assert!(public.join("page/2/index.html").exists());
        let post = fs::read_to_string(public.join("post/first/index.html")).unwrap();
        assert!(post.contains("<strong>Nullam</strong>"));
        assert!(post.contains("<ul><li>Ut varius</li><li>Nunc viverra</li></ul>"));
        assert!(dir.path().join(CACHE_DIR).join("db.json").exists());

        // Same release: nothing but the uid listing is fetched
        let before = mock.search_requests();
        run(&blog).await.unwrap();
        assert_eq!(mock.search_requests(), before + 1);

        // New release: one post edited, one unpublished
        mock.publish(
            vec![post_doc("second", "Second, revised", "2021-04-01T10:00:00+0000")],
            "master-2",
        );
        run(&blog).await.unwrap();
        let post = fs::read_to_string(public.join("post/second/index.html")).unwrap();
        assert!(post.contains("Second, revised"));
        assert!(!public.join("post/first").exists());
        assert!(!public.join("page/2").exists());
    }

    #[tokio::test]
    async fn test_force_rebuilds_everything() {
        let mock =
            MockPrismic::spawn(vec![post_doc("only", "Only", "2021-03-19T10:00:00+0000")]).await;
        let (_dir, blog) = site(&mock);

        run(&blog).await.unwrap();
        fs::remove_file(blog.public_dir.join("post/only/index.html")).unwrap();

        run(&blog).await.unwrap();
        assert!(!blog.public_dir.join("post/only/index.html").exists());

        run_with_options(&blog, true).await.unwrap();
        assert!(blog.public_dir.join("post/only/index.html").exists());
    }

    #[tokio::test]
    async fn test_missing_endpoint_fails() {
        let dir = TempDir::new().unwrap();
        let mut blog = Blog::new(dir.path()).unwrap();
        blog.config.prismic.endpoint = String::new();
        assert!(run(&blog).await.is_err());
    }
}
