//! Cache module for incremental generation
//!
//! Remembers which release (master ref) the site was last built from and the
//! publication stamp of every post, so a rebuild only rewrites what changed.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::content::PostStamp;

/// Cache directory name
pub const CACHE_DIR: &str = ".spacetraveling-cache";

/// Cache file name
const CACHE_FILE: &str = "db.json";

/// Represents a cached entry for a generated post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Publication stamp the page was generated from
    pub last_publication_date: Option<String>,
}

/// Cache database for tracking content changes
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheDb {
    /// Version of the cache format
    pub version: u32,
    /// Master ref of the last build
    pub master_ref: String,
    /// Hash of the site config (changes trigger full rebuild)
    pub config_hash: u64,
    /// Hash of the static directory (changes trigger full rebuild)
    pub assets_hash: u64,
    /// Cached entries for posts, keyed by uid
    pub posts: HashMap<String, CacheEntry>,
}

impl CacheDb {
    /// Current cache format version
    const VERSION: u32 = 1;

    /// Load cache from disk, or create a new empty cache
    pub fn load(base_dir: &Path) -> Self {
        let cache_path = base_dir.join(CACHE_DIR).join(CACHE_FILE);
        if let Ok(content) = fs::read_to_string(&cache_path) {
            if let Ok(cache) = serde_json::from_str::<CacheDb>(&content) {
                if cache.version == Self::VERSION {
                    return cache;
                }
                tracing::info!("Cache version mismatch, rebuilding cache");
            }
        }
        Self::default()
    }

    /// Save cache to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let cache_dir = base_dir.join(CACHE_DIR);
        fs::create_dir_all(&cache_dir)?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(cache_dir.join(CACHE_FILE), content)?;
        Ok(())
    }

    /// Create a new cache with version set
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    /// Whether nothing was ever built with this cache
    pub fn is_empty(&self) -> bool {
        self.master_ref.is_empty()
    }
}

/// Change detection result
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    /// Posts that need regeneration (uid)
    pub changed_posts: Vec<String>,
    /// Posts that were unpublished (uid)
    pub deleted_posts: Vec<String>,
    /// Whether to regenerate everything (config or static files changed)
    pub full_rebuild: bool,
}

impl ChangeSet {
    /// Create a changeset indicating full rebuild is needed
    pub fn full_rebuild() -> Self {
        Self {
            changed_posts: Vec::new(),
            deleted_posts: Vec::new(),
            full_rebuild: true,
        }
    }

    /// Create an empty changeset (no changes)
    pub fn empty() -> Self {
        Self {
            changed_posts: Vec::new(),
            deleted_posts: Vec::new(),
            full_rebuild: false,
        }
    }

    /// Check if any changes were detected.
    ///
    /// List pages and the feed only change when a post does, so a release
    /// touching no post needs no regeneration.
    pub fn has_changes(&self) -> bool {
        self.full_rebuild
            || !self.changed_posts.is_empty()
            || !self.deleted_posts.is_empty()
    }

    /// Get summary of changes for logging
    pub fn summary(&self) -> String {
        if self.full_rebuild {
            return "full rebuild required".to_string();
        }

        let mut parts = Vec::new();
        if !self.changed_posts.is_empty() {
            parts.push(format!("{} posts changed", self.changed_posts.len()));
        }
        if !self.deleted_posts.is_empty() {
            parts.push(format!("{} posts deleted", self.deleted_posts.len()));
        }

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Calculate a hash for file content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Calculate a hash for a file on disk, 0 if it does not exist
pub fn hash_file(path: &Path) -> Result<u64> {
    if !path.exists() {
        return Ok(0);
    }
    let content = fs::read(path)?;
    Ok(hash_content(&String::from_utf8_lossy(&content)))
}

/// Calculate hash for a directory (paths and contents of every file)
pub fn hash_directory(dir: &Path) -> Result<u64> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use walkdir::WalkDir;

    let mut hasher = DefaultHasher::new();
    if !dir.exists() {
        return Ok(0);
    }

    // Collect and sort paths for deterministic ordering
    let mut paths: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.path().to_path_buf())
        .collect();

    paths.sort();

    for path in paths {
        if let Ok(content) = fs::read(&path) {
            path.strip_prefix(dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .hash(&mut hasher);
            content.hash(&mut hasher);
        }
    }

    Ok(hasher.finish())
}

/// Detect changes between the repository's current state and the cached build
pub fn detect_changes(
    cache: &CacheDb,
    master_ref: &str,
    config_hash: u64,
    assets_hash: u64,
    current_posts: &[PostStamp],
) -> ChangeSet {
    if cache.is_empty() {
        tracing::info!("No previous build, full rebuild required");
        return ChangeSet::full_rebuild();
    }

    if config_hash != cache.config_hash {
        tracing::info!("Config changed, full rebuild required");
        return ChangeSet::full_rebuild();
    }

    if assets_hash != cache.assets_hash {
        tracing::info!("Static files changed, full rebuild required");
        return ChangeSet::full_rebuild();
    }

    if master_ref == cache.master_ref {
        return ChangeSet::empty();
    }

    let mut changeset = ChangeSet::empty();

    for stamp in current_posts {
        match cache.posts.get(&stamp.uid) {
            Some(cached) if cached.last_publication_date == stamp.last_publication_date => {}
            Some(_) => {
                tracing::debug!("Post changed: {}", stamp.uid);
                changeset.changed_posts.push(stamp.uid.clone());
            }
            None => {
                tracing::debug!("New post: {}", stamp.uid);
                changeset.changed_posts.push(stamp.uid.clone());
            }
        }
    }

    let current: HashSet<&str> = current_posts.iter().map(|s| s.uid.as_str()).collect();
    let mut deleted: Vec<String> = cache
        .posts
        .keys()
        .filter(|uid| !current.contains(uid.as_str()))
        .cloned()
        .collect();
    deleted.sort();
    for uid in &deleted {
        tracing::debug!("Deleted post: {}", uid);
    }
    changeset.deleted_posts = deleted;

    changeset
}

/// Update cache with current state
pub fn update_cache(
    cache: &mut CacheDb,
    master_ref: &str,
    config_hash: u64,
    assets_hash: u64,
    posts: &[PostStamp],
) {
    cache.version = CacheDb::VERSION;
    cache.master_ref = master_ref.to_string();
    cache.config_hash = config_hash;
    cache.assets_hash = assets_hash;

    cache.posts.clear();
    for stamp in posts {
        cache.posts.insert(
            stamp.uid.clone(),
            CacheEntry {
                last_publication_date: stamp.last_publication_date.clone(),
            },
        );
    }
}
