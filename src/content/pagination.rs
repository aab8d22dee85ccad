//! "Load more" list state

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::post::PostSummary;

/// The posts loaded so far plus where to fetch the next batch
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PostsPagination {
    pub next_page: Option<String>,
    pub results: Vec<PostSummary>,
}

impl PostsPagination {
    pub fn new(results: Vec<PostSummary>, next_page: Option<String>) -> Self {
        Self {
            next_page: next_page.filter(|url| !url.is_empty()),
            results,
        }
    }

    /// Whether another batch can be loaded
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Append a freshly fetched batch.
    ///
    /// Existing posts keep their position; new posts follow in the order the
    /// API returned them, skipping any uid already listed. `next_page` is
    /// replaced by the batch's own link. Returns how many posts were added.
    pub fn merge(&mut self, batch: Vec<PostSummary>, next_page: Option<String>) -> usize {
        let mut seen: HashSet<String> = self.results.iter().map(|p| p.uid.clone()).collect();
        let before = self.results.len();

        for post in batch {
            if seen.insert(post.uid.clone()) {
                self.results.push(post);
            } else {
                tracing::debug!("Skipping already listed post {}", post.uid);
            }
        }

        self.next_page = next_page.filter(|url| !url.is_empty());
        self.results.len() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(uid: &str) -> PostSummary {
        PostSummary {
            uid: uid.to_string(),
            first_publication_date: Some("2021-03-15T19:25:28+0000".to_string()),
            title: uid.to_uppercase(),
            subtitle: String::new(),
            author: "Joseph Oliveira".to_string(),
        }
    }

    fn uids(pagination: &PostsPagination) -> Vec<&str> {
        pagination.results.iter().map(|p| p.uid.as_str()).collect()
    }

    #[test]
    fn test_merge_appends_and_replaces_next_page() {
        let mut pagination = PostsPagination::new(vec![summary("a")], Some("page-2".to_string()));
        assert!(pagination.has_more());

        let added = pagination.merge(vec![summary("b"), summary("c")], Some("page-3".to_string()));
        assert_eq!(added, 2);
        assert_eq!(uids(&pagination), vec!["a", "b", "c"]);
        assert_eq!(pagination.next_page.as_deref(), Some("page-3"));

        pagination.merge(vec![summary("d")], None);
        assert_eq!(uids(&pagination), vec!["a", "b", "c", "d"]);
        assert!(!pagination.has_more());
    }

    #[test]
    fn test_merge_skips_duplicates() {
        let mut pagination = PostsPagination::new(vec![summary("a"), summary("b")], None);
        let added = pagination.merge(vec![summary("b"), summary("c"), summary("c")], None);
        assert_eq!(added, 1);
        assert_eq!(uids(&pagination), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_next_page_means_none() {
        let pagination = PostsPagination::new(vec![], Some(String::new()));
        assert!(!pagination.has_more());
    }
}
