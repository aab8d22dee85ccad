//! Response shapes of the Prismic REST API v2

use serde::{Deserialize, Serialize};

/// Body of `GET {endpoint}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub refs: Vec<ApiRef>,
}

impl ApiInfo {
    /// The ref pointing at the published content
    pub fn master(&self) -> Option<&ApiRef> {
        self.refs.iter().find(|r| r.is_master_ref)
    }
}

/// A content release reference
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRef {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub is_master_ref: bool,
}

/// Body of `GET {endpoint}/documents/search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub results_per_page: usize,
    #[serde(default)]
    pub results_size: usize,
    #[serde(default)]
    pub total_results_size: usize,
    #[serde(default)]
    pub total_pages: usize,
    pub next_page: Option<String>,
    pub prev_page: Option<String>,
    #[serde(default)]
    pub results: Vec<Document>,
}

/// A single CMS document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub first_publication_date: Option<String>,
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Document {
    /// Read a top-level string field from `data`
    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.data.get(name).and_then(|v| v.as_str())
    }
}
