//! HTTP client for the Prismic REST API v2

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

use super::error::PrismicError;
use super::predicate::{render_query, Predicate};
use super::types::{ApiInfo, Document, SearchResponse};

/// Options for a `documents/search` request
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub page_size: Option<usize>,
    pub page: Option<usize>,
    /// Restrict returned fields, e.g. `posts.uid`
    pub fetch: Vec<String>,
    pub orderings: Option<String>,
}

impl QueryOptions {
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn fetch(mut self, field: impl Into<String>) -> Self {
        self.fetch.push(field.into());
        self
    }

    pub fn orderings(mut self, orderings: Option<String>) -> Self {
        self.orderings = orderings;
        self
    }
}

/// Client bound to one Prismic repository
pub struct PrismicClient {
    http: Client,
    endpoint: String,
    access_token: Option<String>,
    master_ref: OnceCell<String>,
}

impl PrismicClient {
    /// Create a client for `endpoint` (e.g. `https://repo.cdn.prismic.io/api/v2`)
    pub fn new(
        endpoint: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PrismicError> {
        let parsed = Url::parse(endpoint).map_err(|e| PrismicError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PrismicError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: format!("unsupported scheme {:?}", parsed.scheme()),
            });
        }

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("spacetraveling-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| PrismicError::Http {
                url: endpoint.to_string(),
                source,
            })?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            access_token,
            master_ref: OnceCell::new(),
        })
    }

    /// Fetch the repository description (refs, types)
    pub async fn api_info(&self) -> Result<ApiInfo, PrismicError> {
        let mut url = self.parse_url(&self.endpoint)?;
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        self.get_json(url).await
    }

    /// The master ref, fetched once per client
    pub async fn master_ref(&self) -> Result<&str, PrismicError> {
        let reference = self
            .master_ref
            .get_or_try_init(|| async {
                let info = self.api_info().await?;
                let master = info
                    .master()
                    .ok_or_else(|| PrismicError::NoMasterRef(self.endpoint.clone()))?;
                tracing::debug!("Master ref: {}", master.reference);
                Ok::<_, PrismicError>(master.reference.clone())
            })
            .await?;
        Ok(reference.as_str())
    }

    /// Run a `documents/search` query against the master ref
    pub async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<SearchResponse, PrismicError> {
        let master_ref = self.master_ref().await?.to_string();
        let mut url = self.parse_url(&format!("{}/documents/search", self.endpoint))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", &master_ref);
            if !predicates.is_empty() {
                pairs.append_pair("q", &render_query(predicates));
            }
            if let Some(size) = options.page_size {
                pairs.append_pair("pageSize", &size.to_string());
            }
            if let Some(page) = options.page {
                pairs.append_pair("page", &page.to_string());
            }
            if !options.fetch.is_empty() {
                pairs.append_pair("fetch", &options.fetch.join(","));
            }
            if let Some(orderings) = &options.orderings {
                pairs.append_pair("orderings", orderings);
            }
            if let Some(token) = &self.access_token {
                pairs.append_pair("access_token", token);
            }
        }
        self.get_json(url).await
    }

    /// Fetch a single document by UID, `None` if it does not exist
    pub async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
    ) -> Result<Option<Document>, PrismicError> {
        let response = self
            .query(
                &[Predicate::uid(doc_type, uid)],
                &QueryOptions::default().page_size(1),
            )
            .await?;
        Ok(response.results.into_iter().next())
    }

    /// Follow a `next_page` URL returned by a previous search
    pub async fn fetch_page(&self, page_url: &str) -> Result<SearchResponse, PrismicError> {
        let url = self.parse_url(page_url)?;
        self.get_json(url).await
    }

    fn parse_url(&self, raw: &str) -> Result<Url, PrismicError> {
        Url::parse(raw).map_err(|e| PrismicError::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, PrismicError> {
        let shown = redact(&url);
        tracing::debug!("GET {}", shown);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| PrismicError::Http {
                url: shown.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PrismicError::Status {
                url: shown,
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| PrismicError::Decode { url: shown, source })
    }
}

/// Render a URL for logs and errors without the access token
fn redact(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "access_token") {
        return url.to_string();
    }
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            if k == "access_token" {
                (k.into_owned(), "***".to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}
