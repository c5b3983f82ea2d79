//! Transport to the dashboard server's two AJAX endpoints.

use crate::server::error::FetchError;
use crate::server::fragment;
use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use url::Url;

/// Applies to every list and detail request.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

pub const LIST_ENDPOINT: &str = "experiment_list";
pub const DETAIL_ENDPOINT: &str = "experiment_info";

#[async_trait]
pub trait ExperimentSource: Send + Sync {
    /// Summary fragments for `project`, in server order.
    async fn fetch_list(&self, project: &str, mask: &str) -> Result<Vec<String>, FetchError>;
    /// Raw detail fragment for experiment `xid`.
    async fn fetch_detail(&self, xid: &str, project: &str) -> Result<String, FetchError>;
}

pub struct HttpSource {
    client: Client,
    root: Url,
}

impl HttpSource {
    pub fn new(root: &Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            root: normalize_root(root),
        })
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    /// URL of the detail endpoint for one experiment, as the browser would request it.
    pub fn detail_url(&self, xid: &str, project: &str) -> Result<Url> {
        endpoint_url(&self.root, DETAIL_ENDPOINT, &[("xid", xid), ("project", project)])
    }

    async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
        let url = endpoint_url(&self.root, endpoint, query)
            .map_err(|e| FetchError::connectivity(e.to_string()))?;
        tracing::debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("{endpoint}: no response: {e}");
                FetchError::connectivity(e.to_string())
            })?;

        read_body(endpoint, response).await
    }
}

#[async_trait]
impl ExperimentSource for HttpSource {
    async fn fetch_list(&self, project: &str, mask: &str) -> Result<Vec<String>, FetchError> {
        let body = self
            .get(LIST_ENDPOINT, &[("project", project), ("mask", mask)])
            .await?;
        parse_list(&body)
    }

    async fn fetch_detail(&self, xid: &str, project: &str) -> Result<String, FetchError> {
        self.get(DETAIL_ENDPOINT, &[("xid", xid), ("project", project)])
            .await
    }
}

async fn read_body(endpoint: &str, response: Response) -> Result<String, FetchError> {
    let status = response.status();
    if !status.is_success() {
        tracing::warn!("{endpoint}: server returned {status}");
        // The status arrived, so a body that fails to read only loses the detail.
        let body = response.text().await.map_err(|e| {
            tracing::warn!("{endpoint}: error body unreadable: {e}");
        });
        return Err(status_error(status, body.ok().as_deref()));
    }

    // A body that stops arriving mid-way (including the timeout) counts as no response.
    response.text().await.map_err(|e| {
        tracing::warn!("{endpoint}: body read failed: {e}");
        FetchError::connectivity(e.to_string())
    })
}

fn status_error(status: StatusCode, body: Option<&str>) -> FetchError {
    FetchError::Server {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or_default().to_string(),
        detail: body.map(fragment::error_detail).unwrap_or_default(),
    }
}

/// The list endpoint answers with a JSON array of HTML strings.
pub fn parse_list(body: &str) -> Result<Vec<String>, FetchError> {
    serde_json::from_str::<Vec<String>>(body).map_err(|e| FetchError::InvalidPayload {
        detail: format!("expected a JSON list of fragments ({e})"),
    })
}

/// Ensures the root ends with `/` so endpoints resolve beneath it rather than
/// replacing its last path segment.
fn normalize_root(root: &Url) -> Url {
    let mut root = root.clone();
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    root.set_query(None);
    root.set_fragment(None);
    root
}

fn endpoint_url(root: &Url, endpoint: &str, query: &[(&str, &str)]) -> Result<Url> {
    let mut url = root
        .join(endpoint)
        .map_err(|e| eyre!("Invalid endpoint URL for {endpoint}: {e}"))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn root_without_trailing_slash_keeps_prefix() {
        let root = normalize_root(&url("http://host:5000/dash"));
        assert_eq!(root.as_str(), "http://host:5000/dash/");
        let list = endpoint_url(&root, LIST_ENDPOINT, &[]).unwrap();
        assert_eq!(list.as_str(), "http://host:5000/dash/experiment_list");
    }

    #[test]
    fn root_query_is_dropped() {
        let root = normalize_root(&url("http://host/?autoload=1"));
        assert_eq!(root.as_str(), "http://host/");
    }

    #[test]
    fn query_values_are_encoded() {
        let root = normalize_root(&url("http://host"));
        let list = endpoint_url(
            &root,
            LIST_ENDPOINT,
            &[("project", "my proj"), ("mask", r#"{"a":1}"#)],
        )
        .unwrap();
        assert_eq!(
            list.as_str(),
            "http://host/experiment_list?project=my+proj&mask=%7B%22a%22%3A1%7D"
        );
    }

    #[test]
    fn detail_url_carries_xid_and_project() {
        let source = HttpSource::new(&url("http://host"), Duration::from_secs(1)).unwrap();
        let detail = source.detail_url("42", "default").unwrap();
        assert_eq!(
            detail.as_str(),
            "http://host/experiment_info?xid=42&project=default"
        );
    }

    #[test]
    fn status_error_keeps_server_kind_without_body() {
        let err = status_error(StatusCode::BAD_GATEWAY, None);
        assert_eq!(
            err,
            FetchError::Server {
                status: 502,
                reason: "Bad Gateway".to_string(),
                detail: String::new(),
            }
        );
        assert!(!err.is_connectivity());
        assert_eq!(err.notice().message(), "502 Bad Gateway");
    }

    #[test]
    fn status_error_reads_paragraph_detail() {
        let err = status_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            Some("<h1>Oops</h1><p>no project selected</p>"),
        );
        assert_eq!(err.notice().detail, "no project selected");
    }

    #[test]
    fn parse_list_accepts_string_array() {
        let fragments = parse_list(r#"["<div>a</div>", "<div>b</div>"]"#).unwrap();
        assert_eq!(fragments, vec!["<div>a</div>", "<div>b</div>"]);
    }

    #[test]
    fn parse_list_rejects_other_shapes() {
        let err = parse_list(r#"{"experiments": []}"#).unwrap_err();
        assert!(matches!(err, FetchError::InvalidPayload { .. }));
    }
}
