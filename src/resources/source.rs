//! HTTP data source speaking `GET <base>/<kind>?<filters>`.

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

use super::traits::{DataSource, Fetched, ResolveError, ResourceKind};

const MAX_UPSTREAM_ERROR_CHARS: usize = 200;

/// Data source backed by an HTTP endpoint that returns JSON record arrays.
pub struct HttpDataSource {
    pub(crate) base_url: String,
    client: Client,
}

impl HttpDataSource {
    pub fn new(base_url: &str, timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(timeout)
                .connect_timeout(connect_timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Build the request URL for `kind`, appending only the given params.
    fn resource_url(&self, kind: ResourceKind, params: &[(&'static str, String)]) -> Option<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, kind.path())).ok()?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(name, value)| (*name, value.as_str())));
        }
        Some(url)
    }
}

/// Shorten an upstream error body so it can be surfaced to callers.
pub fn truncate_upstream_error(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.chars().count() <= MAX_UPSTREAM_ERROR_CHARS {
        return trimmed.to_string();
    }

    let mut end = MAX_UPSTREAM_ERROR_CHARS;
    while end > 0 && !trimmed.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &trimmed[..end])
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch(
        &self,
        kind: ResourceKind,
        params: &[(&'static str, String)],
    ) -> Result<Fetched, ResolveError> {
        let Some(url) = self.resource_url(kind, params) else {
            return Err(ResolveError::Upstream {
                kind,
                url: format!("{}/{}", self.base_url, kind.path()),
                message: "invalid data source URL".to_string(),
            });
        };
        let url_text = url.to_string();
        tracing::debug!(%kind, url = %url_text, "Fetching from data source");

        let response = self.client.get(url).send().await.map_err(|e| {
            ResolveError::Upstream {
                kind,
                url: url_text.clone(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            return Err(ResolveError::Upstream {
                kind,
                url: url_text,
                message: format!("error {}: {}", status.as_u16(), truncate_upstream_error(&body)),
            });
        }

        let body = response.text().await.map_err(|e| ResolveError::Upstream {
            kind,
            url: url_text.clone(),
            message: format!("failed to read body: {e}"),
        })?;

        Ok(Fetched {
            url: url_text,
            body,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
