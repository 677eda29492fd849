//! HTTP listing client
//!
//! [`HttpListingSource`] is the production [`PageSource`]: one GET per page
//! with the endpoint's pagination, filter, and expand parameters, a static
//! bearer-style `Authorization` header, and response classification into the
//! library's error taxonomy. It never retries; the retry layer owns that.

use crate::config::EndpointConfig;
use crate::error::{Error, Result};
use crate::source::PageSource;
use crate::types::{PageRequest, PageResult, RangeSpan, Record};
use url::Url;

/// Longest error-body excerpt carried in an [`Error::Http`]
const ERROR_BODY_EXCERPT: usize = 512;

/// Production page source issuing HTTP GETs against a listing endpoint
pub struct HttpListingSource {
    client: reqwest::Client,
    endpoint: EndpointConfig,
}

impl HttpListingSource {
    /// Create a listing source for the given endpoint.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(endpoint: EndpointConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(endpoint.request_timeout)
            .user_agent(endpoint.user_agent.clone())
            .build()?;
        Ok(Self { client, endpoint })
    }

    /// Build the page URL with pagination, window, filter, and expand parameters
    fn page_url(&self, request: &PageRequest) -> Result<Url> {
        let mut url = self
            .endpoint
            .base_url
            .join(&self.endpoint.path)
            .map_err(|e| Error::config(format!("invalid endpoint path: {e}"), "path"))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("limit", &request.limit.to_string());
            match request.span {
                RangeSpan::Offset { .. } => {
                    pairs.append_pair("offset", &request.offset.to_string());
                }
                RangeSpan::Time { start_ms, end_ms } => {
                    pairs.append_pair("after", &start_ms.to_string());
                    pairs.append_pair("before", &end_ms.to_string());
                    pairs.append_pair("offset", &request.offset.to_string());
                }
            }
            if let Some(filter) = &request.filter {
                pairs.append_pair("filter", filter);
            }
            if !request.expand.is_empty() {
                pairs.append_pair("expand", &request.expand.join(","));
            }
        }
        Ok(url)
    }

    /// Read the rate-limit reset header as an epoch second, when present and parseable
    fn reset_epoch_s(&self, response: &reqwest::Response) -> Option<i64> {
        response
            .headers()
            .get(&self.endpoint.rate_limit_reset_header)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<i64>().ok())
    }
}

#[async_trait::async_trait]
impl PageSource for HttpListingSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResult> {
        let url = self.page_url(request)?;
        tracing::debug!(url = %url, "fetching listing page");

        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("{} {}", self.endpoint.auth_scheme, self.endpoint.token),
            )
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let reset_epoch_s = self.reset_epoch_s(&response);
            return Err(Error::RateLimited { reset_epoch_s });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body: excerpt(body),
            });
        }

        let body = response.text().await?;
        parse_page_body(&body)
    }
}

/// Parse a listing response body: `{items: [...], totalCount?, links.next?.href}`
fn parse_page_body(body: &str) -> Result<PageResult> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| Error::InvalidResponse(format!("listing body is not valid JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::InvalidResponse("listing body is not a JSON object".to_string()))?;

    let raw_items = object
        .get("items")
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::InvalidResponse("listing body has no items array".to_string()))?;

    let mut items = Vec::with_capacity(raw_items.len());
    for item in raw_items {
        match item.as_object() {
            Some(fields) => items.push(Record::new(fields.clone())),
            None => {
                return Err(Error::InvalidResponse(
                    "listing item is not a JSON object".to_string(),
                ));
            }
        }
    }

    let total_count = object.get("totalCount").and_then(|v| v.as_u64());
    let next_cursor = value
        .pointer("/links/next/href")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    Ok(PageResult {
        items,
        next_cursor,
        total_count,
    })
}

/// Truncate an error body for diagnostics without splitting a character
fn excerpt(body: String) -> String {
    if body.len() <= ERROR_BODY_EXCERPT {
        body
    } else {
        body.chars().take(ERROR_BODY_EXCERPT).collect()
    }
}
