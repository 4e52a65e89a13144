//! Client for the Solr-backed BV-BRC data API.
//!
//! Queries stream with Solr cursor pagination rather than offset paging,
//! which keeps deep result sets cheap on the server side. Cursor paging
//! requires a total ordering, so the sort always ends with the `id` key.

use crate::error::{ApiError, ApiResult};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Default number of rows fetched per cursor page.
const PAGE_ROWS: u32 = 1000;

/// Optional knobs for a collection query.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Maximum number of documents to return across all pages.
    pub limit: Option<u32>,
    /// Comma-separated field list (`fl`); all fields when absent.
    pub fields: Option<String>,
    /// Sort clause, e.g. `genome_name asc`.
    pub sort: Option<String>,
}

/// The collected result of a streamed query.
#[derive(Debug, Clone)]
pub struct QueryPage {
    /// Documents gathered across cursor pages, up to the limit.
    pub docs: Vec<Value>,
    /// Total matches reported by Solr, independent of the limit.
    pub num_found: u64,
}

#[derive(Debug, Deserialize)]
struct SolrEnvelope {
    response: SolrResponse,
    #[serde(rename = "nextCursorMark")]
    next_cursor_mark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SolrResponse {
    #[serde(rename = "numFound")]
    num_found: u64,
    docs: Vec<Value>,
}

/// A client for the data API root (e.g. `https://www.bv-brc.org/api`).
#[derive(Debug, Clone)]
pub struct DataClient {
    client: reqwest::Client,
    base_url: String,
}

impl DataClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stream all documents matching `filter` from `core`.
    ///
    /// An empty filter selects everything (`*:*`). The raw token, when
    /// present, travels in the `Authorization` header without a scheme
    /// prefix, matching the other BV-BRC services.
    pub async fn query(
        &self,
        core: &str,
        filter: &str,
        options: &QueryOptions,
        token: Option<&str>,
    ) -> ApiResult<QueryPage> {
        let q = if filter.trim().is_empty() {
            "*:*"
        } else {
            filter
        };
        let limit = options.limit.unwrap_or(PAGE_ROWS) as usize;
        // Cursor paging needs the unique key as a tiebreaker.
        let sort = match &options.sort {
            Some(s) if s.split(',').any(|part| {
                let field = part.trim().split(' ').next().unwrap_or("");
                field == "id"
            }) =>
            {
                s.clone()
            }
            Some(s) => format!("{s},id asc"),
            None => "id asc".to_string(),
        };

        let url = format!("{}/{}/select", self.base_url, core);
        let mut cursor = "*".to_string();
        let mut docs = Vec::new();
        let mut num_found = 0;

        loop {
            let rows = PAGE_ROWS.min((limit - docs.len()) as u32);
            let mut params = vec![
                ("q", q.to_string()),
                ("wt", "json".to_string()),
                ("sort", sort.clone()),
                ("rows", rows.to_string()),
                ("cursorMark", cursor.clone()),
            ];
            if let Some(fields) = &options.fields {
                params.push(("fl", fields.clone()));
            }

            debug!(core, %cursor, rows, "data API query page");

            let mut request = self.client.get(&url).query(&params);
            if let Some(token) = token {
                request = request.header("Authorization", token);
            }
            let response = request.send().await.map_err(ApiError::from_transport)?;
            let status = response.status();
            let body = response.text().await.map_err(ApiError::from_transport)?;

            if !status.is_success() {
                return Err(ApiError::Rejected {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let envelope: SolrEnvelope = serde_json::from_str(&body).map_err(|e| {
                ApiError::MalformedResponse(format!("invalid Solr response: {e}"))
            })?;

            num_found = envelope.response.num_found;
            let page_len = envelope.response.docs.len();
            docs.extend(envelope.response.docs);

            let next = envelope.next_cursor_mark.unwrap_or_default();
            // A repeated cursor mark or an empty page means the stream is done.
            if page_len == 0 || next == cursor || next.is_empty() || docs.len() >= limit {
                break;
            }
            cursor = next;
        }

        docs.truncate(limit);
        Ok(QueryPage { docs, num_found })
    }
}
