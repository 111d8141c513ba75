//! GraphQL-over-HTTP remote source.
//!
//! The HTTP client is abstracted via a trait so any blocking HTTP library
//! (ureq, reqwest::blocking, ...) can carry the requests. Authentication
//! headers are the client's concern.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::{Page, PageRequest, RemoteSource};
use serde_json::{json, Value};
use thiserror::Error;

/// Failure reported by an [`HttpClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// No response arrived within the client's deadline.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The connection could not be made or was lost.
    #[error("connection failed: {0}")]
    Connection(String),
}

impl From<HttpError> for SyncError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout => SyncError::Timeout,
            HttpError::Status { status, .. } if status == 429 || status >= 500 => {
                SyncError::transport_retryable(err.to_string())
            }
            HttpError::Status { .. } => SyncError::transport_fatal(err.to_string()),
            HttpError::Connection(_) => SyncError::transport_retryable(err.to_string()),
        }
    }
}

/// HTTP client abstraction.
pub trait HttpClient: Send + Sync {
    /// Sends a JSON POST request and returns the response body.
    fn post_json(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpError>;
}

/// Names used to build queries for one object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQlNames {
    /// Single-object query field, e.g. `Loan`.
    pub object_query: String,
    /// Id argument of the single-object query, e.g. `loanId`.
    pub id_argument: String,
    /// Collection feed, e.g. `LoansFeed`.
    pub feed: String,
    /// List field inside the feed, e.g. `loans`.
    pub feed_field: String,
}

impl GraphQlNames {
    /// Names for the loan collection.
    #[must_use]
    pub fn loans() -> Self {
        Self {
            object_query: "Loan".to_string(),
            id_argument: "loanId".to_string(),
            feed: "LoansFeed".to_string(),
            feed_field: "loans".to_string(),
        }
    }

    /// Names derived from the configured object type and feed.
    ///
    /// `Loan` with feed `LoansFeed` yields the query `Loan(loanId: ...)`
    /// and the list field `LoansFeed.loans`.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        let lower = lower_first(&config.object_type);
        Self {
            object_query: config.object_type.clone(),
            id_argument: format!("{lower}Id"),
            feed: config.feed_name.clone(),
            feed_field: format!("{lower}s"),
        }
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Default for GraphQlNames {
    fn default() -> Self {
        Self::loans()
    }
}

/// A [`RemoteSource`] backed by a GraphQL endpoint.
///
/// Queries are built once from a pre-built selection set (the field list
/// of the object type).
pub struct GraphQlRemote<C: HttpClient> {
    endpoint: String,
    client: C,
    names: GraphQlNames,
    object_query: String,
    feed_query: String,
    count_query: String,
}

impl<C: HttpClient> GraphQlRemote<C> {
    /// Creates a remote for `endpoint` selecting `selection_set` on every
    /// object.
    pub fn new(
        endpoint: impl Into<String>,
        client: C,
        names: GraphQlNames,
        selection_set: &str,
    ) -> Self {
        let GraphQlNames {
            object_query: object,
            id_argument: id,
            feed,
            feed_field,
        } = &names;
        let object_query = format!(
            "query {object}(${id}: ID!) {{ {object}({id}: ${id}) {{ {selection_set} }} }}"
        );
        let feed_query = format!(
            "query {feed}($limit: Int, $offset: Int, $orderBy: [OrderByInput!]) \
             {{ {feed}(limit: $limit, offset: $offset, orderBy: $orderBy) \
             {{ {feed_field} {{ {selection_set} }} }} }}"
        );
        let count_query = format!("query {feed}Count {{ {feed} {{ totalCount }} }}");

        Self {
            endpoint: endpoint.into(),
            client,
            names,
            object_query,
            feed_query,
            count_query,
        }
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the single-object query text.
    pub fn object_query(&self) -> &str {
        &self.object_query
    }

    /// Returns the feed page query text.
    pub fn feed_query(&self) -> &str {
        &self.feed_query
    }

    /// Returns the feed count query text.
    pub fn count_query(&self) -> &str {
        &self.count_query
    }

    /// Posts one query and returns its `data` member.
    fn request(&self, query: &str, variables: Value) -> SyncResult<Value> {
        let body = serde_json::to_vec(&json!({"query": query, "variables": variables}))
            .map_err(|e| SyncError::InvalidResponse(format!("failed to encode request: {e}")))?;

        let response = self
            .client
            .post_json(&self.endpoint, body)
            .map_err(SyncError::from)?;

        let mut response: Value = serde_json::from_slice(&response)
            .map_err(|e| SyncError::InvalidResponse(format!("response is not JSON: {e}")))?;

        if let Some(errors) = response.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let messages: Vec<&str> = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .collect();
                let unauthenticated = errors.iter().any(|e| {
                    e.pointer("/extensions/code").and_then(Value::as_str)
                        == Some("UNAUTHENTICATED")
                });
                let message = format!("GraphQL errors: {}", messages.join("; "));
                return Err(if unauthenticated {
                    SyncError::transport_fatal(message)
                } else {
                    SyncError::transport_retryable(message)
                });
            }
        }

        match response.get_mut("data").map(Value::take) {
            Some(data) if data.is_object() => Ok(data),
            _ => Err(SyncError::InvalidResponse(
                "response has no data member".to_string(),
            )),
        }
    }
}

impl<C: HttpClient> RemoteSource for GraphQlRemote<C> {
    fn fetch_object(&self, id: &str) -> SyncResult<Option<Value>> {
        let mut variables = serde_json::Map::new();
        variables.insert(self.names.id_argument.clone(), Value::from(id));
        let mut data = self.request(&self.object_query, Value::Object(variables))?;

        match data.get_mut(&self.names.object_query).map(Value::take) {
            Some(Value::Null) | None => Ok(None),
            Some(object) if object.is_object() => Ok(Some(object)),
            Some(_) => Err(SyncError::InvalidResponse(format!(
                "{} is not an object",
                self.names.object_query
            ))),
        }
    }

    fn fetch_page(&self, request: &PageRequest) -> SyncResult<Page> {
        let variables = json!({
            "limit": request.limit,
            "offset": request.offset,
            "orderBy": [{"fieldKey": "createdAt", "sortOrder": "asc"}],
        });
        let mut data = self.request(&self.feed_query, variables)?;

        let objects = match data
            .get_mut(&self.names.feed)
            .and_then(|feed| feed.get_mut(&self.names.feed_field))
            .map(Value::take)
        {
            Some(Value::Array(objects)) => objects,
            _ => {
                return Err(SyncError::InvalidResponse(format!(
                    "{}.{} is not a list",
                    self.names.feed, self.names.feed_field
                )))
            }
        };

        let has_more = objects.len() >= request.limit;
        Ok(Page {
            objects,
            next_cursor: None,
            has_more,
        })
    }

    fn total_count(&self) -> SyncResult<u64> {
        let data = self.request(&self.count_query, Value::Null)?;
        data.get(&self.names.feed)
            .and_then(|feed| feed.get("totalCount"))
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                SyncError::InvalidResponse(format!(
                    "invalid response for {} total count query",
                    self.names.feed
                ))
            })
    }
}
