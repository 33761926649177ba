//! Wire types for gateway requests and responses.

use serde::{Deserialize, Serialize};

use super::error::GatewayError;
use crate::resources::traits::null_as_default;
use crate::sessions::SessionKey;

/// Session correlation carried in a structured query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryContext {
    #[serde(
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub session_id: String,
}

/// A structured ("agentic") query body:
/// `{query?: string, filters?: {...}, context?: {session_id?: string}}`.
///
/// `filters` is typed per resource kind; fields that belong to another kind
/// are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuery<F> {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub query: String,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub filters: Option<F>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub context: QueryContext,
}

impl<F> StructuredQuery<F> {
    pub fn new(query: &str, filters: F, session_id: &str) -> Self {
        Self {
            query: query.to_string(),
            filters: Some(filters),
            context: QueryContext {
                session_id: session_id.to_string(),
            },
        }
    }
}

/// A parsed inbound query, whichever form it arrived in.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery<F> {
    /// Opaque label; never interpreted as filters.
    pub text: String,
    pub filters: F,
    /// Raw session identifier as sent (may be empty).
    pub session_id: String,
}

impl<F> ParsedQuery<F> {
    /// Simple lookup: filters come straight from the request parameters.
    pub fn from_params(params: F) -> Self {
        Self {
            text: String::new(),
            filters: params,
            session_id: String::new(),
        }
    }

    /// Structured query: body filters, when present, replace the request
    /// parameters wholesale.
    pub fn from_structured(params: F, body: StructuredQuery<F>) -> Self {
        Self {
            text: body.query,
            filters: body.filters.unwrap_or(params),
            session_id: body.context.session_id,
        }
    }

    /// The session to record this query under, if history tracking applies.
    ///
    /// Tracking needs both a session identifier and a non-empty query text.
    pub fn tracked_session(&self) -> Option<SessionKey> {
        if self.text.is_empty() {
            return None;
        }
        SessionKey::parse(&self.session_id)
    }
}

/// Parse a structured query body.
pub fn parse_structured<F: serde::de::DeserializeOwned>(
    body: &[u8],
) -> Result<StructuredQuery<F>, GatewayError> {
    serde_json::from_slice(body).map_err(|e| GatewayError::BadRequest(format!("Invalid JSON: {e}")))
}

/// Metadata returned alongside records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMeta<F> {
    #[serde(rename = "filtersUsed")]
    pub filters_used: F,
    pub session_id: String,
    pub previous_query: String,
    pub conversation_context: Vec<String>,
    pub total: usize,
}

/// Response body: `{data: [...], meta: {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEnvelope<R, F> {
    pub data: Vec<R>,
    pub meta: QueryMeta<F>,
}
