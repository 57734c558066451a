//! Advisory types: RequestId, MessageId, AdvisoryMessage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one advisory request from submission to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "REQ-{:04}", self.0)
    }
}

/// Sequential message id; breaks timestamp ties by insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// One entry in the append-only advisory log. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryMessage {
    pub id: MessageId,
    pub text: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
    pub is_system_event: bool,
    /// Reasoning trace behind an advisory response
    pub reasoning: Option<String>,
    /// Request this message belongs to, if any
    pub request_id: Option<RequestId>,
}

impl AdvisoryMessage {
    /// A question typed by an operator.
    pub fn user(id: MessageId, request_id: RequestId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            is_user: true,
            timestamp: Utc::now(),
            is_system_event: false,
            reasoning: None,
            request_id: Some(request_id),
        }
    }

    /// A composed advisory answer with its reasoning trace.
    pub fn response(
        id: MessageId,
        request_id: RequestId,
        text: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            is_user: false,
            timestamp: Utc::now(),
            is_system_event: false,
            reasoning: Some(reasoning.into()),
            request_id: Some(request_id),
        }
    }

    /// An engine notice (module connected, advisory unavailable).
    pub fn system_event(
        id: MessageId,
        request_id: Option<RequestId>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            is_user: false,
            timestamp: Utc::now(),
            is_system_event: true,
            reasoning: None,
            request_id,
        }
    }
}
