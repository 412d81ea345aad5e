//! Error taxonomy shared by the relay components.
//!
//! Every variant is caught at the boundary of the component that produces
//! it and turned into an `{"error": ...}` value; none of them reach the
//! HTTP layer as a fault.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    /// Bad or missing caller input.
    #[error("{0}")]
    Validation(String),

    /// Transport failure talking to an upstream.
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    /// An upstream did not answer within the configured deadline.
    #[error("{0} timed out after {1}s")]
    Timeout(&'static str, u64),

    /// Non-2xx answer from an upstream.
    #[error("{context} failed with status code {}", .status.as_u16())]
    UpstreamStatus {
        context: &'static str,
        status: StatusCode,
    },

    /// Malformed JSON from an upstream.
    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    /// The completion carried neither content nor a tool call.
    #[error("no valid message or tool call in response")]
    EmptyResponse,

    /// Location autocomplete produced nothing usable.
    #[error("{0}")]
    Lookup(String),

    /// Unknown or malformed tool call.
    #[error("{0}")]
    ToolDispatch(String),
}

impl RelayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup(message.into())
    }

    /// Classify a reqwest failure; an elapsed `deadline` becomes [`Timeout`](Self::Timeout).
    pub fn transport(err: reqwest::Error, context: &'static str, deadline: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(context, deadline.as_secs())
        } else {
            Self::Network(err)
        }
    }
}
