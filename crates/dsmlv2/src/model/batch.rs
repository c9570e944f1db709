//! The `batchRequest` envelope.

use crate::model::DsmlRequest;

/// How the server should process the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Processing {
    #[default]
    Sequential,
    Parallel,
}

impl Processing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Processing::Sequential => "sequential",
            Processing::Parallel => "parallel",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "sequential" => Some(Processing::Sequential),
            "parallel" => Some(Processing::Parallel),
            _ => None,
        }
    }
}

/// Order in which responses are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResponseOrder {
    #[default]
    Sequential,
    Unordered,
}

impl ResponseOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseOrder::Sequential => "sequential",
            ResponseOrder::Unordered => "unordered",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "sequential" => Some(ResponseOrder::Sequential),
            "unordered" => Some(ResponseOrder::Unordered),
            _ => None,
        }
    }
}

/// What the server does when a request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OnError {
    Resume,
    #[default]
    Exit,
}

impl OnError {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnError::Resume => "resume",
            OnError::Exit => "exit",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "resume" => Some(OnError::Resume),
            "exit" => Some(OnError::Exit),
            _ => None,
        }
    }
}

/// An ordered list of requests with batch-level policy.
///
/// Policy fields are `None` when not written; the DSMLv2 defaults are
/// available through the `effective_*` accessors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchRequest {
    pub request_id: Option<String>,
    pub processing: Option<Processing>,
    pub response_order: Option<ResponseOrder>,
    pub on_error: Option<OnError>,
    pub requests: Vec<DsmlRequest>,
}

impl BatchRequest {
    /// Creates an empty batch with no policy attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request.
    pub fn push(&mut self, request: impl Into<DsmlRequest>) {
        self.requests.push(request.into());
    }

    pub fn effective_processing(&self) -> Processing {
        self.processing.unwrap_or_default()
    }

    pub fn effective_response_order(&self) -> ResponseOrder {
        self.response_order.unwrap_or_default()
    }

    pub fn effective_on_error(&self) -> OnError {
        self.on_error.unwrap_or_default()
    }

    /// Returns the number of requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Returns true if the batch holds no requests.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
