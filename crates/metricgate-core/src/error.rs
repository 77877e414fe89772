//! Shared error types across metricgate crates.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request or manifest.
    BadRequest,
    /// Request body failed schema validation.
    Unprocessable,
    /// Missing or wrong bearer token.
    Unauthorized,
    /// No engine snapshot loaded yet.
    NotReady,
    /// Warehouse-side failure.
    Upstream,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::Unprocessable => "UNPROCESSABLE",
            ClientCode::Unauthorized => "UNAUTHORIZED",
            ClientCode::NotReady => "NOT_READY",
            ClientCode::Upstream => "UPSTREAM",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, GateError>;

/// Unified error type used at the HTTP boundary and during startup.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    NotReady(&'static str),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

impl GateError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            GateError::BadRequest(_) => ClientCode::BadRequest,
            GateError::Unprocessable(_) => ClientCode::Unprocessable,
            GateError::Unauthorized(_) => ClientCode::Unauthorized,
            GateError::NotReady(_) => ClientCode::NotReady,
            GateError::Upstream(_) => ClientCode::Upstream,
            GateError::Internal(_) => ClientCode::Internal,
        }
    }
}

/// Innermost error of a failure chain: its type name and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootCause {
    pub kind: String,
    pub message: String,
}

impl RootCause {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: kind.into(), message: message.into() }
    }

    /// Walk `source()` down to the deepest error; both `kind` and `message`
    /// describe that innermost error.
    ///
    /// Behind a `dyn Error` the concrete type is erased, so a nested cause is
    /// named by the leading identifier of its `Debug` output (the struct or
    /// variant name for derived impls).
    pub fn of<E: StdError + 'static>(err: &E) -> Self {
        let mut current: &(dyn StdError + 'static) = err;
        let mut nested = false;
        while let Some(next) = current.source() {
            current = next;
            nested = true;
        }
        let kind = if nested {
            debug_name(current).unwrap_or_else(|| short_type_name::<E>().to_string())
        } else {
            short_type_name::<E>().to_string()
        };
        Self {
            kind,
            message: current.to_string(),
        }
    }
}

fn debug_name(err: &dyn StdError) -> Option<String> {
    let rendered = format!("{err:?}");
    let name: String = rendered
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    name.starts_with(|c: char| c.is_ascii_alphabetic()).then_some(name)
}

impl fmt::Display for RootCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    // strip generics first so `a::B<c::D>` yields `B`
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Failure raised by a [`SemanticEngine`](crate::engine::SemanticEngine) query.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Customer-facing semantic error (unknown metric, bad filter, ...).
    #[error("{0}")]
    Invalid(String),
    /// The warehouse rejected or failed to run the generated query.
    #[error("execution failed: {0}")]
    Execution(RootCause),
    /// Anything else.
    #[error("unexpected engine failure: {0}")]
    Unexpected(RootCause),
}

/// Failure raised while turning a manifest into an engine snapshot.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The manifest content was refused (missing fields, unknown references).
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Internal(String),
}

/// Failure raised while establishing the warehouse adapter binding.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("profile error: {0}")]
    Profile(String),
    #[error("unsupported adapter type: {0}")]
    Unsupported(String),
    #[error("connection check failed: {0}")]
    Connection(RootCause),
    #[error("adapter already initialised")]
    AlreadyBound,
}
