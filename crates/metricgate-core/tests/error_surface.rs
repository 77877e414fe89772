//! Error taxonomy tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use metricgate_core::error::{ClientCode, EngineError, GateError, RootCause};

#[derive(Debug, thiserror::Error)]
#[error("connection reset by warehouse")]
struct SocketReset;

#[derive(Debug, thiserror::Error)]
#[error("query failed")]
struct QueryFailed {
    #[source]
    cause: SocketReset,
}

#[test]
fn client_codes_are_stable() {
    let cases = [
        (GateError::BadRequest("x".into()), "BAD_REQUEST"),
        (GateError::Unprocessable("x".into()), "UNPROCESSABLE"),
        (GateError::Unauthorized("x"), "UNAUTHORIZED"),
        (GateError::NotReady("x"), "NOT_READY"),
        (GateError::Upstream("x".into()), "UPSTREAM"),
        (GateError::Internal("x".into()), "INTERNAL"),
    ];
    for (err, code) in cases {
        assert_eq!(err.client_code().as_str(), code);
    }
    assert_eq!(ClientCode::NotReady.as_str(), "NOT_READY");
}

#[test]
fn root_cause_unwraps_to_deepest_message() {
    let err = QueryFailed { cause: SocketReset };
    let cause = RootCause::of(&err);
    assert_eq!(cause.kind, "SocketReset");
    assert_eq!(cause.message, "connection reset by warehouse");
    assert_eq!(cause.to_string(), "SocketReset: connection reset by warehouse");
}

#[derive(Debug, thiserror::Error)]
enum DriverError {
    #[error("server closed the connection: {0}")]
    Closed(#[source] SocketReset),
}

#[derive(Debug, thiserror::Error)]
#[error("statement execution failed")]
struct ExecutionFailed {
    #[source]
    cause: DriverError,
}

#[test]
fn root_cause_names_innermost_type_through_several_layers() {
    let err = ExecutionFailed {
        cause: DriverError::Closed(SocketReset),
    };
    let cause = RootCause::of(&err);
    assert_eq!(cause.kind, "SocketReset");
    assert_eq!(cause.message, "connection reset by warehouse");
}

#[derive(Debug, thiserror::Error)]
enum PoolError {
    #[error("no connection available within 30s")]
    Exhausted,
}

#[derive(Debug, thiserror::Error)]
#[error("could not acquire connection")]
struct Acquire(#[source] PoolError);

#[test]
fn root_cause_names_innermost_enum_variant() {
    let cause = RootCause::of(&Acquire(PoolError::Exhausted));
    assert_eq!(cause.kind, "Exhausted");
    assert_eq!(cause.message, "no connection available within 30s");
}

#[test]
fn root_cause_without_source_keeps_own_message() {
    let cause = RootCause::of(&SocketReset);
    assert_eq!(cause.kind, "SocketReset");
    assert_eq!(cause.message, "connection reset by warehouse");
    assert_eq!(cause.to_string(), "SocketReset: connection reset by warehouse");
}

#[test]
fn engine_error_messages() {
    let invalid = EngineError::Invalid("unknown metric: nope".into());
    assert_eq!(invalid.to_string(), "unknown metric: nope");

    let exec = EngineError::Execution(RootCause::new("OperationalError", "timeout"));
    assert_eq!(exec.to_string(), "execution failed: OperationalError: timeout");
}
