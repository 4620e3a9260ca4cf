//! Error and Warning Types
//!
//! Errors are reserved for misuse of the handle-addressed API: passing a
//! handle that this runtime never minted, a handle of the wrong kind, or an
//! array index past the host limit.
//! Everything the engine treats as a policy decision (read-only writes,
//! re-observation, non-configurable properties) is silent.
//!
//! Warnings are the developer-facing diagnostics. They never interrupt
//! execution; the runtime forwards them to `tracing` and to an optional
//! host handler.

use thiserror::Error;

use crate::value::ValueKind;

/// Errors returned by handle-addressed operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("handle does not belong to this runtime")]
    DanglingHandle,

    #[error("expected {expected} value, found {found}")]
    KindMismatch {
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("cannot serialize a cyclic value")]
    CyclicValue,

    #[error("array index {index} is out of range")]
    IndexOutOfRange { index: usize },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal diagnostics surfaced to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    #[error("cannot set reactive property on {kind} value")]
    SetOnNonContainer { kind: ValueKind },

    #[error("cannot delete reactive property on {kind} value")]
    DeleteOnNonContainer { kind: ValueKind },

    #[error(
        "avoid adding reactive property `{key}` to an instance or its root data at runtime; \
         declare it upfront instead"
    )]
    AddRootKey { key: String },

    #[error(
        "avoid deleting property `{key}` on an instance or its root data; set it to null instead"
    )]
    DeleteRootKey { key: String },

    #[error("`{key}` is not a valid array index")]
    InvalidArrayKey { key: String },
}
