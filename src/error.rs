//! Core error taxonomy for the Taqueria POS.
//!
//! Only failures the caller can act on become errors. Operations on ids that
//! no longer exist (stale button clicks after a delete) are silent no-ops,
//! and order mutations on a charged table are refused without surfacing an
//! error. Persistence failures never reach mutation callers; the in-memory
//! state stays authoritative for the session.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Bad input from the caller: empty table name, non-positive amount,
    /// malformed template payload, preset pointing at a deleted item.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An order mutation referenced an item id that is not in the catalog.
    #[error("unknown catalog item: {0}")]
    UnknownItem(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }
}
