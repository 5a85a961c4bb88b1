use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A confirmed program transaction known to exist on the ledger,
/// whether or not it has been decoded yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SignatureRecord {
    pub signature: String,
    /// Block time in unix seconds.
    pub block_time: i64,
}

impl SignatureRecord {
    pub fn new(signature: impl Into<String>, block_time: i64) -> Self {
        Self {
            signature: signature.into(),
            block_time,
        }
    }
}
