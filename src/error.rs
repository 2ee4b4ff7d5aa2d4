use thiserror::Error;

#[derive(Debug, Error)]
pub enum AirdropError {
    #[error("weights must sum to 100, got {0}")]
    InvalidWeights(u32),

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid value for {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("malformed fixed-point amount: {0:?}")]
    MalformedAmount(String),

    #[error("malformed address: {0:?}")]
    MalformedAddress(String),

    #[error("arithmetic overflow while {0}")]
    Overflow(&'static str),

    #[error("subgraph request failed: {0}")]
    Subgraph(String),

    #[error("rpc request failed: {0}")]
    Rpc(String),
}

impl AirdropError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        AirdropError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Client-side validation failures, as opposed to internal or upstream faults.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AirdropError::InvalidWeights(_)
                | AirdropError::MissingParameter(_)
                | AirdropError::InvalidParameter { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AirdropError>;
