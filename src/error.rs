// =============================================================================
// Error taxonomy
// =============================================================================
//
// `Config` is fatal and only ever raised before the loop starts.  Every other
// kind is caught at the tick boundary, logged, and the loop carries on.
// =============================================================================

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BotError {
    /// Market-data endpoint unreachable or returned something unusable.
    #[error("market data fetch failed: {0}")]
    Fetch(String),

    /// Not enough closes for the named indicator to be defined.
    #[error("insufficient data for {indicator}: need {needed} closes, have {available}")]
    InsufficientData {
        indicator: &'static str,
        needed: usize,
        available: usize,
    },

    /// Order transmission failed or the exchange answered with a non-200.
    /// `status` is `None` for transport-level failures.
    #[error("order submission failed (status {status:?}): {message}")]
    SignSubmit {
        status: Option<u16>,
        message: String,
    },

    /// Missing credentials or invalid configuration at startup.
    #[error("configuration error: {0}")]
    Config(String),
}

impl BotError {
    /// Short, stable label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::SignSubmit { .. } => "sign_submit",
            Self::Config(_) => "config",
        }
    }

    pub fn insufficient(indicator: &'static str, needed: usize, available: usize) -> Self {
        Self::InsufficientData {
            indicator,
            needed,
            available,
        }
    }
}

pub type BotResult<T> = std::result::Result<T, BotError>;
