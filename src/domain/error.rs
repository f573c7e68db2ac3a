//! Domain error types.

/// Top-level error type for autotrader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("feed error: {reason}")]
    Feed { reason: String },

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("order rejected: {reason}")]
    OrderRejected { reason: String },

    #[error("order transport failure: {reason}")]
    OrderTransport { reason: String },

    #[error("insufficient funds: need {required:.2}, have {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    /// A fill went through but its ledger or history write did not. Trading
    /// stays halted until the stores are reconciled and the process restarts.
    #[error("fill not persisted, manual reconciliation required: {reason}")]
    Unreconciled { reason: String },

    #[error("ledger store error: {reason}")]
    Ledger { reason: String },

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<TraderError> },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TraderError {
    /// Whether a retry at the collaborator boundary may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TraderError::Database { .. }
                | TraderError::Feed { .. }
                | TraderError::OrderTransport { .. }
                | TraderError::Ledger { .. }
                | TraderError::Io(_)
        )
    }
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) | TraderError::Json(_) | TraderError::Csv(_) => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. } => 2,
            TraderError::Database { .. }
            | TraderError::DatabaseQuery { .. }
            | TraderError::Ledger { .. }
            | TraderError::Unreconciled { .. } => 3,
            TraderError::OrderRejected { .. }
            | TraderError::OrderTransport { .. }
            | TraderError::InsufficientFunds { .. } => 4,
            TraderError::Feed { .. } | TraderError::InsufficientData { .. } => 5,
            TraderError::RetriesExhausted { last, .. } => return last.as_ref().into(),
        };
        std::process::ExitCode::from(code)
    }
}
