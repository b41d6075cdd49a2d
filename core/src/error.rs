use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown typology '{name}'")]
    UnknownTypology { name: String },

    #[error("Unknown measurement unit '{name}'")]
    UnknownUnit { name: String },

    #[error("Unknown lever '{name}'")]
    UnknownLever { name: String },

    #[error("Unknown store size '{name}'")]
    UnknownStoreSize { name: String },

    #[error("At least one lever must be selected")]
    EmptyLeverSelection,

    #[error("Feature count '{field}' must be positive, got {value}")]
    InvalidFeatureCount { field: &'static str, value: i64 },

    #[error("Exchange rate must be positive, got {value}")]
    InvalidExchangeRate { value: f64 },

    #[error("Margin percentage must be positive, got {value}")]
    InvalidMargin { value: f64 },

    #[error("No cost entry for lever '{lever}' in typology '{typology}'")]
    NoCostData { typology: String, lever: String },

    #[error("Total investment is zero; ROI is undefined")]
    ZeroInvestment,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    /// Machine-readable reason code surfaced to API callers.
    pub fn reason_code(&self) -> &'static str {
        match self {
            EngineError::Database(_) => "database_error",
            EngineError::Serialization(_) => "serialization_error",
            EngineError::UnknownTypology { .. } => "unknown_typology",
            EngineError::UnknownUnit { .. } => "unknown_unit",
            EngineError::UnknownLever { .. } => "unknown_lever",
            EngineError::UnknownStoreSize { .. } => "unknown_store_size",
            EngineError::EmptyLeverSelection => "empty_lever_selection",
            EngineError::InvalidFeatureCount { .. } => "invalid_feature_count",
            EngineError::InvalidExchangeRate { .. } => "invalid_exchange_rate",
            EngineError::InvalidMargin { .. } => "invalid_margin",
            // Zero investment is the same caller-visible condition as a
            // missing cost entry: there is nothing to amortize.
            EngineError::NoCostData { .. } | EngineError::ZeroInvestment => "no_cost_data",
            EngineError::Other(_) => "internal_error",
        }
    }

    /// Validation errors are the caller's fault and are rejected before
    /// any query runs.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownTypology { .. }
                | EngineError::UnknownUnit { .. }
                | EngineError::UnknownLever { .. }
                | EngineError::UnknownStoreSize { .. }
                | EngineError::EmptyLeverSelection
                | EngineError::InvalidFeatureCount { .. }
                | EngineError::InvalidExchangeRate { .. }
                | EngineError::InvalidMargin { .. }
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
