use std::path::PathBuf;

/// Errors raised while configuring or constructing a simulation.
///
/// The time step itself never fails: every numerical edge case inside
/// `Solver::step` is resolved by policy and reported through `StepStats`.
#[derive(Debug, thiserror::Error)]
pub enum PfError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, PfError>;
