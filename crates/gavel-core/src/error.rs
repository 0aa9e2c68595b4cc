use thiserror::Error;

#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("Oracle error: {0}")]
    Oracle(#[from] gavel_oracle::OracleError),

    #[error("Plan application error: {0}")]
    Apply(#[from] gavel_report::ApplyError),

    #[error("Configuration error: {0}")]
    Config(String),
}
