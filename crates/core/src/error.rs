use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid cluster reference: {0}")]
    InvalidClusterRef(String),
}
