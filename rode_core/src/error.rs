use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum TrackerError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("phase input error: {0}")]
    Input(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing encoder input")]
    MissingInput,
    #[error("missing count store")]
    MissingStore,
    #[error("missing length sink")]
    MissingSink,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
