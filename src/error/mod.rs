#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration Error: {0}")]
    Configuration(String),

    #[error("Record Error: {0}")]
    Record(String),

    #[error("Validation Error: {0} should be {1}")]
    Validation(String, String),
}
