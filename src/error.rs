#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid credential key: {0}")]
    InvalidKey(String),
    #[error("Credential error: {0}")]
    Credential(String),
}
