#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("failed to encode layout state: {0}")]
    EncodeState(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
