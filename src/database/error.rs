//! Document store errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique field already holds this value.
    #[error("duplicate value for unique field: {value}")]
    Duplicate { value: String },

    #[error("mongodb: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("bson encode: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error("bson decode: {0}")]
    Decode(String),
}

impl From<mongodb::bson::de::Error> for StoreError {
    fn from(e: mongodb::bson::de::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
