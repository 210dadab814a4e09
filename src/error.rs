use thiserror::Error;

/// Errors produced while encoding a log record.
///
/// Marshaling failures are recovered field-locally by the dispatch in
/// [`crate::field::Field::add_to`]; reflection failures propagate to the
/// caller of the add/append operation that triggered them. Neither aborts
/// the record being encoded, and container brackets stay balanced on every
/// failure path.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A user-supplied array or object marshaler reported a failure.
    #[error("field marshaling failed: {0}")]
    Marshal(String),

    /// The structural fallback serializer rejected a reflected value.
    #[error("structural encoding failed: {0}")]
    Reflect(#[from] serde_json::Error),
}

impl EncodeError {
    /// Convenience constructor for marshaler implementations.
    pub fn marshal(msg: impl Into<String>) -> Self {
        EncodeError::Marshal(msg.into())
    }
}
