use serde::{Deserialize, Serialize};

/// The kind of error that occurred.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum ErrorKind {
    /// The content is moderated.
    Moderated,
    /// The model provider is rate limited.
    RateLimitExceeded,
    /// A number in the model output could not be converted or was out
    /// of range.
    InvalidNumber,
    /// Any other errors.
    Other,
}
