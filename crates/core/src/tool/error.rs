use std::borrow::Cow;
use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The arguments violate the tool's parameter schema.
    Schema,
    /// The arguments are well-formed but miss a combination the
    /// requested action needs.
    Precondition,
    /// A downstream network call failed or returned an error.
    ExternalService,
    /// The requested action is not handled by the tool.
    UnknownAction,
    /// The model asked for a tool that was not offered.
    UnknownTool,
}

impl ErrorKind {
    /// Returns the stable name that is reported back to the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Schema => "SchemaError",
            ErrorKind::Precondition => "PreconditionError",
            ErrorKind::ExternalService => "ExternalServiceError",
            ErrorKind::UnknownAction => "UnknownAction",
            ErrorKind::UnknownTool => "UnknownTool",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Schema => write!(f, "Invalid arguments"),
            ErrorKind::Precondition => write!(f, "Precondition failed"),
            ErrorKind::ExternalService => write!(f, "External service error"),
            ErrorKind::UnknownAction => write!(f, "Unknown action"),
            ErrorKind::UnknownTool => write!(f, "Unknown tool"),
        }
    }
}

/// Describes a tool call error.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    reason: Option<String>,
}

impl Error {
    /// Creates a new error with the `Schema` kind.
    #[inline]
    pub fn schema() -> Self {
        Self::new(ErrorKind::Schema)
    }

    /// Creates a new error with the `Precondition` kind.
    #[inline]
    pub fn precondition() -> Self {
        Self::new(ErrorKind::Precondition)
    }

    /// Creates a new error with the `ExternalService` kind.
    #[inline]
    pub fn external_service() -> Self {
        Self::new(ErrorKind::ExternalService)
    }

    /// Creates a new error with the `UnknownAction` kind.
    #[inline]
    pub fn unknown_action() -> Self {
        Self::new(ErrorKind::UnknownAction)
    }

    /// Creates a new error with the `UnknownTool` kind.
    #[inline]
    pub fn unknown_tool() -> Self {
        Self::new(ErrorKind::UnknownTool)
    }

    #[inline]
    fn new(kind: ErrorKind) -> Self {
        Self { kind, reason: None }
    }

    /// Attaches a reason to the error.
    #[inline]
    pub fn with_reason<S: Into<String>>(self, reason: S) -> Self {
        Self {
            kind: self.kind,
            reason: Some(reason.into()),
        }
    }

    /// Returns the kind of the error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the reason for the error.
    #[inline]
    pub fn reason(&self) -> Cow<'_, str> {
        match self.reason.as_deref() {
            Some(reason) => Cow::Borrowed(reason),
            None => Cow::Owned(format!("{}", self.kind)),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_falls_back_to_kind() {
        let err = Error::external_service();
        assert_eq!(err.reason(), "External service error");

        let err = Error::precondition()
            .with_reason("Coin type and amount required for supply");
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(err.reason(), "Coin type and amount required for supply");
        assert_eq!(
            err.to_string(),
            "Precondition failed: Coin type and amount required for supply"
        );
    }
}
