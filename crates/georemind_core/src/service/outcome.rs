//! Success/error envelope returned by data source operations.

/// Result of a data source call.
///
/// Expected failures such as a missing reminder travel as `Error(message)`
/// instead of a typed error, so UI callers can show the text directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Error(String),
}

impl<T> Outcome<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the payload, discarding an error message.
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Error(message) => Some(message.as_str()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Error(message) => Outcome::Error(message),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Error(message) => Err(message),
        }
    }
}

impl<T> From<Outcome<T>> for Result<T, String> {
    fn from(value: Outcome<T>) -> Self {
        value.into_result()
    }
}
