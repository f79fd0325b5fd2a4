//! Errors returned by the AWS API seams

use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use stratus_core::provider::ProviderError;
use thiserror::Error;

/// Error from an AWS API call or from interpreting its response
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The service answered with an error code
    #[error("{code}: {message}")]
    Service { code: String, message: String },

    /// The request never got a service answer (network, credentials, ...)
    #[error("request failed: {0}")]
    Transport(String),

    #[error("couldn't find resource: {what}")]
    NotFound { what: String },

    /// The call succeeded but carried none of the expected data
    #[error("empty result: {what}")]
    EmptyResult { what: String },

    #[error("too many results for {what}: wanted 1, got {count}")]
    TooManyResults { what: String, count: usize },

    /// A request could not be assembled from configuration
    #[error("building request: {0}")]
    Build(String),

    #[error("timeout while waiting: {0}")]
    Timeout(Box<ApiError>),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn empty_result(what: impl Into<String>) -> Self {
        Self::EmptyResult { what: what.into() }
    }

    /// Service error code, looking through timeouts
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            Self::Timeout(inner) => inner.code(),
            _ => None,
        }
    }

    /// Whether the service answered with one of `codes`
    pub fn is_code(&self, codes: &[&str]) -> bool {
        self.code().is_some_and(|c| codes.contains(&c))
    }

    /// Finders report missing objects as NotFound or EmptyResult
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::EmptyResult { .. })
    }

    /// Wrap into a ProviderError with `context` as message prefix
    pub fn into_provider_error(self, context: impl std::fmt::Display) -> ProviderError {
        ProviderError::new(format!("{}: {}", context, self)).with_cause(self)
    }
}

// Every aws-sdk-* crate re-exports these smithy types, so one impl covers all clients.
impl<E, R> From<SdkError<E, R>> for ApiError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    fn from(err: SdkError<E, R>) -> Self {
        match err.as_service_error() {
            Some(service_err) if service_err.code().is_some() => ApiError::Service {
                code: service_err.code().unwrap_or_default().to_string(),
                message: service_err.message().unwrap_or_default().to_string(),
            },
            _ => ApiError::Transport(DisplayErrorContext(&err).to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_matching() {
        let err = ApiError::service("WAFStaleDataException", "token already used");
        assert_eq!(err.code(), Some("WAFStaleDataException"));
        assert!(err.is_code(&["ThrottlingException", "WAFStaleDataException"]));
        assert!(!err.is_code(&["WAFNonexistentItemException"]));
        assert_eq!(
            err.to_string(),
            "WAFStaleDataException: token already used"
        );

        let timeout = ApiError::Timeout(Box::new(err));
        assert_eq!(timeout.code(), Some("WAFStaleDataException"));
        assert!(ApiError::Transport("dns".to_string()).code().is_none());
    }

    #[test]
    fn not_found_classification() {
        assert!(ApiError::not_found("x").is_not_found());
        assert!(ApiError::empty_result("x").is_not_found());
        assert!(!ApiError::service("WAFNonexistentItemException", "gone").is_not_found());
    }

    #[test]
    fn provider_error_keeps_cause() {
        let err = ApiError::service("AccessDeniedException", "no");
        let provider_err = err.into_provider_error("reading WAF Size Constraint Set (abc)");
        assert_eq!(
            provider_err.to_string(),
            "reading WAF Size Constraint Set (abc): AccessDeniedException: no"
        );
        assert!(std::error::Error::source(&provider_err).is_some());
    }
}
