//! Error types for the capture and compositing pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating a mockup
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed URL or unsupported device/quality value
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The page never reached the network-settled state
    #[error("Navigation timed out after {0}ms")]
    NavigationTimeout(u64),

    /// The target host could not be resolved
    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),

    /// Any other navigation failure (connection refused, TLS, ...)
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Frame template missing/corrupt, or the resize/mask step failed
    #[error("Compositing failed: {0}")]
    Compositing(String),

    /// Temporary or output file could not be written
    #[error("Filesystem error: {0}")]
    Filesystem(String),

    /// The capture browser could not be started or is gone
    #[error("Capture backend initialization failed: {0}")]
    Initialization(String),

    /// Invalid configuration file
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Message suitable for showing to the person who submitted the request.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(detail) => format!("Invalid request data: {}", detail),
            Error::NavigationTimeout(_) => {
                "The website took too long to load. Please try again or check if the URL is accessible.".to_string()
            }
            Error::DnsResolution(_) => {
                "Could not resolve the website URL. Please check if the URL is correct and accessible.".to_string()
            }
            Error::Navigation(_) => {
                "The website could not be loaded. Please check the URL and try again.".to_string()
            }
            Error::Compositing(_) => {
                "Failed to place the screenshot inside the device frame. Please try again later.".to_string()
            }
            Error::Filesystem(_) => "Failed to save the mockup. Please try again later.".to_string(),
            Error::Initialization(_) => {
                "The capture browser is unavailable. Please try again later.".to_string()
            }
            Error::Config(_) => "The mockup service is misconfigured.".to_string(),
        }
    }

    /// Whether the failure is attributable to the submitted request rather
    /// than to the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::NavigationTimeout(_) | Error::DnsResolution(_)
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Filesystem(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_are_distinct_per_kind() {
        let errors = [
            Error::Validation("bad url".into()),
            Error::NavigationTimeout(60000),
            Error::DnsResolution("nope.invalid".into()),
            Error::Navigation("refused".into()),
            Error::Compositing("frame".into()),
            Error::Filesystem("disk".into()),
            Error::Initialization("chrome".into()),
            Error::Config("json".into()),
        ];
        let messages: std::collections::HashSet<String> =
            errors.iter().map(|e| e.user_message()).collect();
        assert_eq!(messages.len(), errors.len());
    }

    #[test]
    fn request_side_failures_are_client_errors() {
        assert!(Error::DnsResolution("x".into()).is_client_error());
        assert!(Error::NavigationTimeout(1).is_client_error());
        assert!(!Error::Compositing("x".into()).is_client_error());
        assert!(!Error::Filesystem("x".into()).is_client_error());
    }
}
