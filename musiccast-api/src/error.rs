use thiserror::Error;

/// Errors returned by the MusicCast device API
///
/// Transport problems and malformed payloads are kept apart from device-side
/// rejections so callers can decide which ones are worth logging loudly.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network communication error
    ///
    /// The device could not be reached, the connection was reset, or the
    /// request timed out.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Response parsing error
    ///
    /// The device answered, but the body was not the JSON shape we expected.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The device answered with a non-zero `response_code`
    #[error("Device error: response code {0}")]
    DeviceError(i64),
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ApiError::ParseError(error.to_string())
        } else {
            ApiError::NetworkError(error.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::ParseError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_display() {
        let error = ApiError::DeviceError(4);
        assert_eq!(error.to_string(), "Device error: response code 4");
    }

    #[test]
    fn test_serde_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let api_error: ApiError = json_error.into();
        assert!(matches!(api_error, ApiError::ParseError(_)));
    }
}
