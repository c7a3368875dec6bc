use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(reqwest::Error),

    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Server returned {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Wrong type for '{reference}': expected '{expected}', actual '{actual}'")]
    TypeMismatch {
        reference: String,
        expected: String,
        actual: String,
    },

    #[error("Malformed response: {message}")]
    Decode { message: String },

    #[error("Not found: {reference}")]
    NotFound { reference: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Classify a reqwest failure, keeping timeout as its own kind.
    pub fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            ClientError::Timeout {
                url: url.to_string(),
            }
        } else {
            ClientError::Transport(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::Remote {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Server returned 500: boom");

        let err = ClientError::TypeMismatch {
            reference: "Applications/app1".to_string(),
            expected: "udm.DeployedApplication".to_string(),
            actual: "udm.Environment".to_string(),
        };
        assert!(err.to_string().contains("udm.DeployedApplication"));
        assert!(err.to_string().contains("udm.Environment"));
    }
}
