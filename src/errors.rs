use std::fmt;

/// Custom error type that includes exit codes
#[derive(Debug)]
pub enum MeshgrabError {
    /// No upload control attached within budget (exit code 2)
    UploadControlNotFound(String),
    /// Browser runtime or its dependencies cannot be provisioned (exit code 3)
    EnvironmentUnavailable(String),
    /// WebDriver connection failed (exit code 4)
    WebDriverFailed(String),
    /// Operation timeout (exit code 5)
    Timeout(String),
    /// Generic error (exit code 1)
    Other(anyhow::Error),
}

impl MeshgrabError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            MeshgrabError::UploadControlNotFound(_) => 2,
            MeshgrabError::EnvironmentUnavailable(_) => 3,
            MeshgrabError::WebDriverFailed(_) => 4,
            MeshgrabError::Timeout(_) => 5,
            MeshgrabError::Other(_) => 1,
        }
    }
}

impl fmt::Display for MeshgrabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshgrabError::UploadControlNotFound(msg) => {
                write!(f, "Upload control not found: {}", msg)
            }
            MeshgrabError::EnvironmentUnavailable(msg) => {
                write!(f, "Browser runtime unavailable: {}", msg)
            }
            MeshgrabError::WebDriverFailed(msg) => {
                write!(f, "WebDriver connection failed: {}", msg)
            }
            MeshgrabError::Timeout(msg) => {
                write!(f, "Operation timed out: {}", msg)
            }
            MeshgrabError::Other(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for MeshgrabError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MeshgrabError::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for MeshgrabError {
    fn from(err: anyhow::Error) -> Self {
        // Detect specific error classes from the message chain
        let msg = format!("{:#}", err);

        if msg.contains("upload control") {
            MeshgrabError::UploadControlNotFound(msg)
        } else if msg.contains("could not be provisioned") || msg.contains("install") {
            MeshgrabError::EnvironmentUnavailable(msg)
        } else if msg.contains("WebDriver")
            || msg.contains("geckodriver")
            || msg.contains("chromedriver")
        {
            MeshgrabError::WebDriverFailed(msg)
        } else if msg.contains("timeout") || msg.contains("timed out") {
            MeshgrabError::Timeout(msg)
        } else {
            MeshgrabError::Other(err)
        }
    }
}
