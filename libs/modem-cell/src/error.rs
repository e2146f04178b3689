use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModemError {
    #[error("Connection error: {0}")]
    Connect(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Device reported error {code}: {message}")]
    Device { code: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ModemError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ModemError::Connect(format!("request timed out: {}", err))
        } else {
            ModemError::Connect(err.to_string())
        }
    }
}

impl From<quick_xml::Error> for ModemError {
    fn from(err: quick_xml::Error) -> Self {
        ModemError::Parse(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Sink write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}
