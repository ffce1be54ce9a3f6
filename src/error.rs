use std::{error, io};

pub type BoxError = Box<dyn error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    Argument(String),

    #[error(
        "Did not receive a session key from splunkd. \
         Please enable passAuth in inputs.conf for this script"
    )]
    MissingSessionKey,

    #[error("{message}")]
    Credential {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("{operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
        transient: bool,
        #[source]
        source: Option<BoxError>,
    },

    #[error("malformed {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not serialize {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("writer failed with error {0}")]
    Output(#[from] io::Error),
}

impl Error {
    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential {
            message: message.into(),
            source: None,
        }
    }

    pub fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Transport {
            operation,
            message: message.into(),
            transient: false,
            source: None,
        }
    }

    /// Marks a transport error as worth retrying. No-op for other kinds.
    pub fn into_transient(self) -> Self {
        match self {
            Self::Transport {
                operation,
                message,
                source,
                ..
            } => Self::Transport {
                operation,
                message,
                transient: true,
                source,
            },
            other => other,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { transient: true, .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Argument(_) | Self::MissingSessionKey => 2,
            _ => 1,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let transient = err.is_timeout() || err.is_connect();
        Self::Transport {
            operation: "http request",
            message: err.to_string(),
            transient,
            source: Some(Box::new(err)),
        }
    }
}

impl<E: error::Error + Send + Sync + 'static> From<(&'static str, E)> for Error {
    fn from((operation, err): (&'static str, E)) -> Self {
        Self::Transport {
            operation,
            message: err.to_string(),
            transient: false,
            source: Some(Box::new(err)),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
