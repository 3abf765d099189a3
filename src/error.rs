use std::fmt;
use std::io;

/// Failure while reading a request off a connection.
///
/// `Malformed` and `BodyOverflow` are answered with `400 Bad Request`; the
/// transport variants abandon the connection without a response.
#[derive(Debug)]
pub enum ParseError {
    /// The request line, method token or a required header could not be used.
    Malformed {
        /// Short description of what was wrong
        reason: String,
    },
    /// The client sent more body bytes than it declared and the server is
    /// configured to reject such requests.
    BodyOverflow {
        /// Declared Content-Length
        declared: usize,
        /// Bytes received so far
        received: usize,
    },
    /// The stream ended before the declared body was complete.
    TruncatedBody {
        /// Declared Content-Length
        declared: usize,
        /// Bytes received before EOF
        received: usize,
    },
    /// Underlying socket or TLS error.
    Io(io::Error),
}

impl ParseError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ParseError::Malformed {
            reason: reason.into(),
        }
    }

    /// Whether the client should receive a `400 Bad Request` for this failure.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ParseError::Malformed { .. } | ParseError::BodyOverflow { .. }
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Malformed { reason } => write!(f, "malformed request: {reason}"),
            ParseError::BodyOverflow { declared, received } => write!(
                f,
                "request body exceeds Content-Length: declared {declared} bytes, received {received}"
            ),
            ParseError::TruncatedBody { declared, received } => write!(
                f,
                "connection closed mid-body: declared {declared} bytes, received {received}"
            ),
            ParseError::Io(err) => write!(f, "i/o error while reading request: {err}"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(err: io::Error) -> Self {
        ParseError::Io(err)
    }
}

/// Registration error returned by [`crate::router::Router::register`].
#[derive(Debug)]
pub enum RouterError {
    /// The method string is not a valid HTTP token.
    InvalidMethod {
        /// The rejected method
        method: String,
    },
    /// The pattern failed to compile as a regular expression.
    InvalidPattern {
        /// The pattern as given by the caller
        pattern: String,
        /// Compiler diagnostic
        source: regex::Error,
    },
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::InvalidMethod { method } => {
                write!(f, "invalid HTTP method '{method}'")
            }
            RouterError::InvalidPattern { pattern, source } => {
                write!(f, "invalid route pattern '{pattern}': {source}")
            }
        }
    }
}

impl std::error::Error for RouterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouterError::InvalidPattern { source, .. } => Some(source),
            RouterError::InvalidMethod { .. } => None,
        }
    }
}
