use crate::codec::MessageCodecError;

#[derive(Debug)]
pub enum Error {
    /// The transport could not be established, or the server refused the
    /// handshake credentials.
    ConnectionError(String),
    /// The certificate material presented by the server does not match the
    /// trust material the client was configured with.
    TrustError,
    /// A malformed or rejected exchange with the server.
    ProtocolError(String),
    /// The operation was attempted or still pending while the client shut
    /// down.
    ConnectionClosed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::ConnectionError(reason) => write!(f, "connection failed: {}", reason),
            Error::TrustError => write!(f, "server certificate does not match trust material"),
            Error::ProtocolError(reason) => write!(f, "protocol error: {}", reason),
            Error::ConnectionClosed => write!(f, "connection closed"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::ConnectionError(error.to_string())
    }
}

impl From<MessageCodecError> for Error {
    fn from(error: MessageCodecError) -> Self {
        match error {
            MessageCodecError::IoError(e) => Error::ConnectionError(e.to_string()),
            MessageCodecError::InvalidMessage(e) => Error::ProtocolError(e.to_string()),
        }
    }
}
