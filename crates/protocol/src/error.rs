//! Error kinds shared by every layer, and the status body that carries
//! them across the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The operation target is missing on the side resolving it.
    NotFound,
    /// A read, write or open failed.
    IoFailure,
    /// The transport broke or carried a malformed frame.
    StreamFailure,
    /// The caller supplied an unusable name or message sequence.
    InvalidArgument,
}

impl ErrorKind {
    /// Transport status code reported for this kind (gRPC canonical codes).
    pub const fn code(self) -> u16 {
        match self {
            ErrorKind::InvalidArgument => 3,
            ErrorKind::NotFound => 5,
            ErrorKind::IoFailure => 13,
            ErrorKind::StreamFailure => 14,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            3 => Some(ErrorKind::InvalidArgument),
            5 => Some(ErrorKind::NotFound),
            13 => Some(ErrorKind::IoFailure),
            14 => Some(ErrorKind::StreamFailure),
            _ => None,
        }
    }

    /// Classifies an I/O error.
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionRefused => ErrorKind::StreamFailure,
            _ => ErrorKind::IoFailure,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::IoFailure => "I/O failure",
            ErrorKind::StreamFailure => "stream failure",
            ErrorKind::InvalidArgument => "invalid argument",
        };
        f.write_str(s)
    }
}

/// Error body sent in place of a reply when a call fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub kind: ErrorKind,
    pub code: u16,
    pub message: String,
}

impl Status {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip() {
        for kind in [
            ErrorKind::NotFound,
            ErrorKind::IoFailure,
            ErrorKind::StreamFailure,
            ErrorKind::InvalidArgument,
        ] {
            assert_eq!(ErrorKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ErrorKind::from_code(0), None);
    }

    #[test]
    fn io_errors_classified() {
        let nf = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_io(&nf), ErrorKind::NotFound);

        let eof = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        assert_eq!(ErrorKind::from_io(&eof), ErrorKind::StreamFailure);

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(ErrorKind::from_io(&denied), ErrorKind::IoFailure);
    }

    #[test]
    fn status_carries_code() {
        let status = Status::new(ErrorKind::NotFound, "file missing.txt not found");
        assert_eq!(status.code, 5);

        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"kind\":\"not_found\""));
        assert!(json.contains("\"code\":5"));
    }
}
