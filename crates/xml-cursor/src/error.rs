//! Error type shared by the cursor layer and the sequence splitter.

use std::io;
use std::path::PathBuf;

use crate::node::NodeKind;

/// Result type alias for xml-cursor operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A constructor argument was rejected (bad pattern, bad XPath, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not possible in the cursor's current state.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Materializing the subtree of the current node failed.
    #[error("Failed to expand <{name}>: {message}")]
    Expansion { name: String, message: String },

    /// A concatenated-document file did not have the expected layout.
    #[error("Malformed XML sequence in {}: {message}", .path.display())]
    MalformedSequence { path: PathBuf, message: String },

    /// A node of this kind cannot be handled by the requested operation.
    #[error("Node-type not implemented: {kind} ({context})")]
    UnsupportedNodeKind { kind: NodeKind, context: String },

    /// Syntax or encoding error reported by the tokenizer.
    #[error("XML error: {message}{}", .position.map(|p| format!(" at byte {p}")).unwrap_or_default())]
    Xml {
        message: String,
        position: Option<u64>,
    },

    #[error("XPath error: {0}")]
    XPath(String),

    #[error("Failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Convert an I/O error that may carry one of our own errors, as happens
    /// when a [`crate::SequenceStream`] reports a malformed sequence through
    /// the `io::Read` interface.
    pub fn from_io(err: io::Error) -> Self {
        match err.downcast::<Error>() {
            Ok(inner) => inner,
            Err(err) => Error::Io(err),
        }
    }

    pub(crate) fn from_xml(err: quick_xml::Error, position: u64) -> Self {
        match Error::from(err) {
            Error::Xml { message, .. } => Error::Xml {
                message,
                position: Some(position),
            },
            other => other,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        if let quick_xml::Error::Io(io) = &err {
            if let Some(Error::MalformedSequence { path, message }) = io
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<Error>())
            {
                return Error::MalformedSequence {
                    path: path.clone(),
                    message: message.clone(),
                };
            }
        }
        Error::Xml {
            message: err.to_string(),
            position: None,
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml {
            message: format!("Invalid attribute: {err}"),
            position: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_unwraps_malformed_sequence() {
        let inner = Error::MalformedSequence {
            path: PathBuf::from("seq.xml"),
            message: "declaration not at start".to_string(),
        };
        let io = io::Error::new(io::ErrorKind::InvalidData, inner);
        assert!(matches!(
            Error::from_io(io),
            Error::MalformedSequence { .. }
        ));
    }

    #[test]
    fn test_from_io_keeps_plain_io_errors() {
        let io = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert!(matches!(Error::from_io(io), Error::Io(_)));
    }

    #[test]
    fn test_xml_error_display_includes_position() {
        let err = Error::Xml {
            message: "unexpected end".to_string(),
            position: Some(12),
        };
        assert_eq!(err.to_string(), "XML error: unexpected end at byte 12");
    }
}
