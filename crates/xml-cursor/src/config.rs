//! Options for the tokenizer and the sequence splitter.
//!
//! All structs deserialize with serde and fill missing keys from their
//! `Default` impls, so a partial TOML table is enough:
//!
//! ```toml
//! [reader]
//! skip_whitespace = true
//!
//! [sequence]
//! read_ahead = 1024
//! ```

use serde::Deserialize;

/// Bytes a [`crate::SequenceStream`] reads past the caller's request by default.
pub const DEFAULT_READ_AHEAD: usize = 256;

/// Tokenizer behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Drop whitespace-only text nodes instead of reporting them as
    /// [`crate::NodeKind::Whitespace`].
    pub skip_whitespace: bool,

    /// Reject end tags that do not match the open element.
    pub check_end_names: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            skip_whitespace: false,
            check_end_names: true,
        }
    }
}

/// Sequence splitter behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SequenceOptions {
    /// Extra bytes buffered beyond each read so a declaration straddling the
    /// read boundary is still found.
    pub read_ahead: usize,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            read_ahead: DEFAULT_READ_AHEAD,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reader: ReaderOptions,
    pub sequence: SequenceOptions,
}
