//! Delimited text codec.
//!
//! [`CsvDecoder`] tokenizes delimited text into a flat list of fields;
//! [`CsvEncoder`] writes fields back, quoting only where needed. Both are
//! configured from one [`CsvOptions`] value.

mod decode;
mod encode;

use serde::{Deserialize, Serialize};

pub use decode::{CsvDecoder, DecodedCsv};
pub use encode::CsvEncoder;

/// Format of a delimited text file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Whether the first record holds column names.
    pub header: bool,
    /// Field separator; `None` writes single-column output.
    pub separator: Option<char>,
    /// Quote character; `None` disables quoting.
    pub quote: Option<char>,
    /// Record terminator used when encoding.
    pub newline: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            header: true,
            separator: Some(','),
            quote: Some('"'),
            newline: String::from("\n"),
        }
    }
}

impl CsvOptions {
    /// Sets the field separator.
    #[must_use]
    pub const fn separator(mut self, separator: Option<char>) -> Self {
        self.separator = separator;
        self
    }

    /// Sets the quote character.
    #[must_use]
    pub const fn quote(mut self, quote: Option<char>) -> Self {
        self.quote = quote;
        self
    }

    /// Sets whether the first record holds column names.
    #[must_use]
    pub const fn header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Sets the record terminator.
    #[must_use]
    pub fn newline(mut self, newline: impl Into<String>) -> Self {
        self.newline = newline.into();
        self
    }
}

/// Errors raised while decoding.
#[derive(Debug)]
pub enum CsvError {
    /// Reading the input failed.
    Io(std::io::Error),
    /// The caller cancelled decoding.
    Cancelled,
}

impl core::fmt::Display for CsvError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read CSV input: {err}"),
            Self::Cancelled => write!(f, "CSV decoding cancelled"),
        }
    }
}

impl std::error::Error for CsvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Cancelled => None,
        }
    }
}

impl From<std::io::Error> for CsvError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
