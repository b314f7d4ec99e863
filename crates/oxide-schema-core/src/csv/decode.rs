//! CSV decoding.

use std::io::BufRead;

use super::{CsvError, CsvOptions};

/// Result of decoding: all fields in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedCsv {
    /// Every field of every record, flattened.
    pub fields: Vec<String>,
    /// Number of fields in the first record.
    pub columns: usize,
    /// Number of records decoded.
    pub records: usize,
}

impl DecodedCsv {
    /// Returns the fields grouped into rows of [`columns`](Self::columns)
    /// fields each. The last row is shorter if the input was ragged.
    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.fields.chunks(self.columns.max(1))
    }

    /// Returns true if no record was decoded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records == 0
    }
}

/// Line-oriented CSV tokenizer.
#[derive(Debug, Clone)]
pub struct CsvDecoder {
    separator: Option<char>,
    quote: Option<char>,
    max_records: Option<usize>,
}

impl CsvDecoder {
    /// Creates a decoder for the given separator and quote character.
    #[must_use]
    pub const fn new(separator: Option<char>, quote: Option<char>) -> Self {
        Self {
            separator,
            quote,
            max_records: None,
        }
    }

    /// Creates a decoder from file options.
    #[must_use]
    pub const fn from_options(options: &CsvOptions) -> Self {
        Self::new(options.separator, options.quote)
    }

    /// Stops decoding after `max` records.
    #[must_use]
    pub const fn max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }

    /// Decodes every record of `reader`.
    ///
    /// # Errors
    ///
    /// Returns `CsvError::Io` if reading fails.
    pub fn decode<R: BufRead>(&self, reader: R) -> Result<DecodedCsv, CsvError> {
        self.decode_with_cancel(reader, || false)
    }

    /// Decodes records until the input ends, the record limit is reached or
    /// `is_cancelled` returns true. The callback is polled after each record.
    ///
    /// Outside quotes, spaces are dropped unless quoting is disabled. A line
    /// that ends inside quotes continues on the next line, joined by `\n`.
    ///
    /// # Errors
    ///
    /// Returns `CsvError::Io` if reading fails and `CsvError::Cancelled` if
    /// the callback requested cancellation.
    pub fn decode_with_cancel<R, F>(
        &self,
        reader: R,
        mut is_cancelled: F,
    ) -> Result<DecodedCsv, CsvError>
    where
        R: BufRead,
        F: FnMut() -> bool,
    {
        let mut decoded = DecodedCsv::default();
        let mut field = String::new();
        let mut in_quotes = false;

        for line in reader.lines() {
            if self.max_records.is_some_and(|max| decoded.records >= max) {
                break;
            }

            let line = line?;
            let mut chars = line.chars().peekable();
            while let Some(c) = chars.next() {
                if Some(c) == self.quote {
                    if in_quotes && chars.peek() == Some(&c) {
                        field.push(c);
                        chars.next();
                    } else {
                        in_quotes = !in_quotes;
                    }
                } else if Some(c) == self.separator && !in_quotes {
                    decoded.fields.push(std::mem::take(&mut field));
                } else if c == ' ' {
                    if in_quotes || self.quote.is_none() {
                        field.push(c);
                    }
                } else if (c == '\r' || c == '\n') && !in_quotes {
                    // stray terminator left over by the line reader
                } else {
                    field.push(c);
                }
            }

            if in_quotes {
                field.push('\n');
                continue;
            }
            finish_record(&mut decoded, &mut field);

            if is_cancelled() {
                return Err(CsvError::Cancelled);
            }
        }

        if in_quotes {
            field.pop();
            finish_record(&mut decoded, &mut field);
        }

        Ok(decoded)
    }
}

fn finish_record(decoded: &mut DecodedCsv, field: &mut String) {
    decoded.fields.push(std::mem::take(field));
    decoded.records += 1;
    if decoded.records == 1 {
        decoded.columns = decoded.fields.len();
    }
}
