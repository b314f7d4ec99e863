//! CSV encoding.

use std::borrow::Cow;
use std::io::Write;

use super::CsvOptions;

/// Writes records as delimited text.
#[derive(Debug, Clone)]
pub struct CsvEncoder {
    separator: Option<char>,
    quote: Option<char>,
    newline: String,
}

impl CsvEncoder {
    /// Creates an encoder from file options.
    #[must_use]
    pub fn new(options: &CsvOptions) -> Self {
        Self {
            separator: options.separator,
            quote: options.quote,
            newline: options.newline.clone(),
        }
    }

    fn is_special(&self, c: char) -> bool {
        Some(c) == self.separator || Some(c) == self.quote || self.newline.contains(c)
    }

    /// Encodes one field.
    ///
    /// The field is quoted, with embedded quotes doubled, if it contains the
    /// separator, the quote character or a newline character. Without a quote
    /// character fields are always written verbatim.
    #[must_use]
    pub fn encode_field<'a>(&self, field: &'a str) -> Cow<'a, str> {
        let Some(quote) = self.quote else {
            return Cow::Borrowed(field);
        };
        if !field.chars().any(|c| self.is_special(c)) {
            return Cow::Borrowed(field);
        }

        let doubled: String = [quote, quote].iter().collect();
        let escaped = field.replace(quote, &doubled);
        Cow::Owned(format!("{quote}{escaped}{quote}"))
    }

    /// Encodes one record, without the terminator.
    #[must_use]
    pub fn encode_record<S: AsRef<str>>(&self, fields: &[S]) -> String {
        let mut record = String::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                if let Some(separator) = self.separator {
                    record.push(separator);
                }
            }
            record.push_str(&self.encode_field(field.as_ref()));
        }
        record
    }

    /// Writes one record followed by the record terminator.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_record<W: Write, S: AsRef<str>>(
        &self,
        writer: &mut W,
        fields: &[S],
    ) -> std::io::Result<()> {
        writer.write_all(self.encode_record(fields).as_bytes())?;
        writer.write_all(self.newline.as_bytes())
    }
}
