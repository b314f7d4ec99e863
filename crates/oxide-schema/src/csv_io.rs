//! CSV import and export.

use std::io::{BufRead, Write};

use futures::TryStreamExt;
use sqlx::{Column, Executor, Row, Statement};
use tokio_util::sync::CancellationToken;
use tracing::info;

use oxide_schema_core::csv::{CsvDecoder, CsvEncoder, CsvOptions};
use oxide_schema_core::{quote_identifier, Field, Table};

use crate::database::Database;
use crate::error::{Result, SchemaError};

const IMPORT_SAVEPOINT: &str = "oxide_csv_import";

impl Database {
    /// Writes the result of `query` as CSV and returns the number of rows.
    ///
    /// NULL values are written as empty fields and blobs as lossy UTF-8.
    pub async fn export_query<W: Write>(
        &mut self,
        query: &str,
        writer: &mut W,
        options: &CsvOptions,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let encoder = CsvEncoder::new(options);
        let conn = self.conn.inner();

        if options.header {
            let statement = (&mut *conn).prepare(query).await?;
            let names: Vec<&str> = statement.columns().iter().map(Column::name).collect();
            encoder.write_record(writer, names.as_slice())?;
        }

        let mut rows = sqlx::query(query).fetch(&mut *conn);
        let mut count = 0;
        while let Some(row) = rows.try_next().await? {
            if cancel.is_cancelled() {
                return Err(SchemaError::Cancelled);
            }
            let fields = (0..row.len())
                .map(|i| {
                    row.try_get_unchecked::<Option<Vec<u8>>, _>(i).map(|value| {
                        value
                            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                            .unwrap_or_default()
                    })
                })
                .collect::<std::result::Result<Vec<String>, sqlx::Error>>()?;
            encoder.write_record(writer, fields.as_slice())?;
            count += 1;
        }
        writer.flush()?;

        info!(rows = count, "Exported CSV");
        Ok(count)
    }

    /// Writes every row of a table or view as CSV.
    pub async fn export_table<W: Write>(
        &mut self,
        name: &str,
        writer: &mut W,
        options: &CsvOptions,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let catalog = self.catalog();
        let object = catalog
            .get(name)
            .ok_or_else(|| SchemaError::TableNotFound(name.to_string()))?;
        let query = format!("SELECT * FROM {}", quote_identifier(&object.name));
        self.export_query(&query, writer, options, cancel).await
    }

    /// Imports CSV records into `table` and returns the number of rows
    /// inserted.
    ///
    /// A missing table is created with one `TEXT` column per field, named
    /// from the header record or `field1`, `field2`, .... Fields are matched
    /// to columns by position. The import runs in its own savepoint and is
    /// rolled back completely on failure or cancellation.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::CsvColumnMismatch` if an existing table has a
    /// different number of columns than the first record.
    pub async fn import_csv<R: BufRead>(
        &mut self,
        table: &str,
        reader: R,
        options: &CsvOptions,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let decoded = CsvDecoder::from_options(options)
            .decode_with_cancel(reader, || cancel.is_cancelled())?;
        if decoded.is_empty() {
            return Ok(0);
        }

        let mut rows = decoded.rows();
        let header = if options.header { rows.next() } else { None };
        let columns = decoded.columns;

        let existing = self.catalog().table(table).map(|o| o.fields.len());
        let create = match existing {
            Some(expected) if expected != columns => {
                return Err(SchemaError::CsvColumnMismatch {
                    table: table.to_string(),
                    expected,
                    found: columns,
                });
            }
            Some(_) => None,
            None => {
                let new_table = (0..columns)
                    .map(|i| {
                        let name = header
                            .and_then(|h| h.get(i))
                            .map(|n| n.trim())
                            .filter(|n| !n.is_empty())
                            .map_or_else(|| format!("field{}", i + 1), str::to_string);
                        Field::new(name, "TEXT")
                    })
                    .fold(Table::new(table), Table::with_field);
                new_table.validate()?;
                Some(new_table.sql())
            }
        };

        let placeholders = vec!["?"; columns].join(",");
        let insert = format!(
            "INSERT INTO {} VALUES ({placeholders})",
            quote_identifier(table)
        );

        self.begin_operation(IMPORT_SAVEPOINT).await?;
        if let Some(sql) = create {
            if let Err(err) = self.conn.execute(&sql).await {
                return Err(self.abort(IMPORT_SAVEPOINT, err.into()).await);
            }
        }

        let mut inserted = 0;
        for row in rows {
            if cancel.is_cancelled() {
                return Err(self.abort(IMPORT_SAVEPOINT, SchemaError::Cancelled).await);
            }
            let query = (0..columns).fold(sqlx::query(&insert), |query, i| {
                query.bind(row.get(i).map(String::as_str))
            });
            if let Err(err) = query.execute(self.conn.inner()).await {
                return Err(self.abort(IMPORT_SAVEPOINT, err.into()).await);
            }
            inserted += 1;
        }

        self.finish_operation(IMPORT_SAVEPOINT).await?;
        info!(table = %table, rows = inserted, "Imported CSV");
        Ok(inserted)
    }
}
