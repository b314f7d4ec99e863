//! oxide-schema CLI
//!
//! Command-line tool for editing the schema of SQLite databases.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_schema::prelude::*;
use oxide_schema::Settings;

/// Savepoint-safe schema editing for SQLite databases.
#[derive(Parser)]
#[command(name = "oxide-schema")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database file.
    #[arg(short, long, env = "OXIDE_SCHEMA_DATABASE")]
    database: PathBuf,

    /// Settings file.
    #[arg(long, env = "OXIDE_SCHEMA_SETTINGS", default_value = "oxide-schema.json")]
    settings: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Revert all changes at the end instead of committing them.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables, views, indices and triggers.
    Tables,

    /// Show the stored SQL of an object.
    Schema {
        /// Object name.
        name: String,
    },

    /// Create a table.
    CreateTable {
        /// Table name.
        name: String,

        /// Column definition, e.g. "id integer PRIMARY KEY". Repeatable.
        #[arg(short, long = "column", required = true)]
        columns: Vec<String>,

        /// Create a WITHOUT ROWID table.
        #[arg(long)]
        without_rowid: bool,
    },

    /// Append a column to a table.
    AddColumn {
        /// Table name.
        table: String,
        /// Column definition.
        definition: String,
    },

    /// Rename a column, keeping its data.
    RenameColumn {
        /// Table name.
        table: String,
        /// Current column name.
        column: String,
        /// New column name.
        new_name: String,
    },

    /// Replace the definition of a column, keeping its data.
    ModifyColumn {
        /// Table name.
        table: String,
        /// Current column name.
        column: String,
        /// New column definition.
        definition: String,
    },

    /// Swap a column with the one OFFSET positions away.
    MoveColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Positions to move; negative moves left.
        #[arg(allow_hyphen_values = true)]
        offset: isize,
    },

    /// Drop a column and its data.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Rename a table.
    RenameTable {
        /// Current name.
        from: String,
        /// New name.
        to: String,
    },

    /// Import a CSV file into a table, creating it if needed.
    ImportCsv {
        /// Target table.
        table: String,
        /// CSV file.
        file: PathBuf,
        #[command(flatten)]
        format: CsvFormat,
    },

    /// Export a table, view or query as CSV.
    ExportCsv {
        /// Table or view name, or a SELECT statement with --query.
        source: String,
        /// Treat SOURCE as a query.
        #[arg(long)]
        query: bool,
        /// Output file (stdout if not specified).
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        format: CsvFormat,
    },

    /// Execute an SQL script.
    Exec {
        /// Script file (stdin if neither a file nor --sql is given).
        file: Option<PathBuf>,
        /// Script text.
        #[arg(long, conflicts_with = "file")]
        sql: Option<String>,
    },
}

/// Separator or quote character; `None` disables it.
#[derive(Debug, Clone, Copy)]
struct CsvChar(Option<char>);

/// CSV format overrides. Unset options keep the remembered settings.
#[derive(Args, Debug)]
struct CsvFormat {
    /// Separator: comma, semicolon, tab, pipe, none or a single character.
    #[arg(long, value_parser = parse_separator)]
    separator: Option<CsvChar>,

    /// Quote: double, single, none or a single character.
    #[arg(long, value_parser = parse_quote)]
    quote: Option<CsvChar>,

    /// Line terminator: crlf, lf or custom text.
    #[arg(long, value_parser = parse_newline)]
    newline: Option<String>,

    /// Whether the first record holds column names.
    #[arg(long)]
    header: Option<bool>,
}

impl CsvFormat {
    fn apply(&self, mut options: CsvOptions) -> CsvOptions {
        if let Some(CsvChar(separator)) = self.separator {
            options.separator = separator;
        }
        if let Some(CsvChar(quote)) = self.quote {
            options.quote = quote;
        }
        if let Some(newline) = &self.newline {
            options.newline.clone_from(newline);
        }
        if let Some(header) = self.header {
            options.header = header;
        }
        options
    }
}

fn single_char(value: &str) -> std::result::Result<CsvChar, String> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(CsvChar(Some(c))),
        _ => Err(format!("expected a single character, got '{value}'")),
    }
}

fn parse_separator(value: &str) -> std::result::Result<CsvChar, String> {
    match value.to_ascii_lowercase().as_str() {
        "comma" => Ok(CsvChar(Some(','))),
        "semicolon" => Ok(CsvChar(Some(';'))),
        "tab" => Ok(CsvChar(Some('\t'))),
        "pipe" => Ok(CsvChar(Some('|'))),
        "none" => Ok(CsvChar(None)),
        _ => single_char(value),
    }
}

fn parse_quote(value: &str) -> std::result::Result<CsvChar, String> {
    match value.to_ascii_lowercase().as_str() {
        "double" => Ok(CsvChar(Some('"'))),
        "single" => Ok(CsvChar(Some('\''))),
        "none" => Ok(CsvChar(None)),
        _ => single_char(value),
    }
}

fn parse_newline(value: &str) -> std::result::Result<String, String> {
    match value.to_ascii_lowercase().as_str() {
        "crlf" => Ok(String::from("\r\n")),
        "lf" => Ok(String::from("\n")),
        "" => Err(String::from("line terminator cannot be empty")),
        _ => Ok(value.to_string()),
    }
}

/// Parses column definitions the way they appear inside `CREATE TABLE`.
fn parse_table(name: &str, columns: &[String]) -> anyhow::Result<Table> {
    let sql = format!("CREATE TABLE x ({})", columns.join(", "));
    let mut table = oxide_schema_core::Parser::new(&sql)
        .parse_create_table()
        .with_context(|| format!("invalid column definition in: {}", columns.join(", ")))?;
    table.set_name(name);
    Ok(table)
}

fn parse_field(definition: &str) -> anyhow::Result<Field> {
    let table = parse_table("x", &[definition.to_string()])?;
    match table.fields() {
        [field] => Ok(field.clone()),
        _ => bail!("expected exactly one column definition, got '{definition}'"),
    }
}

fn print_report(report: &TransformReport) {
    for failure in &report.failed_dependents {
        println!(
            "Could not recreate {} '{}': {}",
            failure.object_type, failure.name, failure.error
        );
    }
    for clause in &report.dropped_clauses {
        println!("Not carried over: {clause}");
    }
}

fn setup_signal_handler() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Cancelling...");
            token.cancel();
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut settings = Settings::load(&cli.settings)?;
    let mut db = Database::create(&cli.database, settings.database_options()).await?;
    let cancel = setup_signal_handler();

    match cli.command {
        Commands::Tables => {
            let catalog = db.catalog();
            for object in catalog.objects() {
                if object.table_name == object.name {
                    println!("{:<8} {}", object.object_type, object.name);
                } else {
                    println!(
                        "{:<8} {} (on {})",
                        object.object_type, object.name, object.table_name
                    );
                }
            }
        }

        Commands::Schema { name } => {
            let catalog = db.catalog();
            let Some(object) = catalog.get(&name) else {
                bail!("no object named '{name}'");
            };
            println!("{}", object.sql);
        }

        Commands::CreateTable {
            name,
            columns,
            without_rowid,
        } => {
            let mut table = parse_table(&name, &columns)?;
            if without_rowid {
                table.set_without_rowid(true);
            }
            db.create_table_from(&table).await?;
        }

        Commands::AddColumn { table, definition } => {
            let field = parse_field(&definition)?;
            db.add_column(&table, &field).await?;
        }

        Commands::RenameColumn {
            table,
            column,
            new_name,
        } => {
            let report = db.rename_column(&table, &column, &new_name, &cancel).await?;
            print_report(&report);
        }

        Commands::ModifyColumn {
            table,
            column,
            definition,
        } => {
            let field = parse_field(&definition)?;
            let report = db.modify_column(&table, &column, field, &cancel).await?;
            print_report(&report);
        }

        Commands::MoveColumn {
            table,
            column,
            offset,
        } => {
            let report = db.move_column(&table, &column, offset, &cancel).await?;
            print_report(&report);
        }

        Commands::DropColumn { table, column } => {
            let report = db.drop_column(&table, &column, &cancel).await?;
            print_report(&report);
        }

        Commands::RenameTable { from, to } => {
            db.rename_table(&from, &to).await?;
        }

        Commands::ImportCsv {
            table,
            file,
            format,
        } => {
            let options = format.apply(settings.import_csv.clone());
            let reader = BufReader::new(
                File::open(&file).with_context(|| format!("cannot open {}", file.display()))?,
            );
            let rows = db.import_csv(&table, reader, &options, &cancel).await?;
            println!("Imported {rows} rows into '{table}'");
            settings.import_csv = options;
            settings.save(&cli.settings)?;
        }

        Commands::ExportCsv {
            source,
            query,
            output,
            format,
        } => {
            let options = format.apply(settings.export_csv.clone());
            let mut writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path)
                        .with_context(|| format!("cannot create {}", path.display()))?,
                )),
                None => Box::new(std::io::stdout().lock()),
            };
            let rows = if query {
                db.export_query(&source, &mut writer, &options, &cancel).await?
            } else {
                db.export_table(&source, &mut writer, &options, &cancel).await?
            };
            drop(writer);
            if output.is_some() {
                println!("Exported {rows} rows");
            }
            settings.export_csv = options;
            settings.save(&cli.settings)?;
        }

        Commands::Exec { file, sql } => {
            let script = match (file, sql) {
                (_, Some(sql)) => sql,
                (Some(path), None) => std::fs::read_to_string(&path)
                    .with_context(|| format!("cannot read {}", path.display()))?,
                (None, None) => {
                    let mut script = String::new();
                    std::io::stdin().read_to_string(&mut script)?;
                    script
                }
            };
            let statements = db.execute_script(&script, &cancel).await?;
            info!(statements, "Script executed");
        }
    }

    if cli.dry_run && db.is_dirty() {
        info!("Dry run - reverting all changes.");
        db.close(CloseAction::Rollback).await?;
    } else {
        db.close(CloseAction::Commit).await?;
    }

    Ok(())
}
