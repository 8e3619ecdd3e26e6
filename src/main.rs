//! Purpose: `docshelf` CLI entry point.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Successful commands print exactly one JSON value on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Tables are addressed as `--dir` (prefix) plus the table name (suffix).
use std::error::Error as StdError;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use docshelf::api::{
    Document, Durability, Error, ErrorKind, FieldFilter, Location, Store, StoreOptions,
    to_exit_code,
};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    to_exit_code(ErrorKind::Usage)
                } else {
                    0
                };
                return Ok(RunOutcome { exit_code });
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Run `docshelf --help` for usage."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    let dir = cli.dir.unwrap_or_else(|| PathBuf::from("."));
    let store = Store::with_options(StoreOptions::new(cli.durability.into()));

    command_dispatch::dispatch_command(cli.command, &store, &dir).map_err(|err| (err, color_mode))
}

#[derive(Parser, Debug)]
#[command(
    name = "docshelf",
    version,
    about = "Embedded document store: one JSON file per record, one directory per table",
    after_help = r#"EXAMPLES
  $ docshelf insert person p0926 '{"Name": "James", "Age": 33, "Sex": false}'
  $ docshelf get person p0926
  $ docshelf all person --where Age=55
  $ docshelf sum animal Legs --where Beak=true

NOTES
  - Tables live under --dir (default: current directory): <dir>/<table>/<id>.json
  - --where compares trimmed, case-insensitive text and may be repeated (AND)"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        help = "Directory holding the tables (default: current directory)",
        value_hint = ValueHint::DirPath
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,
    #[arg(
        long,
        default_value = "fast",
        value_enum,
        help = "Write durability for inserts: fast|flush (fsync each record)"
    )]
    durability: DurabilityCli,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum DurabilityCli {
    Fast,
    Flush,
}

impl From<DurabilityCli> for Durability {
    fn from(value: DurabilityCli) -> Self {
        match value {
            DurabilityCli::Fast => Durability::Fast,
            DurabilityCli::Flush => Durability::Flush,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Insert (or overwrite) a record")]
    Insert {
        table: String,
        id: String,
        #[arg(help = "JSON object to store (read from stdin when omitted)")]
        data: Option<String>,
    },
    #[command(about = "Print one record envelope")]
    Get { table: String, id: String },
    #[command(about = "List record ids in a table")]
    Ids { table: String },
    #[command(about = "Print every record in a table, optionally filtered")]
    All {
        table: String,
        #[arg(long = "where", value_name = "FIELD=VALUE")]
        clauses: Vec<String>,
    },
    #[command(about = "Delete one or more records")]
    Delete {
        table: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    #[command(about = "Count records, optionally filtered")]
    Count {
        table: String,
        #[arg(long = "where", value_name = "FIELD=VALUE")]
        clauses: Vec<String>,
    },
    #[command(about = "Sum an integer field, optionally filtered")]
    Sum {
        table: String,
        field: String,
        #[arg(long = "where", value_name = "FIELD=VALUE")]
        clauses: Vec<String>,
    },
    #[command(about = "Generate shell completions")]
    Completion { shell: Shell },
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    rendered
        .lines()
        .next()
        .map(|line| line.trim_start_matches("error:").trim().to_string())
        .filter(|line| !line.is_empty())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn table_location(dir: &std::path::Path, table: &str) -> Result<Location, Error> {
    if table.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("table name must not be empty")
            .with_hint("Pass a table name such as `person`."));
    }
    Ok(Location::from(dir).with_suffix(table))
}

fn parse_where_clauses(clauses: &[String]) -> Result<FieldFilter, Error> {
    let mut filter = FieldFilter::new();
    for clause in clauses {
        let Some((field, value)) = clause.split_once('=') else {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("invalid --where clause `{clause}`"))
                .with_hint("Use FIELD=VALUE, e.g. --where Age=55."));
        };
        let field = field.trim();
        if field.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("invalid --where clause `{clause}`"))
                .with_hint("The field name before `=` must not be empty."));
        }
        filter = filter.field_eq(field, value);
    }
    Ok(filter)
}

fn read_document(data: Option<String>) -> Result<Document, Error> {
    let text = match data {
        Some(text) => text,
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read stdin")
                    .with_source(err)
            })?;
            text
        }
    };
    let value: Value = serde_json::from_str(&text).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid JSON document")
            .with_hint("Pass a JSON object inline or on stdin.")
            .with_source(err)
    })?;
    Document::from_value(value)
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", err.kind()))
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        causes.push(source.to_string());
        current = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(id) = err.id() {
        inner.insert("id".to_string(), json!(id));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(id) = err.id() {
        lines.push(format!(
            "{} {id}",
            colorize_label("id:", use_color, AnsiColor::Yellow)
        ));
    }
    for cause in error_causes(err) {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}
