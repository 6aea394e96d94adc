//! Stockroom CLI - Command-line front end for the book inventory

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stockroom::config::{self, InventoryConfig};
use stockroom::Inventory;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(version)]
#[command(about = "Track a small book inventory stored in a local SQLite table")]
#[command(long_about = r#"
Stockroom keeps books (name, price, quantity, supplier) in a single SQLite
table addressed by resource URIs:
  content://<authority>/books       the whole collection
  content://<authority>/books/<id>  one book

Example usage:
  stockroom init
  stockroom add --name "Dune" --price 15 --quantity 3
  stockroom list --sort "product_name ASC" --where "quantity > ?" --arg 0
  stockroom edit 1 --quantity 2
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON envelopes instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Hide change notifications in human output
    #[arg(short, long, global = true, conflicts_with = "json")]
    quiet: bool,

    /// Path to the config file (defaults to stockroom.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// List books
    List {
        /// Sort order, e.g. "price DESC, product_name"
        #[arg(short, long)]
        sort: Option<String>,

        /// Filter expression with ? placeholders, e.g. "quantity > ?"
        #[arg(short = 'w', long = "where")]
        filter: Option<String>,

        /// Filter argument, repeat once per placeholder
        #[arg(long = "arg", requires = "filter")]
        args: Vec<String>,

        /// Comma-separated columns to show
        #[arg(short, long)]
        columns: Option<String>,
    },

    /// Show one book
    Show {
        /// Book id
        id: i64,
    },

    /// Add a book
    Add {
        #[arg(long)]
        name: String,

        /// Price in the smallest currency unit
        #[arg(long, allow_hyphen_values = true)]
        price: i64,

        #[arg(long, allow_hyphen_values = true)]
        quantity: i64,

        #[arg(long)]
        supplier_name: Option<String>,

        #[arg(long)]
        supplier_phone: Option<String>,
    },

    /// Change fields of one book
    Edit {
        /// Book id
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        price: Option<i64>,

        #[arg(long, allow_hyphen_values = true)]
        quantity: Option<i64>,

        #[arg(long)]
        supplier_name: Option<String>,

        #[arg(long)]
        supplier_phone: Option<String>,
    },

    /// Delete one book
    Delete {
        /// Book id
        id: i64,
    },

    /// Delete every book
    DeleteAll,

    /// Insert a sample book
    Seed,

    /// Show store statistics
    Stats,

    /// Print the kind and content type of a resource URI
    Type {
        /// Resource URI, e.g. content://<authority>/books/1
        uri: String,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Init { .. } => "init",
            Commands::List { .. } => "list",
            Commands::Show { .. } => "show",
            Commands::Add { .. } => "add",
            Commands::Edit { .. } => "edit",
            Commands::Delete { .. } => "delete",
            Commands::DeleteAll => "delete-all",
            Commands::Seed => "seed",
            Commands::Stats => "stats",
            Commands::Type { .. } => "type",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    /// Human output without change notifications
    Quiet,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self != OutputMode::Json
    }

    pub fn shows_notices(self) -> bool {
        self == OutputMode::Human
    }
}

/// Print a success envelope: `{"ok":true,"command":...,"data":...}`.
/// Human mode prints nothing here.
pub fn emit_success(output_mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if output_mode.is_human() {
        return Ok(());
    }
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// Print a failure envelope. Library errors carry their kind and field.
pub fn emit_error(command: &str, err: &anyhow::Error) {
    let (kind, field) = match err.downcast_ref::<stockroom::Error>() {
        Some(e) => (error_kind(e), e.field().map(str::to_string)),
        None => ("error", None),
    };
    let envelope = serde_json::json!({
        "ok": false,
        "command": command,
        "error": {
            "kind": kind,
            "field": field,
            "message": err.to_string(),
        },
    });
    println!("{}", envelope);
}

fn error_kind(err: &stockroom::Error) -> &'static str {
    use stockroom::Error;
    match err {
        Error::Validation { .. } => "validation",
        Error::UnrecognizedResource(_) => "unrecognized_resource",
        Error::UnsupportedOperation { .. } => "unsupported_operation",
        Error::NotFound(_) => "not_found",
        Error::StorageUnavailable { .. } => "storage_unavailable",
        Error::Storage(_) => "storage",
        Error::Io(_) => "io",
    }
}

/// File config overlaid with command-line flags
fn resolve_config(cli: &Cli) -> anyhow::Result<InventoryConfig> {
    let file = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let flags = InventoryConfig {
        database: cli.database.as_ref().map(|p| p.display().to_string()),
        ..InventoryConfig::default()
    };
    Ok(file.merge(flags))
}

fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    let settings = resolve_config(&cli)?;
    let open = || -> anyhow::Result<Inventory> { Ok(Inventory::open(&settings)?) };

    match cli.command {
        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            commands::run_init(&path, settings.clone(), force, output_mode)
        }
        Commands::List { sort, filter, args, columns } => {
            commands::run_list(&open()?, sort, filter, args, columns, output_mode)
        }
        Commands::Show { id } => commands::run_show(&open()?, id, output_mode),
        Commands::Add { name, price, quantity, supplier_name, supplier_phone } => {
            let fields = commands::BookFields {
                name: Some(name),
                price: Some(price),
                quantity: Some(quantity),
                supplier_name,
                supplier_phone,
            };
            commands::run_add(&open()?, fields, output_mode)
        }
        Commands::Edit { id, name, price, quantity, supplier_name, supplier_phone } => {
            let fields = commands::BookFields {
                name,
                price,
                quantity,
                supplier_name,
                supplier_phone,
            };
            commands::run_edit(&open()?, id, fields, output_mode)
        }
        Commands::Delete { id } => commands::run_delete(&open()?, Some(id), output_mode),
        Commands::DeleteAll => commands::run_delete(&open()?, None, output_mode),
        Commands::Seed => commands::run_seed(&open()?, output_mode),
        Commands::Stats => commands::run_stats(&open()?, output_mode),
        Commands::Type { uri } => commands::run_type(settings.authority(), &uri, output_mode),
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Human
    };
    let command = cli.command.name();

    if let Err(e) = run(cli, output_mode) {
        if output_mode.is_human() {
            stockroom::ui::error(&e.to_string());
        } else {
            emit_error(command, &e);
        }
        std::process::exit(1);
    }
}
