// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{debug, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use reposxml::app_config::{self, Config};
use reposxml::database::{DatabaseConnection, LedgerRepository};
use reposxml::history::IndexingHistory;
use reposxml::identity::ItemContext;
use reposxml::indexing::{build_fields, ReuseInputs};
use reposxml::repos::PropertyMap;
use reposxml::reuse::{link_translation, MarkerExpectation, ReuseRules, ReuseScheme};
use reposxml::xml::walk;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the index fields of one XML document as JSON lines
    Inspect(InspectArgs),

    /// Print the indexing history of a repository
    Status(StatusArgs),

    /// Generate shell completions for reposxml
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// XML document to inspect
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Repository name used in element identities
    #[arg(long, default_value = "local")]
    repo: String,

    /// Repository-relative item path, defaults to the file name
    #[arg(long)]
    path: Option<String>,

    /// Revision used in element identities
    #[arg(long, default_value_t = 0)]
    revision: u64,

    /// JSON object with the item's versioned properties
    #[arg(long, value_name = "JSON")]
    properties: Option<PathBuf>,

    /// Reuse scheme properties document, enables reuse fields
    #[arg(long, value_name = "FILE")]
    scheme: Option<PathBuf>,

    /// Previous version of the document used as reuse reference
    #[arg(long, value_name = "FILE", requires = "scheme")]
    reference: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct StatusArgs {
    /// Repository name
    #[arg(long)]
    repo: String,

    /// History ledger database, overrides the configuration
    #[arg(long, env = "REPOSXML_DB")]
    db: Option<PathBuf>,
}

/// reposxml - element-level reuse indexing for versioned XML
#[derive(Parser, Debug)]
#[command(name = "reposxml")]
#[command(version)]
#[command(about = "Element-level reuse indexing for versioned XML")]
#[command(long_about = "reposxml walks versioned XML documents, assigns element identities and
computes reuse and translation fields for a search index.

EXAMPLES:
    reposxml inspect doc.xml                          # Print element fields
    reposxml inspect doc.xml --path /p/doc.xml --revision 8 --properties props.json
    reposxml inspect doc.xml --scheme reuse-scheme.properties --reference doc.r7.xml
    reposxml status --repo demo1                      # Show the indexing history
    reposxml completions bash > reposxml.bash         # Generate bash completions")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// Custom logger writing coloured lines to stderr
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn colour_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::colour_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "reposxml", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli.config_path, cli.log_level.clone())?;
    log::set_max_level(config.log_level.to_level_filter());

    match cli.command {
        Commands::Inspect(args) => run_inspect(&config, args),
        Commands::Status(args) => run_status(&config, args).await,
        Commands::Completions { .. } => Ok(()),
    }
}

fn load_config(config_path: &str, log_level: Option<CliLogLevel>) -> Result<Config> {
    let mut config = if Path::new(config_path).exists() {
        Config::from_file(config_path)?
    } else {
        debug!("Config file not found at '{}', using defaults", config_path);
        Config::default()
    };

    if let Some(level) = log_level {
        config.log_level = level.into();
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

fn run_inspect(config: &Config, args: InspectArgs) -> Result<()> {
    let content = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {:?}", args.file))?;

    let item_path = match args.path {
        Some(path) => path,
        None => format!(
            "/{}",
            args.file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ),
    };
    let context = ItemContext::new(args.repo, item_path, args.revision);

    let properties: PropertyMap = match &args.properties {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open properties file: {:?}", path))?;
            serde_json::from_reader(std::io::BufReader::new(file))
                .with_context(|| format!("Failed to parse properties file: {:?}", path))?
        }
        None => PropertyMap::new(),
    };

    let document = walk(&content).with_context(|| format!("Cannot index {}", context))?;
    let linkage = link_translation(&properties, &config.reuse);

    let reuse = match &args.scheme {
        Some(scheme_path) => {
            let bytes = std::fs::read(scheme_path)
                .with_context(|| format!("Failed to read {:?}", scheme_path))?;
            let scheme = ReuseScheme::parse(&scheme_path.to_string_lossy(), &bytes)?;
            let rules = ReuseRules::from(&config.reuse).with_scheme(&scheme);
            let expectation = match &args.reference {
                Some(reference_path) => {
                    let bytes = std::fs::read(reference_path)
                        .with_context(|| format!("Failed to read {:?}", reference_path))?;
                    let origin = format!("Reference {:?}", reference_path);
                    MarkerExpectation::from_reference_bytes(&origin, &bytes, &rules)
                }
                None => MarkerExpectation::Stamped,
            };
            Some((rules, expectation))
        }
        None => None,
    };

    let inputs = reuse.as_ref().map(|(rules, expectation)| ReuseInputs {
        rules,
        expectation,
        status: properties.get(&rules.status_property).map(String::as_str),
    });

    let elements = build_fields(&context, &document, inputs, linkage.as_ref())?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for fields in elements {
        serde_json::to_writer(&mut out, &fields)?;
        writeln!(out)?;
    }
    Ok(())
}

async fn run_status(config: &Config, args: StatusArgs) -> Result<()> {
    let db = match args
        .db
        .or_else(|| config.indexing.database_path.as_ref().map(PathBuf::from))
    {
        Some(path) => DatabaseConnection::new(path)?,
        None => DatabaseConnection::new_default()?,
    };
    let stats = db.stats()?;
    let history = IndexingHistory::new(LedgerRepository::new(db), args.repo.as_str());

    let state = history.state().await?;
    let head = history.head_completed().await?;

    println!("Repository: {}", history.repository());
    println!("State: {}", state);
    match head {
        Some(head) => println!("Head indexed: r{}", head),
        None => println!("Head indexed: none"),
    }

    for entry in history.entries().await? {
        println!(
            "  r{:<8} {:<10} {:<16} {}",
            entry.revision,
            if entry.completed { "completed" } else { "begun" },
            entry.author.as_deref().unwrap_or("-"),
            entry.comment.as_deref().unwrap_or("")
        );
    }
    println!("{}", stats);
    Ok(())
}
