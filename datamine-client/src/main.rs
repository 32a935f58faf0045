use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

use datamine_client::config_manager::{Config, ConfigError};
use datamine_client::{AppContext, Commands, StringsCommands, commands, exit_codes};
use esm_parser::CancelFlag;

#[derive(Parser)]
#[command(
    name = "fo76dm",
    about = "Snapshot and diff Fallout 76 master data",
    version,
    long_about = "Parses the SeventySix.esm master file into content-addressed \
                  snapshots and computes field-level diffs between game versions, \
                  including across independent installs (live vs. PTS)."
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Named profile from the config file
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Master file path (overrides the profile)
    #[arg(long, global = true)]
    esm: Option<PathBuf>,

    /// Database path (overrides derivation from the master file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

fn main() -> ExitCode {
    // clap exits with 2 on bad args by default; scripting consumers are
    // promised 1 for user errors.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() {
                exit_codes::USER_ERROR
            } else {
                exit_codes::OK // --help / --version
            };
            return ExitCode::from(code as u8);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::from(exit_codes::OK as u8),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(classify(&e) as u8)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    let profile = config.resolve(cli.esm, cli.profile.as_deref())?;

    let ctx = AppContext {
        esm_path: profile.esm_path,
        db_path: cli.db.or(profile.db_path),
        language: profile.language,
        strings_ba2: profile.strings_ba2,
        cancel: CancelFlag::new(),
    };

    match cli.command {
        Commands::Snapshot {
            label,
            full_fidelity,
        } => commands::snapshot::handle(&ctx, label, full_fidelity),
        Commands::List => commands::maintain::list(&ctx),
        Commands::Diff {
            latest,
            old,
            new,
            vs,
            other_esm,
            type_filter,
            format,
            output,
        } => commands::diff::handle(
            &ctx, latest, old, new, vs, other_esm, type_filter, format, output,
        ),
        Commands::Search {
            query,
            type_filter,
            edid,
        } => commands::query::search(&ctx, &query, type_filter, edid),
        Commands::Show { form_id, expand } => commands::query::show(&ctx, &form_id, expand),
        Commands::Export {
            format,
            type_filter,
            output,
        } => commands::export::handle(&ctx, format, type_filter, &output),
        Commands::Unreleased => commands::unreleased::handle(&ctx),
        Commands::Purge { keep } => commands::maintain::purge(&ctx, keep),
        Commands::Clear { yes } => commands::maintain::clear(&ctx, yes),
        Commands::Stats => commands::maintain::stats(&ctx),
        Commands::Strings(StringsCommands::Search { substring }) => {
            commands::query::strings(&ctx, &substring)
        }
    }
}

/// Map failures onto the promised exit codes: config problems are user
/// errors, cancellation is 130, everything else is a data error.
fn classify(error: &anyhow::Error) -> i32 {
    for cause in error.chain() {
        if let Some(config_error) = cause.downcast_ref::<ConfigError>() {
            return match config_error {
                ConfigError::ProfileNotFound(_) | ConfigError::ConfigMissing(_) => {
                    exit_codes::USER_ERROR
                }
                _ => exit_codes::DATA_ERROR,
            };
        }
        if matches!(
            cause.downcast_ref::<esm_parser::Error>(),
            Some(esm_parser::Error::Cancelled)
        ) {
            return exit_codes::CANCELLED;
        }
        if matches!(
            cause.downcast_ref::<snapshot_store::Error>(),
            Some(snapshot_store::Error::Cancelled)
        ) {
            return exit_codes::CANCELLED;
        }
    }
    exit_codes::DATA_ERROR
}
