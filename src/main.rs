//! tplsync CLI - propagate template subtasks across Todoist projects.

use clap::Parser;
use std::process;
use tplsync::cli::{Cli, Commands, ConfigCommands};
use tplsync::commands::{self, Output};
use tplsync::config::{ConfigOverrides, ConfigStore, OutputFormat, ResolvedSettings};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "TPLSYNC_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut human = cli.human_readable;
    if let Err(e) = run_command(cli, &mut human) {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Log to stderr so stdout stays clean for command output.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    // Only fails if a subscriber is already installed
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run_command(cli: Cli, human: &mut bool) -> Result<(), tplsync::Error> {
    let store = match cli.config_dir {
        Some(dir) => ConfigStore::at(dir),
        None => ConfigStore::from_env()?,
    };

    let mut overrides = ConfigOverrides::new();
    if let Some(url) = cli.api_url {
        overrides = overrides.with_api_url(url);
    }
    if let Some(name) = cli.template_name {
        overrides = overrides.with_template_name(name);
    }
    if *human {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }

    let token = match &cli.command {
        Commands::Apply { token, .. } | Commands::Tree { token } => token.as_deref(),
        Commands::Config { .. } => None,
    };
    let settings = ResolvedSettings::resolve(&store, &overrides, token)?;
    *human = *settings.config.output_format() == OutputFormat::Human;
    for warning in &settings.state.deprecation_warnings {
        tracing::warn!("{}", warning);
    }

    match cli.command {
        Commands::Apply { dry_run, .. } => {
            let result = commands::apply(&settings, dry_run)?;
            output(&result, *human);
            // Report first, then fail so scripts notice malformed data
            if result.report.has_bad_records() {
                return Err(tplsync::Error::MalformedRecords(
                    result.report.bad_records.len(),
                ));
            }
        }
        Commands::Tree { .. } => {
            let result = commands::tree(&settings)?;
            output(&result, *human);
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let result = commands::config_show(&store, &settings);
                output(&result, *human);
            }
            ConfigCommands::Set { key, value } => {
                let result = commands::config_set(&store, &key, &value)?;
                output(&result, *human);
            }
            ConfigCommands::SetToken { token } => {
                let result = commands::config_set_token(&store, token)?;
                output(&result, *human);
            }
        },
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
