pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tarifa_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};

use crate::commands::quote::QuoteFormat;

#[derive(Debug, Parser)]
#[command(
    name = "tarifa",
    about = "Tariff price lookup, quote builder and client documents",
    long_about = "Search a tariff's product list, build quotes with net (volume) prices and shipping, and produce tariff sheets, quotes and client onboarding documents.",
    after_help = "Examples:\n  tarifa search tornillo --tariff neopro\n  tarifa quote --add 10045:150 --add 20010 --format summary\n  tarifa sheet --tariff grandes_cuentas\n  tarifa client --form alta.json\n  tarifa doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "FILE", help = "Config file (default: tarifa.toml)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "DIR", help = "Directory with the tariff JSON files")]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true, value_name = "LEVEL", help = "Log level written to stderr")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Search products by description or reference with prices for a tariff")]
    Search {
        query: String,
        #[arg(long, help = "Tariff name or file name (default: catalog.default_tariff)")]
        tariff: Option<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Build a quote from product references")]
    Quote {
        #[arg(long = "add", value_name = "REF[:QTY]", required = true)]
        add: Vec<String>,
        #[arg(long)]
        tariff: Option<String>,
        #[arg(long, value_enum, default_value_t = QuoteFormat::Text)]
        format: QuoteFormat,
        #[arg(long, value_name = "DIR", help = "Where the pdf format writes its document")]
        output: Option<PathBuf>,
    },
    #[command(about = "Write the full price list of a tariff")]
    Sheet {
        #[arg(long)]
        tariff: Option<String>,
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
    #[command(about = "Write the client registration sheet and, with an IBAN, the SEPA mandate")]
    Client {
        #[arg(long, value_name = "FILE", help = "JSON file with the registration form fields")]
        form: PathBuf,
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, tariff and stock data, templates and the PDF converter")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                data_dir: self.data_dir.clone(),
                log_level: self.log_level.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();
    init_logging(&options);

    let result = match cli.command {
        Command::Search { query, tariff, json } => {
            commands::search::run(&query, tariff.as_deref(), json, options)
        }
        Command::Quote { add, tariff, format, output } => {
            commands::quote::run(&add, tariff.as_deref(), format, output.as_deref(), options)
        }
        Command::Sheet { tariff, output } => {
            commands::sheet::run(tariff.as_deref(), output.as_deref(), options)
        }
        Command::Client { form, output } => {
            commands::client::run(&form, output.as_deref(), options)
        }
        Command::Config => commands::config::run(options),
        Command::Doctor { json } => commands::doctor::run(json, options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command output on stdout stays parseable. An invalid configuration
/// falls back to the defaults here; the command itself reports the error.
fn init_logging(options: &LoadOptions) {
    use tracing::Level;

    let (level, format) = match AppConfig::load(options.clone()) {
        Ok(config) => (config.logging.level, config.logging.format),
        Err(_) => ("warn".to_string(), LogFormat::Compact),
    };
    let log_level = level.parse::<Level>().unwrap_or(Level::WARN);

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
