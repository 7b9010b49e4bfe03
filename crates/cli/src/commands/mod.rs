pub mod client;
pub mod config;
pub mod doctor;
pub mod quote;
pub mod search;
pub mod sheet;

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tarifa_core::config::{AppConfig, LoadOptions};
use tarifa_core::cpq::catalog::CatalogSession;
use tarifa_core::cpq::tariff::Tariff;
use tarifa_core::errors::ApplicationError;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None::<()>)
    }

    pub fn success_with_data<T: Serialize>(
        command: &str,
        message: impl Into<String>,
        data: Option<T>,
    ) -> Self {
        let data = match data.map(serde_json::to_value).transpose() {
            Ok(data) => data,
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), 1);
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    /// Human-readable output for a successful command.
    pub fn text(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_error(command: &str, error: &ApplicationError) -> Self {
        tracing::warn!(
            event_name = "cli.command.failed",
            command,
            error_class = error.error_class(),
            error = %error,
            "command failed"
        );
        Self::failure(command, error.error_class(), error.to_string(), error.exit_code())
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(options: LoadOptions) -> Result<AppConfig, ApplicationError> {
    Ok(AppConfig::load(options)?)
}

/// The tariff named on the command line, or the configured default.
pub(crate) fn select_tariff(
    requested: Option<&str>,
    config: &AppConfig,
) -> Result<Tariff, ApplicationError> {
    match requested {
        Some(name) => Ok(name.parse::<Tariff>()?),
        None => Ok(config.catalog.default_tariff),
    }
}

pub(crate) fn open_session(
    tariff: Tariff,
    config: &AppConfig,
) -> Result<CatalogSession, ApplicationError> {
    let mut session = CatalogSession::new(tariff);
    session.load_from_dir(tariff, &config.catalog.data_dir, config.catalog.stock_file.as_deref())?;

    tracing::info!(
        event_name = "catalog.load.completed",
        tariff = %tariff,
        products = session.catalog().products().len(),
        "catalog loaded"
    );

    Ok(session)
}

pub(crate) fn output_dir(requested: Option<&Path>, config: &AppConfig) -> PathBuf {
    requested.map(Path::to_path_buf).unwrap_or_else(|| config.documents.output_dir.clone())
}

/// Runs document work on a single-threaded runtime; the CLI is otherwise synchronous.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, ApplicationError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| {
            ApplicationError::Document(format!("failed to initialize async runtime: {error}"))
        })?;
    Ok(runtime.block_on(future))
}
