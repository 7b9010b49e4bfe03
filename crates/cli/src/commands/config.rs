use std::env;
use std::fs;
use std::path::Path;

use tarifa_core::config::{resolve_config_path, AppConfig, LoadOptions};
use tarifa_core::errors::ApplicationError;
use toml::Value;

use super::CommandResult;

const COMMAND: &str = "config";

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::from_error(COMMAND, &ApplicationError::from(error));
        }
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let stock_file = config.catalog.stock_file.as_deref().unwrap_or("<unset>");
    let wkhtmltopdf = config
        .documents
        .wkhtmltopdf_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<search PATH>".to_string());

    let entries = [
        (
            "catalog.data_dir",
            config.catalog.data_dir.display().to_string(),
            &["TARIFA_CATALOG_DATA_DIR"][..],
        ),
        (
            "catalog.default_tariff",
            config.catalog.default_tariff.display_name().to_string(),
            &["TARIFA_CATALOG_DEFAULT_TARIFF"][..],
        ),
        ("catalog.stock_file", stock_file.to_string(), &["TARIFA_CATALOG_STOCK_FILE"][..]),
        (
            "quote.shipping_cost",
            config.quote.shipping_cost.to_string(),
            &["TARIFA_QUOTE_SHIPPING_COST"][..],
        ),
        (
            "quote.free_shipping_threshold",
            config.quote.free_shipping_threshold.to_string(),
            &["TARIFA_QUOTE_FREE_SHIPPING_THRESHOLD"][..],
        ),
        (
            "documents.output_dir",
            config.documents.output_dir.display().to_string(),
            &["TARIFA_DOCUMENTS_OUTPUT_DIR"][..],
        ),
        ("documents.wkhtmltopdf_path", wkhtmltopdf, &["TARIFA_DOCUMENTS_WKHTMLTOPDF_PATH"][..]),
        (
            "documents.company_name",
            config.documents.company_name.clone(),
            &["TARIFA_DOCUMENTS_COMPANY_NAME"][..],
        ),
        ("creditor.identifier", config.creditor.identifier.clone(), &[][..]),
        ("creditor.name", config.creditor.name.clone(), &[][..]),
        ("creditor.contact_email", config.creditor.contact_email.clone(), &[][..]),
        (
            "logging.level",
            config.logging.level.clone(),
            &["TARIFA_LOGGING_LEVEL", "TARIFA_LOG_LEVEL"][..],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["TARIFA_LOGGING_FORMAT", "TARIFA_LOG_FORMAT"][..],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in entries {
        lines.push(render_line(key, &value, source(key, env_keys)));
    }

    CommandResult::text(lines.join("\n"))
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
