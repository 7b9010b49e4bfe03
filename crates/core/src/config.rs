use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpq::tariff::Tariff;
use crate::domain::quote::ShippingPolicy;
use crate::errors::ApplicationError;

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["tarifa.toml", "config/tarifa.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub quote: QuoteConfig,
    pub documents: DocumentsConfig,
    pub creditor: CreditorConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub data_dir: PathBuf,
    pub default_tariff: Tariff,
    pub stock_file: Option<String>,
}

#[derive(Clone, Debug)]
pub struct QuoteConfig {
    pub shipping_cost: Decimal,
    pub free_shipping_threshold: Decimal,
}

#[derive(Clone, Debug)]
pub struct DocumentsConfig {
    pub output_dir: PathBuf,
    pub wkhtmltopdf_path: Option<PathBuf>,
    pub company_name: String,
}

/// Creditor block printed on SEPA direct-debit mandates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditorConfig {
    pub mandate_reference: String,
    pub identifier: String,
    pub name: String,
    pub address: String,
    pub postal_city: String,
    pub country: String,
    pub contact_email: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl From<ConfigError> for ApplicationError {
    fn from(error: ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let shipping = ShippingPolicy::default();
        Self {
            catalog: CatalogConfig {
                data_dir: PathBuf::from("src"),
                default_tariff: Tariff::General,
                stock_file: Some("Stock.json".to_string()),
            },
            quote: QuoteConfig {
                shipping_cost: shipping.flat_cost,
                free_shipping_threshold: shipping.free_shipping_threshold,
            },
            documents: DocumentsConfig {
                output_dir: PathBuf::from("."),
                wkhtmltopdf_path: None,
                company_name: "CV Tools".to_string(),
            },
            creditor: CreditorConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for CreditorConfig {
    fn default() -> Self {
        Self {
            mandate_reference: "CVTOOLS. S.L.".to_string(),
            identifier: "B96573613".to_string(),
            name: "CV TOOLS, S.L.".to_string(),
            address: "Avda Camino de Albaida S/N".to_string(),
            postal_city: "46830 Benigànim (Valencia)".to_string(),
            country: "España".to_string(),
            contact_email: "comercial@cvtools.es".to_string(),
        }
    }
}

impl QuoteConfig {
    pub fn shipping_policy(&self) -> ShippingPolicy {
        ShippingPolicy {
            flat_cost: self.shipping_cost,
            free_shipping_threshold: self.free_shipping_threshold,
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(catalog) = patch.catalog {
            if let Some(data_dir) = catalog.data_dir {
                self.catalog.data_dir = data_dir;
            }
            if let Some(default_tariff) = catalog.default_tariff {
                self.catalog.default_tariff =
                    parse_tariff("catalog.default_tariff", &default_tariff)?;
            }
            if let Some(stock_file) = catalog.stock_file {
                self.catalog.stock_file = Some(stock_file).filter(|name| !name.trim().is_empty());
            }
        }

        if let Some(quote) = patch.quote {
            if let Some(shipping_cost) = quote.shipping_cost {
                self.quote.shipping_cost = shipping_cost;
            }
            if let Some(free_shipping_threshold) = quote.free_shipping_threshold {
                self.quote.free_shipping_threshold = free_shipping_threshold;
            }
        }

        if let Some(documents) = patch.documents {
            if let Some(output_dir) = documents.output_dir {
                self.documents.output_dir = output_dir;
            }
            if let Some(wkhtmltopdf_path) = documents.wkhtmltopdf_path {
                self.documents.wkhtmltopdf_path = Some(wkhtmltopdf_path);
            }
            if let Some(company_name) = documents.company_name {
                self.documents.company_name = company_name;
            }
        }

        if let Some(creditor) = patch.creditor {
            let target = &mut self.creditor;
            for (value, slot) in [
                (creditor.mandate_reference, &mut target.mandate_reference),
                (creditor.identifier, &mut target.identifier),
                (creditor.name, &mut target.name),
                (creditor.address, &mut target.address),
                (creditor.postal_city, &mut target.postal_city),
                (creditor.country, &mut target.country),
                (creditor.contact_email, &mut target.contact_email),
            ] {
                if let Some(value) = value {
                    *slot = value;
                }
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TARIFA_CATALOG_DATA_DIR") {
            self.catalog.data_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("TARIFA_CATALOG_DEFAULT_TARIFF") {
            self.catalog.default_tariff = parse_tariff("TARIFA_CATALOG_DEFAULT_TARIFF", &value)?;
        }
        if let Some(value) = read_env("TARIFA_CATALOG_STOCK_FILE") {
            self.catalog.stock_file = Some(value);
        }

        if let Some(value) = read_env("TARIFA_QUOTE_SHIPPING_COST") {
            self.quote.shipping_cost = parse_decimal("TARIFA_QUOTE_SHIPPING_COST", &value)?;
        }
        if let Some(value) = read_env("TARIFA_QUOTE_FREE_SHIPPING_THRESHOLD") {
            self.quote.free_shipping_threshold =
                parse_decimal("TARIFA_QUOTE_FREE_SHIPPING_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("TARIFA_DOCUMENTS_OUTPUT_DIR") {
            self.documents.output_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("TARIFA_DOCUMENTS_WKHTMLTOPDF_PATH") {
            self.documents.wkhtmltopdf_path = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("TARIFA_DOCUMENTS_COMPANY_NAME") {
            self.documents.company_name = value;
        }

        let log_level = read_env("TARIFA_LOGGING_LEVEL").or_else(|| read_env("TARIFA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TARIFA_LOGGING_FORMAT").or_else(|| read_env("TARIFA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(data_dir) = overrides.data_dir {
            self.catalog.data_dir = data_dir;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_catalog(&self.catalog)?;
        validate_quote(&self.quote)?;
        validate_documents(&self.documents)?;
        validate_creditor(&self.creditor)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    if catalog.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("catalog.data_dir must not be empty".to_string()));
    }

    if let Some(stock_file) = &catalog.stock_file {
        if stock_file.contains('/') || stock_file.contains('\\') {
            return Err(ConfigError::Validation(
                "catalog.stock_file must be a file name inside catalog.data_dir".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_quote(quote: &QuoteConfig) -> Result<(), ConfigError> {
    if quote.shipping_cost < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "quote.shipping_cost must not be negative".to_string(),
        ));
    }

    if quote.free_shipping_threshold <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "quote.free_shipping_threshold must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_documents(documents: &DocumentsConfig) -> Result<(), ConfigError> {
    if documents.company_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "documents.company_name must not be empty".to_string(),
        ));
    }

    if documents.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "documents.output_dir must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_creditor(creditor: &CreditorConfig) -> Result<(), ConfigError> {
    if creditor.identifier.trim().is_empty() || creditor.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "creditor.identifier and creditor.name are required for SEPA mandates".to_string(),
        ));
    }

    if !creditor.contact_email.contains('@') {
        return Err(ConfigError::Validation(
            "creditor.contact_email must be an e-mail address".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_tariff(key: &str, value: &str) -> Result<Tariff, ConfigError> {
    Tariff::identify(value).ok_or_else(|| {
        ConfigError::Validation(format!(
            "{key}: unknown tariff `{value}` (expected one of general|bigmat|neopro|ehlis|synergas|cecofersa|grandes_cuentas|coferdroza|industrial_pro)"
        ))
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    catalog: Option<CatalogPatch>,
    quote: Option<QuotePatch>,
    documents: Option<DocumentsPatch>,
    creditor: Option<CreditorPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    data_dir: Option<PathBuf>,
    default_tariff: Option<String>,
    stock_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QuotePatch {
    shipping_cost: Option<Decimal>,
    free_shipping_threshold: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentsPatch {
    output_dir: Option<PathBuf>,
    wkhtmltopdf_path: Option<PathBuf>,
    company_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CreditorPatch {
    mandate_reference: Option<String>,
    identifier: Option<String>,
    name: Option<String>,
    address: Option<String>,
    postal_city: Option<String>,
    country: Option<String>,
    contact_email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use crate::cpq::tariff::Tariff;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_shipping_rules() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;
        let policy = config.quote.shipping_policy();

        ensure(policy.flat_cost == Decimal::new(1200, 2), "default shipping cost is 12.00")?;
        ensure(
            policy.free_shipping_threshold == Decimal::new(40000, 2),
            "default free shipping threshold is 400.00",
        )?;
        ensure(config.catalog.default_tariff == Tariff::General, "default tariff is general")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_TARIFA_DATA_DIR", "/srv/tarifas");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tarifa.toml");
            fs::write(
                &path,
                r#"
[catalog]
data_dir = "${TEST_TARIFA_DATA_DIR}"
default_tariff = "Tarifa_Cecofersa.json"

[quote]
shipping_cost = "9.50"
free_shipping_threshold = 300
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.catalog.data_dir == PathBuf::from("/srv/tarifas"),
                "data dir should be interpolated from environment",
            )?;
            ensure(config.catalog.default_tariff == Tariff::Cecofersa, "tariff read from file")?;
            ensure(config.quote.shipping_cost == Decimal::new(950, 2), "shipping cost from file")?;
            ensure(
                config.quote.free_shipping_threshold == Decimal::new(300, 0),
                "numeric threshold from file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_TARIFA_DATA_DIR"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TARIFA_LOG_LEVEL", "warn");
        env::set_var("TARIFA_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["TARIFA_LOG_LEVEL", "TARIFA_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TARIFA_CATALOG_DEFAULT_TARIFF", "neopro");
        env::set_var("TARIFA_DOCUMENTS_COMPANY_NAME", "Ferretería Env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tarifa.toml");
            fs::write(
                &path,
                r#"
[catalog]
data_dir = "from-file"
default_tariff = "bigmat"

[documents]
company_name = "Ferretería File"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    data_dir: Some(PathBuf::from("from-override")),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.catalog.data_dir == PathBuf::from("from-override"),
                "override data dir should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.catalog.default_tariff == Tariff::Neopro,
                "env tariff should win over file",
            )?;
            ensure(
                config.documents.company_name == "Ferretería Env",
                "env company name should win over file",
            )?;
            Ok(())
        })();

        clear_vars(&["TARIFA_CATALOG_DEFAULT_TARIFF", "TARIFA_DOCUMENTS_COMPANY_NAME"]);
        result
    }

    #[test]
    fn unknown_tariff_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TARIFA_CATALOG_DEFAULT_TARIFF", "Tarifa_Otra.json");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message)
                    if message.contains("TARIFA_CATALOG_DEFAULT_TARIFF")
            );
            ensure(has_message, "validation failure should name the offending variable")
        })();

        clear_vars(&["TARIFA_CATALOG_DEFAULT_TARIFF"]);
        result
    }

    #[test]
    fn invalid_shipping_values_are_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TARIFA_QUOTE_FREE_SHIPPING_THRESHOLD", "0");
        let zero_threshold = AppConfig::load(LoadOptions::default());
        env::set_var("TARIFA_QUOTE_FREE_SHIPPING_THRESHOLD", "cuatrocientos");
        let unparseable = AppConfig::load(LoadOptions::default());
        clear_vars(&["TARIFA_QUOTE_FREE_SHIPPING_THRESHOLD"]);

        ensure(
            matches!(
                zero_threshold,
                Err(ConfigError::Validation(ref message))
                    if message.contains("free_shipping_threshold")
            ),
            "zero threshold should fail validation",
        )?;
        ensure(
            matches!(unparseable, Err(ConfigError::InvalidEnvOverride { .. })),
            "unparseable threshold should be an invalid override",
        )
    }

    #[test]
    fn missing_required_file_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let result = AppConfig::load(LoadOptions {
            config_path: Some(dir.path().join("missing.toml")),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "missing required config file should fail",
        )
    }
}
