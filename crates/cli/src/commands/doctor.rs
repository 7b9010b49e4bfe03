use serde::Serialize;
use tarifa_core::config::{AppConfig, LoadOptions};
use tarifa_core::cpq::catalog::{load_stock_file, load_tariff_file};
use tarifa_documents::pdf::locate_converter;
use tarifa_documents::DocumentRenderer;

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exit code 2 when the configuration is invalid, 3 when data or templates are unusable.
pub fn run(json_output: bool, options: LoadOptions) -> CommandResult {
    let report = build_report(options);
    let exit_code = exit_code(&report);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_tariff_data(&config));
            checks.push(check_stock_data(&config));
            checks.push(check_templates());
            checks.push(check_pdf_converter(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["tariff_data", "stock_data", "document_templates", "pdf_converter"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_tariff_data(config: &AppConfig) -> DoctorCheck {
    let tariff = config.catalog.default_tariff;
    let path = config.catalog.data_dir.join(tariff.file_name());

    match load_tariff_file(&path) {
        Ok(products) if products.is_empty() => DoctorCheck {
            name: "tariff_data",
            status: CheckStatus::Fail,
            details: format!("`{}` holds no products", path.display()),
        },
        Ok(products) => DoctorCheck {
            name: "tariff_data",
            status: CheckStatus::Pass,
            details: format!("{} products in `{}`", products.len(), path.display()),
        },
        Err(error) => DoctorCheck {
            name: "tariff_data",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_stock_data(config: &AppConfig) -> DoctorCheck {
    let Some(stock_file) = &config.catalog.stock_file else {
        return DoctorCheck {
            name: "stock_data",
            status: CheckStatus::Skipped,
            details: "no stock file configured".to_string(),
        };
    };

    let path = config.catalog.data_dir.join(stock_file);
    if !path.exists() {
        return DoctorCheck {
            name: "stock_data",
            status: CheckStatus::Skipped,
            details: format!("`{}` not present; search runs without stock data", path.display()),
        };
    }

    match load_stock_file(&path) {
        Ok(entries) => DoctorCheck {
            name: "stock_data",
            status: CheckStatus::Pass,
            details: format!("{} stock entries in `{}`", entries.len(), path.display()),
        },
        Err(error) => DoctorCheck {
            name: "stock_data",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_templates() -> DoctorCheck {
    match DocumentRenderer::html_only() {
        Ok(_) => DoctorCheck {
            name: "document_templates",
            status: CheckStatus::Pass,
            details: "embedded templates compiled".to_string(),
        },
        Err(error) => DoctorCheck {
            name: "document_templates",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_pdf_converter(config: &AppConfig) -> DoctorCheck {
    match locate_converter(config.documents.wkhtmltopdf_path.as_deref()) {
        Some(path) => DoctorCheck {
            name: "pdf_converter",
            status: CheckStatus::Pass,
            details: format!("using `{}`", path.display()),
        },
        None => DoctorCheck {
            name: "pdf_converter",
            status: CheckStatus::Skipped,
            details: "wkhtmltopdf not found; documents are written as HTML".to_string(),
        },
    }
}

fn exit_code(report: &DoctorReport) -> u8 {
    let failed = |name: &str| {
        report.checks.iter().any(|check| check.name == name && check.status == CheckStatus::Fail)
    };

    if failed("config_validation") {
        2
    } else if report.overall_status == CheckStatus::Fail {
        3
    } else {
        0
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
