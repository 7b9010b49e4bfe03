use std::path::Path;

use chrono::Local;
use clap::ValueEnum;
use serde::Serialize;
use tarifa_core::config::{AppConfig, LoadOptions};
use tarifa_core::cpq::pricing::PriceResolver;
use tarifa_core::domain::product::Reference;
use tarifa_core::domain::quote::{coerce, QuoteEngine, QuoteSnapshot};
use tarifa_core::errors::{ApplicationError, DomainError};
use tarifa_documents::{
    quote_summary, DocumentKind, DocumentRenderer, QuoteDocument, QuoteListView,
};

use super::{block_on, load_config, open_session, output_dir, select_tariff, CommandResult};

const COMMAND: &str = "quote";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum QuoteFormat {
    /// Line list with net hints and totals.
    #[default]
    Text,
    /// Chat-ready summary.
    Summary,
    Json,
    /// Printable document written to the output directory.
    Pdf,
}

/// One `--add` argument: `REF` or `REF:QTY`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineArg {
    pub reference: String,
    pub quantity: u32,
}

impl LineArg {
    pub fn parse(raw: &str) -> Self {
        match raw.rsplit_once(':') {
            Some((reference, quantity)) if !reference.trim().is_empty() => Self {
                reference: reference.trim().to_string(),
                quantity: coerce::quantity(quantity),
            },
            _ => Self { reference: raw.trim().to_string(), quantity: 1 },
        }
    }
}

#[derive(Debug, Serialize)]
struct QuotePayload {
    tariff: String,
    snapshot: QuoteSnapshot,
    skipped: Vec<String>,
}

pub fn run(
    lines: &[String],
    tariff: Option<&str>,
    format: QuoteFormat,
    output: Option<&Path>,
    options: LoadOptions,
) -> CommandResult {
    match execute(lines, tariff, format, output, options) {
        Ok(result) => result,
        Err(error) => CommandResult::from_error(COMMAND, &error),
    }
}

fn execute(
    lines: &[String],
    tariff: Option<&str>,
    format: QuoteFormat,
    output: Option<&Path>,
    options: LoadOptions,
) -> Result<CommandResult, ApplicationError> {
    let config = load_config(options)?;
    let tariff = select_tariff(tariff, &config)?;
    let session = open_session(tariff, &config)?;
    let resolver = session.resolver();

    let mut engine = QuoteEngine::new(config.quote.shipping_policy());
    let mut skipped = Vec::new();

    for arg in lines.iter().map(|raw| LineArg::parse(raw)) {
        let reference = Reference::new(arg.reference.as_str());
        match session.catalog().find(&reference) {
            Some(product) => {
                let price = resolver.resolve(product);
                engine.add_priced(product, &price, i64::from(arg.quantity));
            }
            None => {
                tracing::warn!(
                    event_name = "quote.line.skipped",
                    reference = %reference,
                    tariff = %tariff,
                    "reference not found in tariff"
                );
                skipped.push(arg.reference);
            }
        }
    }

    if engine.is_empty() {
        return Err(DomainError::UnknownReferences {
            tariff: tariff.display_name().to_string(),
            references: skipped,
        }
        .into());
    }

    let snapshot = engine.snapshot();
    tracing::info!(
        event_name = "quote.built",
        tariff = %tariff,
        lines = snapshot.lines.len(),
        total = %snapshot.totals.total,
        "quote built"
    );

    let skipped_note = (!skipped.is_empty())
        .then(|| format!("\nReferencias no encontradas: {}", skipped.join(", ")))
        .unwrap_or_default();

    match format {
        QuoteFormat::Text => {
            let view = QuoteListView::from_snapshot(&snapshot);
            Ok(CommandResult::text(format!("{}{skipped_note}", view.to_text())))
        }
        QuoteFormat::Summary => {
            let today = Local::now().date_naive();
            let summary = quote_summary(&snapshot, &config.documents.company_name, today)
                .unwrap_or_default();
            Ok(CommandResult::text(format!("{summary}{skipped_note}")))
        }
        QuoteFormat::Json => {
            let message = format!("quote with {} line(s)", snapshot.lines.len());
            let payload =
                QuotePayload { tariff: tariff.display_name().to_string(), snapshot, skipped };
            Ok(CommandResult::success_with_data(COMMAND, message, Some(payload)))
        }
        QuoteFormat::Pdf => write_document(&snapshot, &config, output),
    }
}

fn write_document(
    snapshot: &QuoteSnapshot,
    config: &AppConfig,
    output: Option<&Path>,
) -> Result<CommandResult, ApplicationError> {
    let today = Local::now().date_naive();
    let document = QuoteDocument::from_snapshot(snapshot, &config.documents.company_name, today)
        .ok_or_else(|| ApplicationError::Input("the quote is empty".to_string()))?;
    let renderer = DocumentRenderer::new(config.documents.wkhtmltopdf_path.as_deref())?;
    let dir = output_dir(output, config);

    let path = block_on(async {
        let rendered = renderer.render(DocumentKind::Quote, &document).await?;
        rendered.write_to(&dir, document.file_stem()).await
    })??;

    Ok(CommandResult::success(COMMAND, format!("quote written to {}", path.display())))
}
