use std::path::Path;

use chrono::Local;
use tarifa_core::config::LoadOptions;
use tarifa_core::cpq::catalog::load_tariff_file;
use tarifa_core::errors::ApplicationError;
use tarifa_documents::{DocumentKind, DocumentRenderer, TariffSheetDocument};

use super::{block_on, load_config, output_dir, select_tariff, CommandResult};

const COMMAND: &str = "sheet";

pub fn run(tariff: Option<&str>, output: Option<&Path>, options: LoadOptions) -> CommandResult {
    match execute(tariff, output, options) {
        Ok(result) => result,
        Err(error) => CommandResult::from_error(COMMAND, &error),
    }
}

fn execute(
    tariff: Option<&str>,
    output: Option<&Path>,
    options: LoadOptions,
) -> Result<CommandResult, ApplicationError> {
    let config = load_config(options)?;
    let tariff = select_tariff(tariff, &config)?;
    let products = load_tariff_file(&config.catalog.data_dir.join(tariff.file_name()))?;

    let today = Local::now().date_naive();
    let sheet = TariffSheetDocument::new(&products, tariff, &config.documents.company_name, today);
    let renderer = DocumentRenderer::new(config.documents.wkhtmltopdf_path.as_deref())?;
    let dir = output_dir(output, &config);

    let path = block_on(async {
        let rendered = renderer.render(DocumentKind::TariffSheet, &sheet).await?;
        rendered.write_to(&dir, &sheet.file_stem()).await
    })??;

    tracing::info!(
        event_name = "documents.sheet.written",
        tariff = %tariff,
        rows = sheet.rows.len(),
        path = %path.display(),
        "tariff sheet written"
    );

    Ok(CommandResult::success(
        COMMAND,
        format!("{} ({} products) written to {}", sheet.title, sheet.rows.len(), path.display()),
    ))
}
