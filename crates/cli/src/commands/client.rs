use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tarifa_core::config::LoadOptions;
use tarifa_core::errors::ApplicationError;
use tarifa_documents::client::ClientRegistration;
use tarifa_documents::{DocumentKind, DocumentRenderer, SepaMandate};

use super::{block_on, load_config, output_dir, CommandResult};

const COMMAND: &str = "client";

pub fn run(form: &Path, output: Option<&Path>, options: LoadOptions) -> CommandResult {
    match execute(form, output, options) {
        Ok(result) => result,
        Err(error) => CommandResult::from_error(COMMAND, &error),
    }
}

pub fn read_form(path: &Path) -> Result<ClientRegistration, ApplicationError> {
    let raw = fs::read_to_string(path).map_err(|error| {
        ApplicationError::Input(format!("could not read form `{}`: {error}", path.display()))
    })?;
    serde_json::from_str(&raw).map_err(|error| {
        ApplicationError::Input(format!("could not parse form `{}`: {error}", path.display()))
    })
}

fn execute(
    form_path: &Path,
    output: Option<&Path>,
    options: LoadOptions,
) -> Result<CommandResult, ApplicationError> {
    let config = load_config(options)?;
    let form = read_form(form_path)?;
    form.validate()?;

    let renderer = DocumentRenderer::new(config.documents.wkhtmltopdf_path.as_deref())?;
    let dir = output_dir(output, &config);
    let registration = form.registration_document(Local::now().date_naive());
    let mandate = form.needs_sepa_mandate().then(|| SepaMandate::new(&form, &config.creditor));

    let written: Vec<PathBuf> = block_on(async {
        let mut written = Vec::new();

        let rendered = renderer.render(DocumentKind::ClientRegistration, &registration).await?;
        written.push(rendered.write_to(&dir, &form.registration_file_stem()).await?);

        if let Some(mandate) = &mandate {
            let rendered = renderer.render(DocumentKind::SepaMandate, mandate).await?;
            written.push(rendered.write_to(&dir, &form.mandate_file_stem()).await?);
        }

        Ok::<_, tarifa_documents::DocumentError>(written)
    })??;

    tracing::info!(
        event_name = "documents.client.written",
        documents = written.len(),
        sepa_mandate = mandate.is_some(),
        "client documents written"
    );

    let files = written.iter().map(|path| path.display().to_string()).collect::<Vec<_>>();
    let message = if mandate.is_some() {
        format!(
            "registration and SEPA mandate written ({}); sign the mandate and send both to {}",
            files.join(", "),
            config.creditor.contact_email
        )
    } else {
        format!(
            "registration written ({}); send it to {}",
            files.join(", "),
            config.creditor.contact_email
        )
    };

    Ok(CommandResult::success(COMMAND, message))
}
