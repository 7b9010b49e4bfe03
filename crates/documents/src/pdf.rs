//! Document rendering.
//!
//! Templates are compiled into the binary and rendered with Tera. When `wkhtmltopdf` is
//! available the HTML is converted to PDF; otherwise, or when conversion fails, the HTML itself
//! is returned so it can be printed from a browser.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use tarifa_core::errors::ApplicationError;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{info, warn};

use crate::format_money;

/// Register custom Tera filters used by document templates.
///
/// - `money`: two decimals, e.g. `line.unit_price | money`
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("money", tera_money_filter);
}

/// Accepts numbers and decimal strings, which is how amounts serialize.
fn tera_money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let amount = match value {
        tera::Value::String(text) => Decimal::from_str(text.trim())
            .map_err(|_| tera::Error::msg(format!("money filter cannot read `{text}`")))?,
        tera::Value::Number(number) => {
            number.as_f64().and_then(|raw| Decimal::try_from(raw).ok()).unwrap_or(Decimal::ZERO)
        }
        _ => Decimal::ZERO,
    };
    Ok(tera::Value::String(format_money(amount)))
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DocumentError> for ApplicationError {
    fn from(value: DocumentError) -> Self {
        Self::Document(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Quote,
    TariffSheet,
    ClientRegistration,
    SepaMandate,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] =
        [Self::Quote, Self::TariffSheet, Self::ClientRegistration, Self::SepaMandate];

    pub fn template_name(self) -> &'static str {
        match self {
            Self::Quote => "quote.html.tera",
            Self::TariffSheet => "tariff_sheet.html.tera",
            Self::ClientRegistration => "client_registration.html.tera",
            Self::SepaMandate => "sepa_mandate.html.tera",
        }
    }

    fn template_source(self) -> &'static str {
        match self {
            Self::Quote => include_str!("../../../templates/documents/quote.html.tera"),
            Self::TariffSheet => {
                include_str!("../../../templates/documents/tariff_sheet.html.tera")
            }
            Self::ClientRegistration => {
                include_str!("../../../templates/documents/client_registration.html.tera")
            }
            Self::SepaMandate => {
                include_str!("../../../templates/documents/sepa_mandate.html.tera")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderedDocument {
    Pdf(Vec<u8>),
    Html(String),
}

impl RenderedDocument {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf(_) => "pdf",
            Self::Html(_) => "html",
        }
    }

    pub fn file_name(&self, stem: &str) -> String {
        format!("{stem}.{}", self.extension())
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Pdf(bytes) => bytes,
            Self::Html(html) => html.as_bytes(),
        }
    }

    /// Writes the document as `<dir>/<stem>.<pdf|html>` and returns the path.
    pub async fn write_to(&self, dir: &Path, stem: &str) -> Result<PathBuf, DocumentError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(self.file_name(stem));
        tokio::fs::write(&path, self.as_bytes()).await?;
        Ok(path)
    }
}

/// Finds the PDF converter: the configured path when it exists, else `wkhtmltopdf` on `PATH`.
pub fn locate_converter(configured: Option<&Path>) -> Option<PathBuf> {
    match configured {
        Some(path) if path.exists() => Some(path.to_path_buf()),
        Some(path) => {
            warn!(
                event_name = "documents.converter.missing",
                path = %path.display(),
                "configured wkhtmltopdf path does not exist, searching PATH"
            );
            which::which("wkhtmltopdf").ok()
        }
        None => which::which("wkhtmltopdf").ok(),
    }
}

#[derive(Clone, Debug)]
pub struct DocumentRenderer {
    tera: Tera,
    wkhtmltopdf_path: Option<PathBuf>,
}

impl DocumentRenderer {
    /// Renderer with the embedded templates and the converter found by [`locate_converter`].
    pub fn new(configured_converter: Option<&Path>) -> Result<Self, DocumentError> {
        let wkhtmltopdf_path = locate_converter(configured_converter);

        match &wkhtmltopdf_path {
            Some(path) => info!(
                event_name = "documents.converter.found",
                path = %path.display(),
                "wkhtmltopdf found"
            ),
            None => warn!(
                event_name = "documents.converter.unavailable",
                "wkhtmltopdf not found - documents will be written as HTML"
            ),
        }

        Self::with_converter(wkhtmltopdf_path)
    }

    /// Renderer that never converts; every document comes back as HTML.
    pub fn html_only() -> Result<Self, DocumentError> {
        Self::with_converter(None)
    }

    fn with_converter(wkhtmltopdf_path: Option<PathBuf>) -> Result<Self, DocumentError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html.tera"]);
        register_template_filters(&mut tera);

        for kind in DocumentKind::ALL {
            tera.add_raw_template(kind.template_name(), kind.template_source())
                .map_err(|error| DocumentError::Template(error.to_string()))?;
        }

        Ok(Self { tera, wkhtmltopdf_path })
    }

    pub fn converter_path(&self) -> Option<&Path> {
        self.wkhtmltopdf_path.as_deref()
    }

    pub fn render_html<T: Serialize>(
        &self,
        kind: DocumentKind,
        document: &T,
    ) -> Result<String, DocumentError> {
        let mut context = Context::new();
        context.insert("doc", document);

        self.tera
            .render(kind.template_name(), &context)
            .map_err(|error| DocumentError::Template(render_error_chain(&error)))
    }

    /// Renders the document and converts it to PDF when possible.
    pub async fn render<T: Serialize>(
        &self,
        kind: DocumentKind,
        document: &T,
    ) -> Result<RenderedDocument, DocumentError> {
        let html = self.render_html(kind, document)?;

        let Some(wkhtmltopdf) = &self.wkhtmltopdf_path else {
            return Ok(RenderedDocument::Html(html));
        };

        match convert_html_to_pdf(&html, wkhtmltopdf).await {
            Ok(pdf_bytes) => Ok(RenderedDocument::Pdf(pdf_bytes)),
            Err(error) => {
                warn!(
                    event_name = "documents.convert.fallback",
                    template = kind.template_name(),
                    error = %error,
                    "PDF conversion failed, falling back to HTML"
                );
                Ok(RenderedDocument::Html(html))
            }
        }
    }
}

async fn convert_html_to_pdf(
    html: &str,
    wkhtmltopdf_path: &Path,
) -> Result<Vec<u8>, DocumentError> {
    let temp_dir = std::env::temp_dir();
    let id = uuid::Uuid::new_v4();
    let html_path = temp_dir.join(format!("tarifa_{id}.html"));
    let pdf_path = temp_dir.join(format!("tarifa_{id}.pdf"));

    tokio::fs::write(&html_path, html).await?;

    let output = Command::new(wkhtmltopdf_path)
        .args(["--page-size", "A4", "--encoding", "utf-8", "--quiet"])
        .args(["--margin-top", "10mm", "--margin-bottom", "10mm"])
        .args(["--margin-left", "10mm", "--margin-right", "10mm"])
        .arg(&html_path)
        .arg(&pdf_path)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let _ = tokio::fs::remove_file(&html_path).await;
    let output = output?;

    if !output.status.success() {
        let _ = tokio::fs::remove_file(&pdf_path).await;
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DocumentError::Conversion(format!(
            "wkhtmltopdf exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let pdf_bytes = tokio::fs::read(&pdf_path).await?;
    let _ = tokio::fs::remove_file(&pdf_path).await;

    info!(
        event_name = "documents.convert.completed",
        size_bytes = pdf_bytes.len(),
        "PDF generated"
    );

    Ok(pdf_bytes)
}

fn render_error_chain(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;
    use tarifa_core::config::CreditorConfig;
    use tarifa_core::cpq::tariff::Tariff;
    use tarifa_core::domain::product::Product;
    use tarifa_core::domain::quote::{LineRequest, QuoteEngine, ShippingPolicy};

    use super::{DocumentKind, DocumentRenderer, RenderedDocument};
    use crate::client::{ClientRegistration, Iban, SepaMandate, SepaPaymentType};
    use crate::quote_document::QuoteDocument;
    use crate::tariff_sheet::TariffSheetDocument;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap_or_default()
    }

    fn renderer() -> DocumentRenderer {
        match DocumentRenderer::html_only() {
            Ok(renderer) => renderer,
            Err(error) => panic!("embedded templates should compile: {error}"),
        }
    }

    #[tokio::test]
    async fn quote_renders_as_html_without_converter() {
        let mut engine = QuoteEngine::new(ShippingPolicy::default());
        engine.add_line(
            LineRequest::new("A1", "Tornillo DIN 933", Decimal::new(10, 0), 150)
                .with_net_terms("Neto 120 uds 8€", 120, Decimal::new(8, 0)),
        );
        let document = QuoteDocument::from_snapshot(&engine.snapshot(), "CV Tools", date());

        let result = renderer().render(DocumentKind::Quote, &document).await;

        match result {
            Ok(RenderedDocument::Html(html)) => {
                assert!(html.contains("Tornillo DIN 933"));
                assert!(html.contains("(Precio Neto aplicado por volumen &gt; 120)"));
                assert!(html.contains("1200.00 €"));
                assert!(html.contains("GRATIS"));
                assert!(html.contains("(Precios sin IVA)"));
            }
            Ok(RenderedDocument::Pdf(_)) => panic!("expected HTML when no converter is set"),
            Err(error) => panic!("quote rendering failed: {error}"),
        }
    }

    #[test]
    fn tariff_sheet_shows_net_condition_column() {
        let products = vec![
            Product::new("A1", "Tornillo")
                .with_attribute("PRECIO_ESTANDAR", json!(10.0))
                .with_attribute("NETOS", json!(true))
                .with_attribute("CONDICIONES_NETO", json!("Neto 120 uds 8€")),
            Product::new("B2", "Broca").with_attribute("PRECIO_ESTANDAR", json!(3.5)),
        ];
        let sheet = TariffSheetDocument::new(&products, Tariff::General, "CV Tools", date());

        let html = renderer().render_html(DocumentKind::TariffSheet, &sheet);
        let html = html.unwrap_or_else(|error| panic!("sheet rendering failed: {error}"));

        assert!(html.contains("Tarifa General"));
        assert!(html.contains("Neto 120 uds 8€"));
        assert!(html.contains("20.00 €"));
        assert!(html.contains("3.50 €"));
    }

    #[test]
    fn client_documents_render_sections_and_mandate() {
        let form = ClientRegistration {
            company_name: "Ferretería La Plaza".to_string(),
            tax_id: "B12345678".to_string(),
            iban: Iban::new("ES91 2100 0418 4502 0005 1332"),
            sepa_payment_type: SepaPaymentType::Recurrent,
            ..ClientRegistration::default()
        };
        let renderer = renderer();

        let registration = renderer
            .render_html(DocumentKind::ClientRegistration, &form.registration_document(date()))
            .unwrap_or_else(|error| panic!("registration rendering failed: {error}"));
        assert!(registration.contains("FICHA DE ALTA DE NUEVO CLIENTE"));
        assert!(registration.contains("Sección 5: Información Bancaria"));
        assert!(!registration.contains("Dirección de Entrega"));

        let mandate = SepaMandate::new(&form, &CreditorConfig::default());
        let mandate = renderer
            .render_html(DocumentKind::SepaMandate, &mandate)
            .unwrap_or_else(|error| panic!("mandate rendering failed: {error}"));
        assert!(mandate.contains("B96573613"));
        assert!(mandate.contains("ES91 2100 0418 4502 0005 1332"));
        assert!(mandate.contains("[X] Pago recurrente"));
        assert!(mandate.contains("[ ] Pago único"));
    }

    #[tokio::test]
    async fn failed_conversion_falls_back_to_html() {
        let renderer = match DocumentRenderer::new(Some(Path::new("/bin/false"))) {
            Ok(renderer) => renderer,
            Err(error) => panic!("renderer should build: {error}"),
        };
        if renderer.converter_path() != Some(Path::new("/bin/false")) {
            return;
        }

        let sheet = TariffSheetDocument::new(&[], Tariff::Neopro, "CV Tools", date());
        let result = renderer.render(DocumentKind::TariffSheet, &sheet).await;

        assert!(matches!(result, Ok(RenderedDocument::Html(_))));
    }

    #[tokio::test]
    async fn rendered_documents_are_written_with_their_extension() {
        let dir = tempfile::tempdir().unwrap_or_else(|error| panic!("tempdir: {error}"));
        let document = RenderedDocument::Html("<p>hola</p>".to_string());

        let path = document
            .write_to(&dir.path().join("out"), "Tarifa_Neopro")
            .await
            .unwrap_or_else(|error| panic!("write failed: {error}"));

        assert_eq!(path.file_name().and_then(|name| name.to_str()), Some("Tarifa_Neopro.html"));
        assert_eq!(std::fs::read_to_string(path).ok().as_deref(), Some("<p>hola</p>"));
    }
}
