//! New-client registration sheet and the SEPA direct-debit mandate that accompanies it when the
//! client pays by bank debit.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tarifa_core::config::CreditorConfig;
use tarifa_core::errors::ApplicationError;
use thiserror::Error;

use crate::format_date;

pub type Creditor = CreditorConfig;

pub const FALLBACK_FILE_NAME: &str = "Nuevo_Cliente";

const SEPA_LEGAL_TEXT: &str = "Mediante la firma de esta orden de domiciliación, el deudor autoriza (A) al acreedor a enviar instrucciones a la entidad del deudor para adeudar su cuenta y (B) a la entidad para efectuar los adeudos en su cuenta siguiendo las instrucciones del acreedor. Como parte de sus derechos, el deudor está legitimado al reembolso por su entidad en los términos y condiciones del contrato suscrito con la misma. La solicitud de reembolso deberá efectuarse dentro de las ocho semanas que siguen a la fecha de adeudo en cuenta.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientFormError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

impl From<ClientFormError> for ApplicationError {
    fn from(value: ClientFormError) -> Self {
        Self::Input(value.to_string())
    }
}

/// Bank account number. Only the last four characters show up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iban(String);

impl Iban {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.as_str().is_empty()
    }

    pub fn masked(&self) -> String {
        let compact: Vec<char> = self.as_str().chars().filter(|ch| !ch.is_whitespace()).collect();
        let visible = compact.len().saturating_sub(4);
        compact
            .iter()
            .enumerate()
            .map(|(position, ch)| if position < visible { '*' } else { *ch })
            .collect()
    }
}

impl fmt::Debug for Iban {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Iban").field(&self.masked()).finish()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "snake_case")]
pub enum SepaPaymentType {
    Recurrent,
    #[default]
    OneOff,
}

impl From<String> for SepaPaymentType {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "recurrente" | "recurrent" => Self::Recurrent,
            _ => Self::OneOff,
        }
    }
}

/// Registration form as submitted. Field names accept both the English names and the Spanish
/// names used by the web form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientRegistration {
    #[serde(alias = "nombre_empresa")]
    pub company_name: String,
    #[serde(alias = "cif")]
    pub tax_id: String,
    #[serde(alias = "direccion")]
    pub fiscal_address: String,
    #[serde(alias = "codigo_postal")]
    pub postal_code: String,
    #[serde(alias = "poblacion")]
    pub city: String,
    #[serde(alias = "provincia")]
    pub province: String,
    #[serde(alias = "telefono_fiscal")]
    pub phone: String,
    #[serde(alias = "email_fiscal")]
    pub fiscal_email: String,

    #[serde(alias = "direccion_entrega")]
    pub delivery_address: String,
    #[serde(alias = "cp_entrega")]
    pub delivery_postal_code: String,
    #[serde(alias = "poblacion_entrega")]
    pub delivery_city: String,
    #[serde(alias = "provincia_entrega")]
    pub delivery_province: String,

    #[serde(alias = "nombre_contabilidad")]
    pub accounting_first_name: String,
    #[serde(alias = "apellidos_contabilidad")]
    pub accounting_last_name: String,
    #[serde(alias = "email_contabilidad")]
    pub accounting_email: String,
    #[serde(alias = "telefono_contabilidad")]
    pub accounting_phone: String,

    #[serde(alias = "nombre_compras")]
    pub purchasing_first_name: String,
    #[serde(alias = "apellidos_compras")]
    pub purchasing_last_name: String,
    #[serde(alias = "email_compras")]
    pub purchasing_email: String,
    #[serde(alias = "telefono_compras")]
    pub purchasing_phone: String,

    pub iban: Iban,
    pub swift: String,
    #[serde(alias = "pais")]
    pub country: String,
    #[serde(alias = "tipo_pago_sepa")]
    pub sepa_payment_type: SepaPaymentType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FormSection {
    pub title: &'static str,
    pub fields: Vec<FormField>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub label: &'static str,
    pub value: String,
}

/// Template context for the registration sheet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientRegistrationDocument {
    pub date: String,
    pub sections: Vec<FormSection>,
}

impl ClientRegistration {
    pub fn validate(&self) -> Result<(), ClientFormError> {
        let required = [
            ("nombre_empresa", &self.company_name),
            ("cif", &self.tax_id),
            ("direccion", &self.fiscal_address),
            ("codigo_postal", &self.postal_code),
            ("poblacion", &self.city),
            ("provincia", &self.province),
            ("telefono_fiscal", &self.phone),
            ("email_fiscal", &self.fiscal_email),
        ];

        let missing: Vec<&'static str> = required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ClientFormError::MissingFields(missing))
        }
    }

    pub fn has_delivery_address(&self) -> bool {
        !self.delivery_address.trim().is_empty()
    }

    pub fn needs_sepa_mandate(&self) -> bool {
        !self.iban.is_blank()
    }

    /// Sections in print order. Section numbers stay fixed; the delivery section is left out
    /// when no delivery address was given.
    pub fn sections(&self) -> Vec<FormSection> {
        let mut sections = vec![FormSection {
            title: "Sección 1: Datos Fiscales",
            fields: vec![
                field("Nombre Empresa", &self.company_name),
                field("CIF", &self.tax_id),
                field("Dirección Fiscal", &self.fiscal_address),
                field("Población", &joined(&self.postal_code, &self.city)),
                field("Provincia", &self.province),
                field("Teléfono", &self.phone),
                field("E-Mail Fiscal", &self.fiscal_email),
            ],
        }];

        if self.has_delivery_address() {
            sections.push(FormSection {
                title: "Sección 2: Dirección de Entrega",
                fields: vec![
                    field("Dirección Entrega", &self.delivery_address),
                    field("Población", &joined(&self.delivery_postal_code, &self.delivery_city)),
                    field("Provincia", &self.delivery_province),
                ],
            });
        }

        sections.push(FormSection {
            title: "Sección 3: Dpto. Contabilidad",
            fields: vec![
                field(
                    "Nombre Completo",
                    &joined(&self.accounting_first_name, &self.accounting_last_name),
                ),
                field("E-Mail Contacto", &self.accounting_email),
                field("Teléfono Contacto", &self.accounting_phone),
            ],
        });
        sections.push(FormSection {
            title: "Sección 4: Dpto. Compras",
            fields: vec![
                field(
                    "Nombre Completo",
                    &joined(&self.purchasing_first_name, &self.purchasing_last_name),
                ),
                field("E-Mail", &self.purchasing_email),
                field("Teléfono", &self.purchasing_phone),
            ],
        });
        sections.push(FormSection {
            title: "Sección 5: Información Bancaria",
            fields: vec![field("IBAN", self.iban.as_str())],
        });

        sections
    }

    pub fn registration_document(&self, date: NaiveDate) -> ClientRegistrationDocument {
        ClientRegistrationDocument { date: format_date(date), sections: self.sections() }
    }

    pub fn registration_file_stem(&self) -> String {
        format!("Alta_Cliente_{}", self.file_name_part())
    }

    pub fn mandate_file_stem(&self) -> String {
        format!("Mandato_SEPA_{}", self.file_name_part())
    }

    fn file_name_part(&self) -> String {
        let name = self.company_name.trim();
        if name.is_empty() {
            FALLBACK_FILE_NAME.to_string()
        } else {
            name.replace(' ', "_")
        }
    }
}

/// Template context for the SEPA direct-debit mandate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SepaMandate {
    pub creditor: Vec<FormField>,
    pub debtor: Vec<FormField>,
    pub recurrent: bool,
    pub legal_text: &'static str,
    pub contact_email: String,
}

impl SepaMandate {
    pub fn new(form: &ClientRegistration, creditor: &Creditor) -> Self {
        Self {
            creditor: vec![
                field("Referencia de la orden:", &creditor.mandate_reference),
                field("Identificador del acreedor:", &creditor.identifier),
                field("Nombre del acreedor:", &creditor.name),
                field("Dirección:", &creditor.address),
                field("Código postal - Población:", &creditor.postal_city),
                field("País:", &creditor.country),
            ],
            debtor: vec![
                field("Nombre del deudor/es:", &form.company_name),
                field("Dirección del deudor:", &form.fiscal_address),
                field("Código postal - Población:", &joined(&form.postal_code, &form.city)),
                field("País del deudor:", &form.country),
                field("Swift BIC:", &form.swift),
                field("Número de cuenta - IBAN:", form.iban.as_str()),
            ],
            recurrent: form.sepa_payment_type == SepaPaymentType::Recurrent,
            legal_text: SEPA_LEGAL_TEXT,
            contact_email: creditor.contact_email.clone(),
        }
    }
}

fn field(label: &'static str, value: &str) -> FormField {
    FormField { label, value: value.trim().to_string() }
}

fn joined(first: &str, second: &str) -> String {
    format!("{} {}", first.trim(), second.trim()).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::{
        ClientFormError, ClientRegistration, Creditor, Iban, SepaMandate, SepaPaymentType,
    };

    fn spanish_form() -> ClientRegistration {
        let raw = serde_json::json!({
            "nombre_empresa": "Ferretería La Plaza",
            "cif": "B12345678",
            "direccion": "Calle Mayor 1",
            "codigo_postal": "46800",
            "poblacion": "Xàtiva",
            "provincia": "Valencia",
            "telefono_fiscal": "962000000",
            "email_fiscal": "admin@laplaza.es",
            "nombre_compras": "Marta",
            "apellidos_compras": "Pons",
            "iban": "ES91 2100 0418 4502 0005 1332",
            "swift": "CAIXESBBXXX",
            "pais": "España",
            "tipo_pago_sepa": "recurrente"
        });
        serde_json::from_value(raw).unwrap_or_default()
    }

    #[test]
    fn spanish_field_names_are_accepted() {
        let form = spanish_form();

        assert_eq!(form.company_name, "Ferretería La Plaza");
        assert_eq!(form.city, "Xàtiva");
        assert_eq!(form.sepa_payment_type, SepaPaymentType::Recurrent);
        assert!(form.validate().is_ok());
        assert!(form.needs_sepa_mandate());
    }

    #[test]
    fn blank_required_fields_are_listed() {
        let form = ClientRegistration {
            company_name: "Taller Ruiz".to_string(),
            phone: "   ".to_string(),
            ..ClientRegistration::default()
        };

        let Err(ClientFormError::MissingFields(missing)) = form.validate() else {
            panic!("incomplete form should fail validation");
        };
        assert_eq!(
            missing,
            vec![
                "cif",
                "direccion",
                "codigo_postal",
                "poblacion",
                "provincia",
                "telefono_fiscal",
                "email_fiscal"
            ]
        );
    }

    #[test]
    fn delivery_section_only_when_address_given() {
        let mut form = spanish_form();
        let titles: Vec<&str> = form.sections().iter().map(|section| section.title).collect();
        assert_eq!(titles.len(), 4);
        assert!(!titles.iter().any(|title| title.contains("Entrega")));

        form.delivery_address = "Polígono Sur, nave 4".to_string();
        form.delivery_postal_code = "46830".to_string();
        let sections = form.sections();
        assert_eq!(sections.len(), 5);
        assert_eq!(sections[1].title, "Sección 2: Dirección de Entrega");
        assert_eq!(sections[1].fields[1].value, "46830");
    }

    #[test]
    fn file_names_replace_spaces_and_fall_back() {
        let form = spanish_form();
        assert_eq!(form.registration_file_stem(), "Alta_Cliente_Ferretería_La_Plaza");
        assert_eq!(form.mandate_file_stem(), "Mandato_SEPA_Ferretería_La_Plaza");

        let unnamed = ClientRegistration::default();
        assert_eq!(unnamed.registration_file_stem(), "Alta_Cliente_Nuevo_Cliente");
    }

    #[test]
    fn mandate_carries_creditor_block_and_payment_type() {
        let form = spanish_form();
        let mandate = SepaMandate::new(&form, &Creditor::default());

        assert_eq!(mandate.creditor[1].value, "B96573613");
        assert_eq!(mandate.debtor[2].value, "46800 Xàtiva");
        assert_eq!(mandate.debtor[5].value, "ES91 2100 0418 4502 0005 1332");
        assert!(mandate.recurrent);

        let one_off = ClientRegistration {
            sepa_payment_type: SepaPaymentType::from("unico".to_string()),
            ..form
        };
        assert!(!SepaMandate::new(&one_off, &Creditor::default()).recurrent);
    }

    #[test]
    fn iban_is_redacted_in_debug_output() {
        let iban = Iban::new("ES91 2100 0418 4502 0005 1332");
        let debug = format!("{:?}", spanish_form());

        assert_eq!(format!("{iban:?}"), "Iban(\"********************1332\")");
        assert!(!debug.contains("0418"));
        assert!(Iban::new("  ").is_blank());
    }
}
