use chrono::NaiveDate;
use serde::Serialize;
use tarifa_core::cpq::pricing::{tariff_sheet_rows, TariffSheetRow};
use tarifa_core::cpq::tariff::Tariff;
use tarifa_core::domain::product::Product;

use crate::format_date;

/// Template context for a full price list under one tariff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TariffSheetDocument {
    pub title: String,
    pub company_name: String,
    pub date: String,
    pub rows: Vec<TariffSheetRow>,
}

impl TariffSheetDocument {
    pub fn new(products: &[Product], tariff: Tariff, company: &str, date: NaiveDate) -> Self {
        Self {
            title: format!("Tarifa {}", tariff.display_name()),
            company_name: company.to_string(),
            date: format_date(date),
            rows: tariff_sheet_rows(products, tariff),
        }
    }

    pub fn file_stem(&self) -> String {
        self.title.replace(' ', "_")
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;
    use tarifa_core::cpq::tariff::Tariff;
    use tarifa_core::domain::product::Product;

    use super::TariffSheetDocument;

    #[test]
    fn sheet_title_and_file_name_follow_tariff() {
        let products = vec![
            Product::new("A1", "Tornillo").with_attribute("PRECIO_ESTANDAR", json!(4.8)),
        ];
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap_or_default();
        let sheet = TariffSheetDocument::new(&products, Tariff::GrandesCuentas, "CV Tools", date);

        assert_eq!(sheet.title, "Tarifa Grandes Cuentas");
        assert_eq!(sheet.file_stem(), "Tarifa_Grandes_Cuentas");
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.date, "17/10/2026");
    }
}
