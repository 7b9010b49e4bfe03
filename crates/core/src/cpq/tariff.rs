use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Named pricing schemes. Each selects the product column holding its price and the
/// discount that price already carries over the list price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tariff {
    General,
    Bigmat,
    Neopro,
    Ehlis,
    Synergas,
    Cecofersa,
    GrandesCuentas,
    Coferdroza,
    IndustrialPro,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetColumns {
    pub flag: &'static str,
    pub condition: &'static str,
    pub label: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TariffRule {
    pub price_field: &'static str,
    /// Nominal discount in percent (50 means 50%).
    pub discount_pct: Decimal,
    /// `final / divisor` recovers the list price; equals `1 - discount`.
    pub divisor: Decimal,
    pub net: Option<NetColumns>,
}

const STANDARD_NET: NetColumns =
    NetColumns { flag: "NETOS", condition: "CONDICIONES_NETO", label: "Neto" };
const KEY_ACCOUNT_NET: NetColumns =
    NetColumns { flag: "NETOS_GRANDE_CUENTAS", condition: "CONDICION_NETO_GC", label: "Neto G.C." };

impl Tariff {
    pub const ALL: [Tariff; 9] = [
        Tariff::General,
        Tariff::Bigmat,
        Tariff::Neopro,
        Tariff::Ehlis,
        Tariff::Synergas,
        Tariff::Cecofersa,
        Tariff::GrandesCuentas,
        Tariff::Coferdroza,
        Tariff::IndustrialPro,
    ];

    /// Recognises tariff names and their data file names, e.g. `general`,
    /// `Tarifa_Grandes_Cuentas.json` or `industrial-pro`.
    pub fn identify(identifier: &str) -> Option<Self> {
        let mut key: String = identifier
            .trim()
            .to_lowercase()
            .chars()
            .filter(|ch| ch.is_alphanumeric())
            .collect();
        if let Some(stripped) = key.strip_suffix("json") {
            key = stripped.to_string();
        }
        if let Some(stripped) = key.strip_prefix("tarifa") {
            key = stripped.to_string();
        }

        Self::ALL.into_iter().find(|tariff| tariff.key() == key)
    }

    fn key(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Bigmat => "bigmat",
            Self::Neopro => "neopro",
            Self::Ehlis => "ehlis",
            Self::Synergas => "synergas",
            Self::Cecofersa => "cecofersa",
            Self::GrandesCuentas => "grandescuentas",
            Self::Coferdroza => "coferdroza",
            Self::IndustrialPro => "industrialpro",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Bigmat => "BigMat",
            Self::Neopro => "Neopro",
            Self::Ehlis => "Ehlis",
            Self::Synergas => "Synergas",
            Self::Cecofersa => "Cecofersa",
            Self::GrandesCuentas => "Grandes Cuentas",
            Self::Coferdroza => "Coferdroza",
            Self::IndustrialPro => "Industrial Pro",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::General => "Tarifa_General.json",
            Self::Bigmat => "Tarifa_Bigmat.json",
            Self::Neopro => "Tarifa_Neopro.json",
            Self::Ehlis => "Tarifa_Ehlis.json",
            Self::Synergas => "Tarifa_Synergas.json",
            Self::Cecofersa => "Tarifa_Cecofersa.json",
            Self::GrandesCuentas => "Tarifa_Grandes_Cuentas.json",
            Self::Coferdroza => "Tarifa_Coferdroza.json",
            Self::IndustrialPro => "Tarifa_IndustrialPro.json",
        }
    }

    pub fn rule(self) -> TariffRule {
        let half = TariffRule {
            price_field: "PRECIO_ESTANDAR",
            discount_pct: Decimal::new(50, 0),
            divisor: Decimal::new(50, 2),
            net: None,
        };
        let group = TariffRule {
            price_field: "PRECIO_GRUPO1",
            discount_pct: Decimal::new(52, 0),
            divisor: Decimal::new(48, 2),
            net: None,
        };

        match self {
            Self::General | Self::Bigmat => TariffRule { net: Some(STANDARD_NET), ..half },
            Self::Neopro | Self::Ehlis | Self::Synergas => group,
            Self::Cecofersa => {
                TariffRule { price_field: "PRECIO_CECOFERSA", net: Some(STANDARD_NET), ..group }
            }
            Self::GrandesCuentas => TariffRule { net: Some(KEY_ACCOUNT_NET), ..half },
            Self::Coferdroza => TariffRule { price_field: "PRECIO_GRUPO3", ..half },
            Self::IndustrialPro => {
                TariffRule { price_field: "PRECIO_ESTANDAR", net: Some(STANDARD_NET), ..group }
            }
        }
    }
}

impl fmt::Display for Tariff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Tariff {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::identify(value).ok_or_else(|| DomainError::UnknownTariff(value.trim().to_string()))
    }
}
