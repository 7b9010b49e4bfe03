use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown tariff `{0}`")]
    UnknownTariff(String),
    #[error("no product in Tarifa {tariff} for references: {}", .references.join(", "))]
    UnknownReferences { tariff: String, references: Vec<String> },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("catalog data failure: {0}")]
    Data(String),
    #[error("invalid input: {0}")]
    Input(String),
    #[error("document failure: {0}")]
    Document(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Stable class name reported in command payloads.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) | Self::Input(_) => "input_validation",
            Self::Data(_) => "catalog_data",
            Self::Document(_) => "document_generation",
            Self::Configuration(_) => "config_validation",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Data(_) => 3,
            Self::Domain(_) | Self::Input(_) => 4,
            Self::Document(_) => 5,
        }
    }
}
