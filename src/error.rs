use crate::month::Month;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No existe {kind} con id {id}")]
    NotFound { kind: &'static str, id: i64 },

    #[error("Mes no válido: '{0}'. Formatos aceptados: YYYY-MM-DD, DD/MM/YYYY, MM/YYYY o YYYY-MM")]
    InvalidMonth(String),

    #[error("Ya existe una entrada para {month} en {table}")]
    DuplicateMonth { table: &'static str, month: Month },

    #[error("Falta el campo obligatorio: {0}")]
    MissingField(&'static str),

    #[error("Importe fuera de rango: {0}")]
    AmountOutOfRange(&'static str),

    #[error("Unsupported database URL '{0}' (only SQLite is supported)")]
    UnsupportedDatabase(String),

    #[error("Invalid value in {table}.{column}: {value}")]
    Corrupt {
        table: &'static str,
        column: &'static str,
        value: String,
    },

    #[error("Spreadsheet import failed: {0}")]
    Spreadsheet(String),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("Chart rendering failed: {0}")]
    Chart(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// Errors caused by what the user submitted rather than by the system.
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            Error::InvalidMonth(_)
                | Error::DuplicateMonth { .. }
                | Error::MissingField(_)
                | Error::AmountOutOfRange(_)
        )
    }
}
