use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    /// Substrate failure, surfaced verbatim. Retry policy belongs to the
    /// caller.
    Sqlite(rusqlite::Error),
    /// Expected table does not exist.
    MissingTable(String),
    /// Table exists but lacks a contract column.
    MissingColumn { table: String, column: String },
    /// A stored value could not be decoded into the model.
    BadCell { table: String, column: String, value: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "sqlite error: {e}"),
            Self::MissingTable(table) => write!(f, "table '{table}' does not exist"),
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': missing column '{column}'")
            }
            Self::BadCell { table, column, value } => {
                write!(f, "table '{table}', column '{column}': cannot decode '{value}'")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}
