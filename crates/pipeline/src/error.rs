use std::fmt;

#[derive(Debug)]
pub enum PipelineError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad precedence, bad status map, etc.).
    ConfigValidation(String),
    /// A record's source system is not in the precedence order.
    UnknownSource(String),
    /// A raw status value has no entry in its source's status map.
    UnmappedStatus { source: String, booking_id: String, value: String },
    /// Two candidates with identical precedence, ingested_at and source
    /// disagree on a field value.
    AmbiguousConflict { booking_id: String, field: &'static str },
    /// Missing required column in seeded CSV input.
    MissingColumn { source: String, column: String },
    /// Date parse error.
    DateParse { source: String, booking_id: String, value: String },
    /// Timestamp parse error.
    TimestampParse { source: String, booking_id: String, value: String },
    /// Price parse error.
    PriceParse { source: String, booking_id: String, value: String },
    /// CSV read error.
    Io(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownSource(source) => {
                write!(f, "source '{source}' is not in the precedence order")
            }
            Self::UnmappedStatus { source, booking_id, value } => {
                write!(
                    f,
                    "source '{source}', booking '{booking_id}': unmapped status '{value}'"
                )
            }
            Self::AmbiguousConflict { booking_id, field } => {
                write!(
                    f,
                    "booking '{booking_id}': ambiguous conflict on field '{field}' \
                     (equal precedence, ingested_at and source)"
                )
            }
            Self::MissingColumn { source, column } => {
                write!(f, "source '{source}': missing column '{column}'")
            }
            Self::DateParse { source, booking_id, value } => {
                write!(
                    f,
                    "source '{source}', booking '{booking_id}': cannot parse date '{value}'"
                )
            }
            Self::TimestampParse { source, booking_id, value } => {
                write!(
                    f,
                    "source '{source}', booking '{booking_id}': cannot parse timestamp '{value}'"
                )
            }
            Self::PriceParse { source, booking_id, value } => {
                write!(
                    f,
                    "source '{source}', booking '{booking_id}': cannot parse price '{value}'"
                )
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}
