use thiserror::Error;

/// Fatal feed failures. Recoverable input malformation (an unparseable
/// cell) is NOT an error: it degrades to a sentinel value with a warning.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path} is missing required column {column}")]
    MissingColumn { path: String, column: String },

    #[error("unparseable timestamp {value:?} in {path}")]
    BadTimestamp { path: String, value: String },

    /// Raw and adjusted sources disagree on their calendars. This is a
    /// configuration problem, not a data problem, so it aborts setup.
    #[error(
        "calendar mismatch: {raw_source} has {raw_date} where {adjusted_source} has {adjusted_date}"
    )]
    CalendarMismatch {
        raw_source: String,
        adjusted_source: String,
        raw_date: String,
        adjusted_date: String,
    },
}

impl FeedError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
