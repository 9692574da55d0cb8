/// Error types for the ipcount library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The selector index is 1-based; zero selects nothing.
    #[error("invalid key {index}: the address index starts at 1")]
    InvalidSelector { index: usize },

    /// A result limit of zero would always produce an empty report.
    #[error("invalid result limit {limit}: must be at least 1")]
    InvalidLimit { limit: usize },

    /// The lookup concurrency must allow at least one lookup in flight.
    #[error("invalid lookup concurrency {concurrency}: must be at least 1")]
    InvalidConcurrency { concurrency: usize },

    /// Two settings cannot be honored together.
    #[error("conflicting settings: {0}")]
    Conflict(&'static str),

    /// The output template references the hostname but lookups are disabled.
    #[error("the {{host}} field cannot be used together with --numeric")]
    HostWithoutResolve,

    /// Output template string is malformed.
    #[error("invalid template: {reason}")]
    InvalidTemplate { reason: String },

    /// No IP address patterns were selected for extraction.
    #[error("no IP patterns selected")]
    NoPatterns,

    /// A custom pattern failed to parse.
    #[error("invalid pattern")]
    Pattern(#[from] regex_syntax::Error),

    /// A regex compilation error.
    #[error("regex error: {0}")]
    Regex(#[from] regex_automata::meta::BuildError),

    /// Pedantic mode found a line without a selectable address.
    #[error("no address found on line {line_number} of {input}: {line:?}")]
    NoAddress {
        input: String,
        line_number: u64,
        line: String,
    },

    /// An input could not be opened or read.
    #[error("failed to read {input}")]
    Input {
        input: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error was caused by invalid settings rather than by the
    /// input or the environment. Nothing has been read when these are raised.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidSelector { .. }
                | Error::InvalidLimit { .. }
                | Error::InvalidConcurrency { .. }
                | Error::Conflict(_)
                | Error::HostWithoutResolve
                | Error::InvalidTemplate { .. }
                | Error::NoPatterns
                | Error::Pattern(_)
                | Error::Regex(_)
        )
    }
}

/// Convenience type alias for Results using the library error.
pub type Result<T> = std::result::Result<T, Error>;
