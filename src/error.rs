use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// Result type used throughout the library.
pub type MatchupResult<T> = Result<T, MatchupError>;

/// Everything that can go wrong while building geometries, locating pixels, or matching them.
///
/// A primary pixel that simply has no partner is NOT an error, it is dropped quietly.
#[derive(Debug)]
pub enum MatchupError {
    /// A sampling interval with a component less than 1.
    InvalidInterval { x: i32, y: i32 },
    /// A swath outline that is not a valid polygon, even after splitting it.
    InvalidGeometry(String),
    /// A pixel or time coordinate outside the domain of a locator.
    LocatorRange(String),
    /// An inconsistent run setup, e.g. an undeclared secondary sensor.
    Configuration(String),
    /// A malformed input file.
    Parse(String),
    /// Problem reading an input file.
    Io(std::io::Error),
}

impl Display for MatchupError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        use MatchupError::*;

        match self {
            InvalidInterval { x, y } => write!(f, "invalid interval ({}, {})", x, y),
            InvalidGeometry(msg) => write!(f, "{}", msg),
            LocatorRange(msg) => write!(f, "{}", msg),
            Configuration(msg) => write!(f, "{}", msg),
            Parse(msg) => write!(f, "parse error: {}", msg),
            Io(err) => write!(f, "{}", err),
        }
    }
}

impl Error for MatchupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MatchupError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MatchupError {
    fn from(err: std::io::Error) -> Self {
        MatchupError::Io(err)
    }
}

impl MatchupError {
    /// Errors that only disqualify the file being processed, the run may continue without it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MatchupError::InvalidGeometry(_) | MatchupError::Parse(_) | MatchupError::Io(_)
        )
    }
}
