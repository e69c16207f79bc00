use thiserror::Error;

#[derive(Error, Debug)]
pub enum GroundworkError {
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Atom is not ground: {0}")]
    NonGround(String),
    #[error("Invalid predicate key: {0}")]
    PredicateKey(String),
    #[error("Codec error: {0}")]
    Codec(String),
    #[error("Parse error: {message}")]
    Parse { message: String },
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Connection pool error: {0}")]
    Pool(String),
    #[error("RDF mapping error: {0}")]
    Rdf(String),
    #[error("Import error: {0}")]
    Import(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Iteration interrupted")]
    Interrupted,
}

pub type Result<T> = std::result::Result<T, GroundworkError>;

// Helper conversions
impl From<rusqlite::Error> for GroundworkError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Backend(e.to_string())
    }
}
impl From<r2d2::Error> for GroundworkError {
    fn from(e: r2d2::Error) -> Self {
        Self::Pool(e.to_string())
    }
}
impl From<serde_json::Error> for GroundworkError {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec(e.to_string())
    }
}
impl From<std::io::Error> for GroundworkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
#[cfg(feature = "postgres")]
impl From<postgres::Error> for GroundworkError {
    fn from(e: postgres::Error) -> Self {
        Self::Backend(e.to_string())
    }
}
