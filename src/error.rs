use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AnnotateError {
    #[error("csv missing column {0}")]
    MissingColumn(String),

    #[error("failed to read csv file at {0}")]
    CsvRead(Utf8PathBuf),

    #[error("failed to parse csv: {0}")]
    CsvParse(String),

    #[error("line {line}, column {column}: {message}")]
    InvalidField {
        line: u64,
        column: String,
        message: String,
    },

    #[error("invalid plate name: {0}")]
    InvalidPlateName(String),

    #[error("invalid well position: {0}")]
    InvalidPosition(String),

    #[error("no plate found with name {0}")]
    PlateNotFound(String),

    #[error("multiple plates found with name {0}")]
    PlateAmbiguous(String),

    #[error("no well found at plate:{plate}, row_index:{row}, col_index:{column}")]
    WellNotFound { plate: i64, row: u32, column: u32 },

    #[error("{count} map annotations under one namespace on well:{well}")]
    AnnotationConflict { well: i64, count: usize },

    #[error("OMERO login failed: {0}")]
    LoginFailed(String),

    #[error("OMERO request failed: {0}")]
    OmeroHttp(String),

    #[error("OMERO returned status {status}: {message}")]
    OmeroStatus { status: u16, message: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnnotateError {
    /// Process exit code: 2 for input and lookup errors, 3 for transport
    /// and login errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            AnnotateError::MissingColumn(_)
            | AnnotateError::CsvRead(_)
            | AnnotateError::CsvParse(_)
            | AnnotateError::InvalidField { .. }
            | AnnotateError::InvalidPlateName(_)
            | AnnotateError::InvalidPosition(_)
            | AnnotateError::PlateNotFound(_)
            | AnnotateError::PlateAmbiguous(_)
            | AnnotateError::WellNotFound { .. }
            | AnnotateError::AnnotationConflict { .. }
            | AnnotateError::InvalidConfig(_) => 2,
            AnnotateError::LoginFailed(_)
            | AnnotateError::OmeroHttp(_)
            | AnnotateError::OmeroStatus { .. } => 3,
        }
    }
}
