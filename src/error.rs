//! Error types for the PDF studio library

use thiserror::Error;

use crate::pages::RangeError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF studio library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF parsing or writing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad input format or missing/invalid parameter
    #[error("{0}")]
    Validation(String),

    /// Page range expression is malformed or out of bounds
    #[error("Invalid page range: {0}")]
    InvalidRange(#[from] RangeError),

    /// A page selection resolved to zero pages
    #[error("No pages selected. Use a page list such as '1-3,5,7-9' (valid pages: 1..{max_pages})")]
    EmptySelection { max_pages: u32 },

    /// Password does not unlock the document
    #[error("Incorrect password")]
    WrongPassword,

    /// Decrypt requested on a document without encryption
    #[error("PDF is not encrypted")]
    NotEncrypted,

    /// External converter failed or is missing
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// Font error
    #[error("Font error: {0}")]
    Font(String),

    /// Raster image could not be decoded or encoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Edit element list is not valid JSON for the element schema
    #[error("Invalid edit elements: {0}")]
    InvalidElements(#[from] serde_json::Error),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages")]
    EmptyPdf,

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::InvalidRange(_) => "invalid_range",
            Error::EmptySelection { .. } => "empty_selection",
            Error::WrongPassword => "wrong_password",
            Error::NotEncrypted => "not_encrypted",
            Error::Conversion(_) => "conversion_failed",
            Error::Pdf(_) | Error::EmptyPdf => "invalid_pdf",
            Error::Image(_) => "invalid_image",
            Error::InvalidElements(_) => "invalid_elements",
            Error::Io(_) | Error::Font(_) | Error::General(_) => "internal_error",
        }
    }

    /// Whether the caller can fix this error by changing the request
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Error::Io(_) | Error::Font(_) | Error::General(_) | Error::Conversion(_)
        )
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
