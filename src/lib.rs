//! PDF Studio Library
//!
//! Local PDF manipulation for a desktop application. This library provides
//! functionality to:
//! - Split, merge and rotate pages
//! - Encrypt and decrypt documents with a password
//! - Stamp text or image watermarks
//! - Draw text, signatures and checkboxes onto pages
//! - Convert PDFs to images or DOCX, and text or images to PDF
//! - Serve all of the above over a local HTTP API
//!
//! # Example
//!
//! ```no_run
//! use pdf_studio::ops;
//!
//! let input = std::fs::read("report.pdf")?;
//! let pages = ops::split(&input, "1-3,5")?;
//! std::fs::write("excerpt.pdf", pages)?;
//! # Ok::<(), pdf_studio::Error>(())
//! ```

pub mod color;
pub mod config;
pub mod convert;
pub mod error;
pub mod layout;
pub mod ops;
pub mod pages;
pub mod pdf;
pub mod server;
pub mod session;

// Re-export commonly used items
pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use pages::{parse_page_ranges, select_pages, RangeError};
