//! User-facing operations
//!
//! Each operation takes the uploaded bytes, validates its parameters,
//! transforms the document in memory and returns the output bytes. Nothing
//! is written to disk except by conversions that shell out to a tool.

pub mod arrange;
pub mod convert;
pub mod edit;
pub mod protect;
pub mod watermark;

pub use arrange::{merge, rotate, split, RotateOptions};
pub use convert::{convert_from_pdf, convert_to_pdf, expect_source_kind, file_stem};
pub use edit::{apply_edits, edit, parse_elements, EditElement};
pub use protect::{decrypt, encrypt};
pub use watermark::{add_watermark, WatermarkKind, WatermarkOptions};

pub use crate::pdf::security::EncryptOptions;
