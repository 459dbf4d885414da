//! Format conversion
//!
//! Converting a PDF into images or a Word document is delegated to external
//! tools behind the [`Converter`] trait. Converting text or images into a
//! PDF is done in-process with the overlay composer.

pub mod to_pdf;
pub mod tools;

use std::fmt;
use std::io::{Cursor, Write};
use std::path::Path;
use std::str::FromStr;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};

pub use to_pdf::{images_to_pdf, text_to_pdf, SourceKind};
pub use tools::{OfficeRenderer, Rasterizer};

/// Formats a PDF can be converted into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Docx,
    Png,
    Jpg,
}

impl TargetFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Docx => "docx",
            TargetFormat::Png => "png",
            TargetFormat::Jpg => "jpg",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, TargetFormat::Png | TargetFormat::Jpg)
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            TargetFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            TargetFormat::Png => "image/png",
            TargetFormat::Jpg => "image/jpeg",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docx" => Ok(TargetFormat::Docx),
            "png" => Ok(TargetFormat::Png),
            "jpg" | "jpeg" => Ok(TargetFormat::Jpg),
            other => Err(Error::validation(format!(
                "Unsupported target format '{other}' (expected docx, jpg or png)"
            ))),
        }
    }
}

/// A named output file held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// MIME type guessed from the file extension
    pub fn content_type(&self) -> &'static str {
        let ext = Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("pdf") => "application/pdf",
            Some("zip") => "application/zip",
            Some("png") => TargetFormat::Png.content_type(),
            Some("jpg") | Some("jpeg") => TargetFormat::Jpg.content_type(),
            Some("docx") => TargetFormat::Docx.content_type(),
            _ => "application/octet-stream",
        }
    }
}

/// An external tool that turns a PDF on disk into other files
pub trait Converter: Send + Sync {
    /// Short name for logs and error messages
    fn name(&self) -> &str;

    /// Convert `input`, using `work_dir` for scratch output.
    ///
    /// Image targets yield one artifact per page, in page order, named
    /// `page_<n>.<ext>`.
    fn convert(&self, input: &Path, target: TargetFormat, work_dir: &Path) -> Result<Vec<Artifact>>;
}

/// The converters chosen at startup, one per kind of target
pub struct Converters {
    pub raster: Box<dyn Converter>,
    pub office: Box<dyn Converter>,
}

impl Converters {
    pub fn new(raster: Box<dyn Converter>, office: Box<dyn Converter>) -> Self {
        Self { raster, office }
    }

    pub fn for_target(&self, target: TargetFormat) -> &dyn Converter {
        if target.is_image() {
            self.raster.as_ref()
        } else {
            self.office.as_ref()
        }
    }
}

impl Default for Converters {
    fn default() -> Self {
        Self::new(
            Box::new(Rasterizer::default()),
            Box::new(OfficeRenderer::default()),
        )
    }
}

impl fmt::Debug for Converters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converters")
            .field("raster", &self.raster.name())
            .field("office", &self.office.name())
            .finish()
    }
}

/// Pack artifacts into a deflated zip archive
pub fn zip_artifacts(artifacts: &[Artifact]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for artifact in artifacts {
        zip.start_file(artifact.name.as_str(), options)
            .map_err(|e| Error::General(format!("Failed to write zip entry: {e}")))?;
        zip.write_all(&artifact.bytes)?;
    }
    let cursor = zip
        .finish()
        .map_err(|e| Error::General(format!("Failed to finish zip archive: {e}")))?;
    Ok(cursor.into_inner())
}

/// Shape converter output into a single download named after `stem`.
///
/// One image stays as is, several images are zipped, a document is renamed.
pub fn bundle(stem: &str, target: TargetFormat, mut artifacts: Vec<Artifact>) -> Result<Artifact> {
    match artifacts.len() {
        0 => Err(Error::Conversion(format!("no {target} output was produced"))),
        1 => {
            let artifact = artifacts.remove(0);
            Ok(Artifact::new(format!("{stem}.{}", target.extension()), artifact.bytes))
        }
        _ if target.is_image() => Ok(Artifact::new(
            format!("{stem}_images.zip"),
            zip_artifacts(&artifacts)?,
        )),
        n => Err(Error::Conversion(format!(
            "expected one {target} file, the converter produced {n}"
        ))),
    }
}
