//! Conversions to and from PDF

use std::path::Path;

use tracing::info;

use crate::convert::{bundle, images_to_pdf, text_to_pdf, Artifact, Converters, SourceKind, TargetFormat};
use crate::error::{Error, Result};
use crate::pdf::document::{self, ensure_pdf};
use crate::pdf::fonts::FontBook;
use crate::session::Session;

/// Convert a PDF with the converter registered for `target`.
///
/// The input is stored in the caller's session and the converter writes
/// its scratch files there too.
pub fn convert_from_pdf(
    converters: &Converters,
    session: &Session,
    file_name: &str,
    bytes: &[u8],
    target: TargetFormat,
) -> Result<Artifact> {
    ensure_pdf(bytes)?;
    let stem = file_stem(file_name);
    let input = session.write(&format!("{stem}.pdf"), bytes)?;

    let converter = converters.for_target(target);
    let artifacts = converter.convert(&input, target, session.path())?;
    let artifact = bundle(&stem, target, artifacts)?;
    info!(
        "{} converted {} to {} ({} bytes)",
        converter.name(),
        file_name,
        artifact.name,
        artifact.bytes.len()
    );
    Ok(artifact)
}

/// Build a PDF from one text file or one or more images.
///
/// The output is named after the first file.
pub fn convert_to_pdf(files: &[(String, Vec<u8>)], fonts: &FontBook) -> Result<Artifact> {
    let (first_name, first_bytes) = files
        .first()
        .ok_or_else(|| Error::validation("No files provided"))?;

    let mut doc = match SourceKind::from_file_name(first_name)? {
        SourceKind::Text => {
            if files.len() > 1 {
                return Err(Error::validation("Only one text file can be converted at a time"));
            }
            text_to_pdf(&String::from_utf8_lossy(first_bytes), fonts)?
        }
        SourceKind::Image => {
            for (name, _) in &files[1..] {
                if SourceKind::from_file_name(name)? != SourceKind::Image {
                    return Err(Error::validation(format!(
                        "'{name}' is not an image; images cannot be mixed with other files"
                    )));
                }
            }
            let images: Vec<&[u8]> = files.iter().map(|(_, bytes)| bytes.as_slice()).collect();
            images_to_pdf(&images, fonts)?
        }
    };

    let bytes = document::save(&mut doc)?;
    Ok(Artifact::new(format!("{}.pdf", file_stem(first_name)), bytes))
}

/// Check that every file is of the kind the client declared
pub fn expect_source_kind(files: &[(String, Vec<u8>)], declared: SourceKind) -> Result<()> {
    for (name, _) in files {
        if SourceKind::from_file_name(name)? != declared {
            let expected = match declared {
                SourceKind::Text => "a .txt file",
                SourceKind::Image => "png or jpg images",
            };
            return Err(Error::validation(format!("'{name}' does not match the source format, expected {expected}")));
        }
    }
    Ok(())
}

/// File name without directories or extension, never empty
pub fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document")
        .to_string()
}
