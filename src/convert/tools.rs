//! External converters: poppler's `pdftoppm` and LibreOffice

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use super::{Artifact, Converter, TargetFormat};
use crate::error::{Error, Result};

/// Default rasterization resolution
pub const DEFAULT_DPI: u32 = 300;

/// Renders PDF pages to PNG or JPEG with `pdftoppm`
#[derive(Debug, Clone)]
pub struct Rasterizer {
    pub binary: PathBuf,
    pub dpi: u32,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("pdftoppm"),
            dpi: DEFAULT_DPI,
        }
    }
}

impl Converter for Rasterizer {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    fn convert(&self, input: &Path, target: TargetFormat, work_dir: &Path) -> Result<Vec<Artifact>> {
        let flag = match target {
            TargetFormat::Png => "-png",
            TargetFormat::Jpg => "-jpeg",
            TargetFormat::Docx => {
                return Err(Error::validation("pdftoppm only produces images"));
            }
        };
        let prefix = work_dir.join("page");

        let mut command = Command::new(&self.binary);
        command
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(flag)
            .arg(input)
            .arg(&prefix);
        run(self.name(), &mut command)?;

        // pdftoppm names pages page-1.png, or page-01.png with more pages
        let mut pages = Vec::new();
        for entry in fs::read_dir(work_dir)? {
            let path = entry?.path();
            if let Some(number) = page_number(&path, target.extension()) {
                pages.push((number, path));
            }
        }
        pages.sort();

        let artifacts = pages
            .into_iter()
            .map(|(number, path)| {
                let bytes = fs::read(&path)?;
                Ok(Artifact::new(format!("page_{number}.{}", target.extension()), bytes))
            })
            .collect::<Result<Vec<_>>>()?;
        info!("rasterized {} pages at {} dpi", artifacts.len(), self.dpi);
        Ok(artifacts)
    }
}

/// The page number in a `page-<n>.<ext>` file name
fn page_number(path: &Path, extension: &str) -> Option<u32> {
    if path.extension()?.to_str()? != extension {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix("page-")?.parse().ok()
}

/// Converts PDFs to DOCX with LibreOffice in headless mode
#[derive(Debug, Clone)]
pub struct OfficeRenderer {
    pub binary: PathBuf,
}

impl Default for OfficeRenderer {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(default_office_binary()),
        }
    }
}

/// Where LibreOffice usually lives on this platform
pub fn default_office_binary() -> &'static str {
    if cfg!(target_os = "macos") {
        "/Applications/LibreOffice.app/Contents/MacOS/soffice"
    } else if cfg!(target_os = "windows") {
        "soffice.exe"
    } else {
        "soffice"
    }
}

impl Converter for OfficeRenderer {
    fn name(&self) -> &str {
        "soffice"
    }

    fn convert(&self, input: &Path, target: TargetFormat, work_dir: &Path) -> Result<Vec<Artifact>> {
        if target != TargetFormat::Docx {
            return Err(Error::validation("LibreOffice conversion only produces docx"));
        }

        let mut command = Command::new(&self.binary);
        command
            .arg("--headless")
            .arg("--infilter=writer_pdf_import")
            .arg("--convert-to")
            .arg("docx")
            .arg("--outdir")
            .arg(work_dir)
            .arg(input);
        run(self.name(), &mut command)?;

        let stem = input
            .file_stem()
            .ok_or_else(|| Error::Conversion("input file has no name".to_string()))?;
        let name = format!("{}.docx", stem.to_string_lossy());
        let output = work_dir.join(&name);
        let bytes = fs::read(&output).map_err(|e| {
            Error::Conversion(format!("{} produced no output at {}: {e}", self.name(), output.display()))
        })?;
        info!("converted {} to docx", input.display());
        Ok(vec![Artifact::new(name, bytes)])
    }
}

/// Run a tool to completion; spawn failures and non-zero exits become
/// [`Error::Conversion`] carrying the tool's stderr.
fn run(tool: &str, command: &mut Command) -> Result<()> {
    debug!(?command, "running {}", tool);
    let output = command
        .output()
        .map_err(|e| Error::Conversion(format!("Failed to execute {tool}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Conversion(format!(
            "{tool} failed ({}): {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}
