//! Multipart form parsing

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use tracing::debug;

use super::error::ApiError;
use crate::error::{Error, Result};

/// An uploaded file
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Accept only files that claim to be PDFs
    pub fn require_pdf(&self) -> Result<()> {
        let by_name = self.file_name.to_ascii_lowercase().ends_with(".pdf");
        let by_type = self.content_type.as_deref() == Some("application/pdf");
        if by_name || by_type {
            Ok(())
        } else {
            Err(Error::validation(format!(
                "Only PDF files are supported, got '{}'",
                self.file_name
            )))
        }
    }
}

/// All fields of a multipart request, read up front
#[derive(Debug, Default)]
pub struct UploadForm {
    files: Vec<(String, Upload)>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> std::result::Result<Self, ApiError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, "upload"))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| multipart_error(e, "file data"))?;
                    debug!("received file field '{}': {} ({} bytes)", name, file_name, bytes.len());
                    form.files.push((
                        name,
                        Upload {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    ));
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| multipart_error(e, &format!("field '{name}'")))?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    /// Take the first file sent under `name`
    pub fn file(&mut self, name: &str) -> Result<Upload> {
        let index = self
            .files
            .iter()
            .position(|(field, _)| field == name)
            .ok_or_else(|| Error::validation(format!("Missing file field '{name}'")))?;
        Ok(self.files.remove(index).1)
    }

    /// Take every file sent under `name`, in upload order
    pub fn files(&mut self, name: &str) -> Vec<Upload> {
        let (taken, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(field, _)| field == name);
        self.files = rest;
        taken.into_iter().map(|(_, upload)| upload).collect()
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| Error::validation(format!("Missing field '{name}'")))
    }

    pub fn text_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.fields.get(name).map(String::as_str).unwrap_or(default)
    }

    /// Parse an optional field, using `default` when it is absent or blank
    pub fn parse_or<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.fields.get(name).map(|v| v.trim()) {
            None | Some("") => Ok(default),
            Some(value) => value
                .parse()
                .map_err(|e| Error::validation(format!("Invalid value '{value}' for '{name}': {e}"))),
        }
    }

    /// HTML-form style boolean
    pub fn flag_or(&self, name: &str, default: bool) -> Result<bool> {
        match self.fields.get(name).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) => match v.as_str() {
                "" => Ok(default),
                "true" | "1" | "on" | "yes" => Ok(true),
                "false" | "0" | "off" | "no" => Ok(false),
                _ => Err(Error::validation(format!("Invalid boolean '{v}' for '{name}'"))),
            },
        }
    }
}

/// Keep the status axum chose, so an oversized body stays a 413
fn multipart_error(err: MultipartError, what: &str) -> ApiError {
    let status = err.status();
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "payload_too_large"
    } else {
        "validation_error"
    };
    ApiError::new(status, code, format!("Failed to read {what}: {}", err.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> UploadForm {
        UploadForm {
            files: Vec::new(),
            fields: fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    fn upload(name: &str) -> Upload {
        Upload {
            file_name: name.to_string(),
            content_type: None,
            bytes: Vec::new(),
        }
    }

    #[test]
    fn test_fields() {
        let f = form(&[("angle", "180"), ("bold", "TRUE"), ("opacity", "")]);
        assert_eq!(f.parse_or("angle", 90i64).unwrap(), 180);
        assert_eq!(f.parse_or("opacity", 0.5f32).unwrap(), 0.5);
        assert!(f.flag_or("bold", false).unwrap());
        assert!(f.flag_or("missing", true).unwrap());
        assert!(matches!(f.text("pages"), Err(Error::Validation(_))));
        assert!(matches!(f.parse_or("bold", 1u8), Err(Error::Validation(_))));
    }

    #[test]
    fn test_files_by_field() {
        let mut f = UploadForm::default();
        f.files.push(("files".into(), upload("a.pdf")));
        f.files.push(("file".into(), upload("x.pdf")));
        f.files.push(("files".into(), upload("b.pdf")));

        let names: Vec<_> = f.files("files").into_iter().map(|u| u.file_name).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
        assert_eq!(f.file("file").unwrap().file_name, "x.pdf");
        assert!(f.file("file").is_err());
    }

    #[test]
    fn test_require_pdf() {
        assert!(upload("Report.PDF").require_pdf().is_ok());
        assert!(upload("notes.txt").require_pdf().is_err());
        let typed = Upload {
            content_type: Some("application/pdf".into()),
            ..upload("blob")
        };
        assert!(typed.require_pdf().is_ok());
    }
}
