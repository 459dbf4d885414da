//! Password protection of whole documents

use tracing::info;

use crate::error::{Error, Result};
use crate::pdf::document;
use crate::pdf::security::{self, EncryptOptions};

/// Encrypt a PDF with a password (AES-256, user and owner password equal)
pub fn encrypt(bytes: &[u8], options: &EncryptOptions) -> Result<Vec<u8>> {
    if document::is_encrypted(bytes)? {
        return Err(Error::validation("PDF is already encrypted"));
    }
    let mut doc = document::load(bytes)?;

    // Everything that rewrites objects must happen before encryption
    document::finalize(&mut doc);
    security::encrypt(&mut doc, options)?;
    info!(
        printing = options.allow_printing,
        commenting = options.allow_commenting,
        "encrypted {} pages",
        doc.get_pages().len()
    );
    document::write(&mut doc)
}

/// Remove the password from an encrypted PDF
pub fn decrypt(bytes: &[u8], password: &str) -> Result<Vec<u8>> {
    if !document::is_encrypted(bytes)? {
        return Err(Error::NotEncrypted);
    }
    let mut doc = security::load_encrypted(bytes)?;
    security::decrypt(&mut doc, password)?;
    info!("decrypted {} pages", doc.get_pages().len());
    document::save(&mut doc)
}
