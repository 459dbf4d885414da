//! Password protection

use std::collections::BTreeMap;
use std::sync::Arc;

use lopdf::encryption::crypt_filters::{Aes256CryptFilter, CryptFilter};
use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};
use lopdf::{Document, Object, ObjectId, Reader, StringFormat};
use tracing::debug;

use crate::error::{Error, Result};

/// Name of the single crypt filter used for strings and streams
const CRYPT_FILTER: &[u8] = b"StdCF";

/// Same length as `/Encrypt`, so xref offsets stay valid after masking
const MASKED_KEY: &[u8] = b"/NoCrypt";

/// Same length as `ObjStm`
const HIDDEN_OBJSTM: &[u8] = b"ObjStH";

/// Options for password-protecting a document
#[derive(Debug, Clone)]
pub struct EncryptOptions {
    /// Used as both the user and the owner password
    pub password: String,
    pub allow_printing: bool,
    pub allow_commenting: bool,
}

impl EncryptOptions {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            allow_printing: true,
            allow_commenting: true,
        }
    }
}

/// Encrypt every string and stream of the document in place with AES-256
/// (security handler revision 6).
///
/// Must run after all other changes: nothing may be added to the document
/// once it is encrypted.
pub fn encrypt(doc: &mut Document, options: &EncryptOptions) -> Result<()> {
    if options.password.is_empty() {
        return Err(Error::validation("A password is required to encrypt a PDF"));
    }
    if doc.is_encrypted() {
        return Err(Error::validation("PDF is already encrypted"));
    }
    ensure_document_id(doc);

    let mut permissions = Permissions::all();
    if !options.allow_printing {
        permissions.remove(Permissions::PRINTABLE);
    }
    if !options.allow_commenting {
        permissions.remove(Permissions::ANNOTABLE);
    }

    let file_key: [u8; 32] = rand::random();
    let aes: Arc<dyn CryptFilter> = Arc::new(Aes256CryptFilter);
    let state = EncryptionState::try_from(EncryptionVersion::V5 {
        encrypt_metadata: true,
        crypt_filters: BTreeMap::from([(CRYPT_FILTER.to_vec(), aes)]),
        file_encryption_key: &file_key,
        stream_filter: CRYPT_FILTER.to_vec(),
        string_filter: CRYPT_FILTER.to_vec(),
        owner_password: &options.password,
        user_password: &options.password,
        permissions,
    })
    .map_err(|e| Error::General(format!("cannot set up encryption: {e}")))?;
    doc.encrypt(&state)
        .map_err(|e| Error::General(format!("encryption failed: {e}")))?;

    debug!("document encrypted");
    Ok(())
}

/// Parse an encrypted file keeping every object in its encrypted form.
///
/// `Document::load_mem` only keeps the Encrypt dictionary of a file it
/// cannot open with the empty password, which leaves nothing to decrypt.
/// Masking the trailer's `/Encrypt` key makes the reader load the whole
/// object table; object streams are kept whole since their contents can
/// only be parsed after decryption.
pub fn load_encrypted(bytes: &[u8]) -> Result<Document> {
    let masked = mask_encrypt_key(bytes);
    let mut doc = Reader {
        buffer: &masked,
        document: Document::new(),
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    }
    .read(Some(hide_object_stream))?;

    let handler = doc
        .trailer
        .remove(&MASKED_KEY[1..])
        .ok_or_else(|| Error::validation("PDF is not encrypted"))?;
    doc.trailer.set("Encrypt", handler);

    for object in doc.objects.values_mut() {
        if let Object::Stream(stream) = object {
            if stream.dict.has_type(HIDDEN_OBJSTM) {
                stream.dict.set("Type", Object::Name(b"ObjStm".to_vec()));
            }
        }
    }
    debug!(objects = doc.objects.len(), "loaded encrypted document");
    Ok(doc)
}

/// Rename every `/Encrypt` name token
fn mask_encrypt_key(bytes: &[u8]) -> Vec<u8> {
    const KEY: &[u8] = b"/Encrypt";
    let mut masked = bytes.to_vec();
    let mut at = 0;
    while let Some(pos) = masked[at..].windows(KEY.len()).position(|w| w == KEY) {
        let start = at + pos;
        let end = start + KEY.len();
        let delimited = masked
            .get(end)
            .map_or(true, |b| b.is_ascii_whitespace() || b"()<>[]{}/%".contains(b));
        if delimited {
            masked[start..end].copy_from_slice(MASKED_KEY);
        }
        at = end;
    }
    masked
}

fn hide_object_stream(id: ObjectId, object: &mut Object) -> Option<(ObjectId, Object)> {
    if let Object::Stream(stream) = object {
        if stream.dict.has_type(b"ObjStm") {
            stream.dict.set("Type", Object::Name(HIDDEN_OBJSTM.to_vec()));
        }
    }
    Some((id, object.clone()))
}

/// Remove encryption using `password`.
///
/// `doc` must come from [`load_encrypted`]. Fails with
/// [`Error::NotEncrypted`] when there is nothing to remove and with
/// [`Error::WrongPassword`] when the password does not authenticate.
pub fn decrypt(doc: &mut Document, password: &str) -> Result<()> {
    if !doc.is_encrypted() {
        return Err(Error::NotEncrypted);
    }
    // lopdf drops the Encrypt dictionary and trailer entry on success
    doc.decrypt(password).map_err(|e| match e {
        lopdf::Error::Decryption(_) => Error::WrongPassword,
        other => Error::Pdf(other),
    })?;
    doc.encryption_state = None;

    debug!("document decrypted");
    Ok(())
}

/// The standard security handler derives keys from the first file ID
fn ensure_document_id(doc: &mut Document) {
    if doc.trailer.has(b"ID") {
        return;
    }
    let id = uuid::Uuid::new_v4().as_bytes().to_vec();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::write;
    use crate::pdf::testing::{page_text, sample_document};

    fn encrypted(password: &str) -> Vec<u8> {
        let mut doc = sample_document(2);
        encrypt(&mut doc, &EncryptOptions::new(password)).unwrap();
        write(&mut doc).unwrap()
    }

    #[test]
    fn test_encrypt_marks_document() {
        let bytes = encrypted("secret");
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.is_encrypted());
        assert!(doc.trailer.has(b"ID"));
    }

    #[test]
    fn test_uses_aes_256() {
        let doc = load_encrypted(&encrypted("secret")).unwrap();
        let handler = doc.get_encrypted().unwrap();
        assert_eq!(handler.get(b"V").unwrap().as_i64().unwrap(), 5);
        assert_eq!(handler.get(b"R").unwrap().as_i64().unwrap(), 6);
        let filters = handler.get(b"CF").unwrap().as_dict().unwrap();
        let std_cf = filters.get(CRYPT_FILTER).unwrap().as_dict().unwrap();
        assert_eq!(std_cf.get(b"CFM").unwrap().as_name().unwrap(), b"AESV3");
    }

    #[test]
    fn test_load_encrypted_keeps_every_object() {
        let bytes = encrypted("secret");
        assert!(Document::load_mem(&bytes).unwrap().get_pages().is_empty());

        let mut doc = load_encrypted(&bytes).unwrap();
        assert!(doc.is_encrypted());
        assert_eq!(doc.get_pages().len(), 2);

        decrypt(&mut doc, "secret").unwrap();
        assert!(!doc.is_encrypted());
        assert!(page_text(&doc, 2).contains("(Page 2)"));
    }

    #[test]
    fn test_mask_leaves_encrypt_metadata_alone() {
        let masked = mask_encrypt_key(b"<< /Encrypt 5 0 R /EncryptMetadata true /Encrypt>>");
        assert_eq!(masked, b"<< /NoCrypt 5 0 R /EncryptMetadata true /NoCrypt>>".to_vec());
    }

    #[test]
    fn test_empty_password_rejected() {
        let mut doc = sample_document(1);
        let result = encrypt(&mut doc, &EncryptOptions::new(""));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_decrypt_plain_document() {
        let mut doc = sample_document(1);
        assert!(matches!(decrypt(&mut doc, "anything"), Err(Error::NotEncrypted)));
    }

    #[test]
    fn test_decrypt_wrong_password() {
        let bytes = encrypted("secret");
        let mut doc = load_encrypted(&bytes).unwrap();
        assert!(matches!(decrypt(&mut doc, "not-the-password"), Err(Error::WrongPassword)));
        assert!(doc.is_encrypted());
    }
}
