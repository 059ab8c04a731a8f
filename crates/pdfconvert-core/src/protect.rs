//! Password protection with the standard security handler
//!
//! Revision 3, 128-bit RC4 (PDF 1.4). The key derivation follows the
//! PDF reference algorithms: 2 (file key), 3 (owner entry `/O`) and
//! 5 (user entry `/U`).

use std::time::{SystemTime, UNIX_EPOCH};

use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};
use md5::{Digest, Md5};
use serde::Deserialize;
use tracing::debug;

use crate::document::{load_pdf, save_pdf};
use crate::error::ConvertError;

const PADDING: &[u8; 32] = b"\x28\xBF\x4E\x5E\x4E\x75\x8A\x41\
                              \x64\x00\x4E\x56\xFF\xFA\x01\x08\
                              \x2E\x2E\x00\xB6\xD0\x68\x3E\x80\
                              \x2F\x0C\xA9\xFE\x64\x53\x69\x7A";

const REVISION: i64 = 3;
const KEY_LENGTH: usize = 16;

/// 128-bit keys were introduced with PDF 1.4
const MIN_VERSION: &str = "1.4";

/// Bits 7-8 and 13-32 are reserved and must be set
const PERMISSION_BASE: u32 = 0xFFFF_F0C0;

/// What a reader may do after opening with the user password
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Permissions {
    pub printing: bool,
    pub modifying: bool,
    pub copying: bool,
    pub annotating: bool,
    pub filling_forms: bool,
    pub accessibility: bool,
    pub assembly: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            printing: false,
            modifying: false,
            copying: false,
            annotating: false,
            filling_forms: true,
            accessibility: true,
            assembly: false,
        }
    }
}

impl Permissions {
    /// The `/P` value
    pub fn bits(&self) -> i32 {
        let mut bits = PERMISSION_BASE;
        if self.printing {
            // print, at full quality
            bits |= 4 | 2048;
        }
        if self.modifying {
            bits |= 8;
        }
        if self.copying {
            bits |= 16;
        }
        if self.annotating {
            bits |= 32;
        }
        if self.filling_forms {
            bits |= 256;
        }
        if self.accessibility {
            bits |= 512;
        }
        if self.assembly {
            bits |= 1024;
        }
        bits as i32
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProtectOptions {
    /// Required to open the document
    pub user_password: String,
    /// Grants full access; the user password when absent or empty
    pub owner_password: Option<String>,
    pub permissions: Permissions,
}

impl ProtectOptions {
    pub fn new(user_password: impl Into<String>) -> Self {
        Self {
            user_password: user_password.into(),
            ..Default::default()
        }
    }

    fn owner_password(&self) -> &str {
        self.owner_password
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.user_password)
    }
}

/// Encrypt a PDF so it needs `options.user_password` to open
pub fn protect_pdf(bytes: &[u8], options: &ProtectOptions) -> Result<Vec<u8>, ConvertError> {
    let mut doc = load_pdf(bytes)?;

    // Streams are compressed first: readers decrypt before decoding filters
    doc.compress();
    encrypt_document(&mut doc, options)?;
    raise_version(&mut doc);

    save_pdf(&mut doc)
}

fn raise_version(doc: &mut Document) {
    let current = doc.version.trim().parse::<f32>().unwrap_or(0.0);
    if current < 1.4 {
        debug!("Raising PDF version from {} to {}", doc.version, MIN_VERSION);
        doc.version = MIN_VERSION.to_string();
    }
}

/// Encrypt every string and stream of `doc` in place and install the
/// `/Encrypt` dictionary. The document must not be compressed afterwards.
pub fn encrypt_document(doc: &mut Document, options: &ProtectOptions) -> Result<(), ConvertError> {
    apply_encryption(doc, options).map(|_| ())
}

/// Returns the file encryption key
fn apply_encryption(doc: &mut Document, options: &ProtectOptions) -> Result<Vec<u8>, ConvertError> {
    if options.user_password.is_empty() {
        return Err(ConvertError::InvalidRequest(
            "User password is required".into(),
        ));
    }
    if doc.trailer.has(b"Encrypt") {
        return Err(ConvertError::InvalidRequest(
            "Document is already encrypted".into(),
        ));
    }

    let file_id = ensure_file_id(doc);
    let permissions = options.permissions.bits();
    let user_password = options.user_password.as_bytes();

    let owner_entry = compute_owner_entry(options.owner_password().as_bytes(), user_password);
    let key = compute_file_key(user_password, &owner_entry, permissions, &file_id);
    let user_entry = compute_user_entry(&key, &file_id);

    let mut encrypted = 0usize;
    for (&id, object) in doc.objects.iter_mut() {
        if is_exempt(object) {
            continue;
        }
        encrypt_object(object, &object_key(&key, id));
        encrypted += 1;
    }

    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 2,
        "R" => REVISION,
        "Length" => (KEY_LENGTH * 8) as i64,
        "O" => Object::String(owner_entry, StringFormat::Hexadecimal),
        "U" => Object::String(user_entry, StringFormat::Hexadecimal),
        "P" => permissions as i64,
    });
    doc.trailer.set("Encrypt", encrypt_id);

    debug!("Encrypted {} objects (P={})", encrypted, permissions);
    Ok(key)
}

/// Cross-reference and object streams are never encrypted
fn is_exempt(object: &Object) -> bool {
    match object {
        Object::Stream(stream) => matches!(
            stream.dict.get(b"Type").and_then(Object::as_name),
            Ok(b"XRef") | Ok(b"ObjStm")
        ),
        _ => false,
    }
}

fn encrypt_object(object: &mut Object, key: &[u8]) {
    match object {
        Object::String(bytes, format) => {
            *bytes = rc4_crypt(key, bytes);
            *format = StringFormat::Hexadecimal;
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                encrypt_object(item, key);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                encrypt_object(value, key);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                encrypt_object(value, key);
            }
            let content = rc4_crypt(key, &stream.content);
            stream.set_content(content);
        }
        _ => {}
    }
}

/// First element of the trailer `/ID`, creating the array when missing
fn ensure_file_id(doc: &mut Document) -> Vec<u8> {
    let existing = doc
        .trailer
        .get(b"ID")
        .and_then(Object::as_array)
        .ok()
        .and_then(|ids| ids.first())
        .and_then(|id| id.as_str().ok())
        .map(<[u8]>::to_vec);

    if let Some(id) = existing {
        return id;
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut hasher = Md5::new();
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    hasher.update(nanos.to_le_bytes());
    let id = hasher.finalize().to_vec();

    doc.trailer.set(
        "ID",
        vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id.clone(), StringFormat::Hexadecimal),
        ],
    );
    id
}

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PADDING[..32 - len]);
    padded
}

/// Algorithm 3
fn compute_owner_entry(owner_password: &[u8], user_password: &[u8]) -> Vec<u8> {
    let mut hash = Md5::digest(pad_password(owner_password)).to_vec();
    for _ in 0..50 {
        hash = Md5::digest(&hash[..KEY_LENGTH]).to_vec();
    }
    let rc4_key = &hash[..KEY_LENGTH];

    let mut result = rc4_crypt(rc4_key, &pad_password(user_password));
    for i in 1..=19u8 {
        let round_key: Vec<u8> = rc4_key.iter().map(|b| b ^ i).collect();
        result = rc4_crypt(&round_key, &result);
    }
    result
}

/// Algorithm 2
fn compute_file_key(
    user_password: &[u8],
    owner_entry: &[u8],
    permissions: i32,
    file_id: &[u8],
) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(pad_password(user_password));
    hasher.update(owner_entry);
    hasher.update(permissions.to_le_bytes());
    hasher.update(file_id);
    let mut hash = hasher.finalize().to_vec();

    for _ in 0..50 {
        hash = Md5::digest(&hash[..KEY_LENGTH]).to_vec();
    }
    hash.truncate(KEY_LENGTH);
    hash
}

/// Algorithm 5
fn compute_user_entry(key: &[u8], file_id: &[u8]) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(PADDING);
    hasher.update(file_id);
    let mut hash = rc4_crypt(key, &hasher.finalize());

    for i in 1..=19u8 {
        let round_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
        hash = rc4_crypt(&round_key, &hash);
    }
    hash.extend_from_slice(&PADDING[..16]);
    hash
}

/// Per-object key (Algorithm 1)
fn object_key(key: &[u8], (number, generation): ObjectId) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(key);
    hasher.update(&number.to_le_bytes()[..3]);
    hasher.update(&generation.to_le_bytes()[..2]);
    let hash = hasher.finalize();
    hash[..(key.len() + 5).min(16)].to_vec()
}

struct Rc4 {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    fn new(key: &[u8]) -> Self {
        let mut s = [0u8; 256];
        for (i, val) in s.iter_mut().enumerate() {
            *val = i as u8;
        }

        let mut j = 0u8;
        for i in 0..256 {
            j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }

        Self { s, i: 0, j: 0 }
    }

    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.s[self.i as usize]);
        self.s.swap(self.i as usize, self.j as usize);
        let k = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
        self.s[k as usize]
    }
}

/// RC4 is symmetric: the same call encrypts and decrypts
fn rc4_crypt(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut cipher = Rc4::new(key);
    data.iter().map(|b| b ^ cipher.next_byte()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_pdf;
    use pretty_assertions::assert_eq;

    fn first_content_stream(doc: &Document) -> (ObjectId, Vec<u8>) {
        let page_id = doc.get_pages()[&1];
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let content_id = page.get(b"Contents").unwrap().as_reference().unwrap();
        let stream = doc.get_object(content_id).unwrap().as_stream().unwrap();
        (content_id, stream.content.clone())
    }

    #[test]
    fn test_rc4_known_vector() {
        let encrypted = rc4_crypt(b"Key", b"Plaintext");
        assert_eq!(
            encrypted,
            vec![0xBB, 0xF3, 0x16, 0xE8, 0xD9, 0x40, 0xAF, 0x0A, 0xD3]
        );
        assert_eq!(rc4_crypt(b"Key", &encrypted), b"Plaintext".to_vec());
    }

    #[test]
    fn test_pad_password() {
        let padded = pad_password(b"test");
        assert_eq!(&padded[..4], b"test");
        assert_eq!(&padded[4..], &PADDING[..28]);
        assert_eq!(pad_password(b""), *PADDING);
    }

    #[test]
    fn test_default_permissions() {
        let bits = Permissions::default().bits() as u32;
        assert_eq!(bits & 256, 256);
        assert_eq!(bits & 512, 512);
        assert_eq!(bits & (4 | 8 | 16 | 32 | 1024 | 2048), 0);
        assert_eq!(bits & 0b11, 0);
        assert!(Permissions::default().bits() < 0);
    }

    #[test]
    fn test_printing_sets_both_print_bits() {
        let permissions = Permissions {
            printing: true,
            ..Default::default()
        };
        assert_eq!(permissions.bits() as u32 & (4 | 2048), 4 | 2048);
    }

    #[test]
    fn test_owner_password_defaults_to_user_password() {
        let mut options = ProtectOptions::new("secret");
        assert_eq!(options.owner_password(), "secret");
        options.owner_password = Some(String::new());
        assert_eq!(options.owner_password(), "secret");
        options.owner_password = Some("boss".into());
        assert_eq!(options.owner_password(), "boss");
    }

    #[test]
    fn test_user_entry_matches_recomputed_key() {
        let mut doc = Document::load_mem(&sample_pdf(1, "Secret")).unwrap();
        let key = apply_encryption(&mut doc, &ProtectOptions::new("open-sesame")).unwrap();

        let encrypt_id = doc.trailer.get(b"Encrypt").unwrap().as_reference().unwrap();
        let encrypt = doc.get_object(encrypt_id).unwrap().as_dict().unwrap();
        let owner_entry = encrypt.get(b"O").unwrap().as_str().unwrap();
        let user_entry = encrypt.get(b"U").unwrap().as_str().unwrap();
        let permissions = encrypt.get(b"P").unwrap().as_i64().unwrap() as i32;
        let file_id = doc.trailer.get(b"ID").unwrap().as_array().unwrap()[0]
            .as_str()
            .unwrap()
            .to_vec();

        // A reader deriving the key from the stored entries gets the same key
        let derived = compute_file_key(b"open-sesame", owner_entry, permissions, &file_id);
        assert_eq!(derived, key);
        assert_eq!(owner_entry.len(), 32);
        assert_eq!(user_entry.len(), 32);
        assert_eq!(&user_entry[..16], &compute_user_entry(&derived, &file_id)[..16]);

        let wrong = compute_file_key(b"guess", owner_entry, permissions, &file_id);
        assert_ne!(&user_entry[..16], &compute_user_entry(&wrong, &file_id)[..16]);
    }

    #[test]
    fn test_streams_decrypt_with_object_key() {
        let mut doc = Document::load_mem(&sample_pdf(1, "Secret")).unwrap();
        let (content_id, original) = first_content_stream(&doc);

        let key = apply_encryption(&mut doc, &ProtectOptions::new("pw")).unwrap();
        let (_, encrypted) = first_content_stream(&doc);

        assert_ne!(encrypted, original);
        assert_eq!(rc4_crypt(&object_key(&key, content_id), &encrypted), original);
    }

    #[test]
    fn test_rejects_empty_user_password() {
        let mut doc = Document::load_mem(&sample_pdf(1, "A")).unwrap();
        let result = encrypt_document(&mut doc, &ProtectOptions::default());
        assert!(matches!(result, Err(ConvertError::InvalidRequest(_))));
    }

    #[test]
    fn test_rejects_already_encrypted_document() {
        let mut doc = Document::load_mem(&sample_pdf(1, "A")).unwrap();
        encrypt_document(&mut doc, &ProtectOptions::new("pw")).unwrap();
        let again = encrypt_document(&mut doc, &ProtectOptions::new("pw"));
        assert!(matches!(again, Err(ConvertError::InvalidRequest(_))));
    }

    #[test]
    fn test_protect_pdf_writes_encrypt_dictionary() {
        let bytes = protect_pdf(&sample_pdf(2, "Doc"), &ProtectOptions::new("pw")).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));

        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Encrypt"));
        assert!(text.contains("/Standard"));
        assert!(!text.contains("Doc-Page-1"));
    }

    #[test]
    fn test_protect_pdf_raises_old_versions_to_1_4() {
        let mut doc = Document::load_mem(&sample_pdf(1, "Old")).unwrap();
        doc.version = "1.3".into();
        let mut old = Vec::new();
        doc.save_to(&mut old).unwrap();

        let bytes = protect_pdf(&old, &ProtectOptions::new("pw")).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));

        let newer = protect_pdf(&sample_pdf(1, "New"), &ProtectOptions::new("pw")).unwrap();
        assert!(newer.starts_with(b"%PDF-1.7"));
    }
}
