//! Upload validation: file name, extension, size and content signature.
//!
//! The checks run in the order the API applies them so that the first
//! failing rule decides the error message the client sees.

use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// Number of leading bytes inspected when sniffing file content.
pub const SNIFF_LEN: usize = 2048;

const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";
const OLE2_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Binary signatures that can never be a CSV file, even with a `.csv` name.
const BINARY_SIGNATURES: &[&[u8]] = &[
    ZIP_SIGNATURE,
    OLE2_SIGNATURE,
    b"\x89PNG",
    b"\xFF\xD8\xFF",
    b"\x7FELF",
    b"\x1F\x8B",
];

/// Signatures spelled in printable ASCII. A CSV may legitimately start with
/// them, so they only count when the rest of the header is binary too.
const PRINTABLE_SIGNATURES: &[&[u8]] = &[b"%PDF", b"GIF8", b"MZ"];

/// Tabular formats the profiler can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Xlsx,
    Xls,
}

impl FileKind {
    /// Map a lower-case extension (without the dot) to a file kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            _ => None,
        }
    }

    /// Whether `header` carries the signature expected for this kind.
    pub fn matches_content(self, header: &[u8]) -> bool {
        match self {
            Self::Xlsx => header.starts_with(ZIP_SIGNATURE),
            Self::Xls => header.starts_with(OLE2_SIGNATURE),
            Self::Csv => looks_like_text(header),
        }
    }
}

/// Limits applied to every upload.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Lower-case extensions without the leading dot.
    pub allowed_extensions: Vec<String>,
    pub max_file_size_bytes: u64,
}

impl UploadPolicy {
    /// Human-readable size limit used in error messages (e.g. `10MB`).
    pub fn max_size_label(&self) -> String {
        const MB: u64 = 1024 * 1024;
        if self.max_file_size_bytes >= MB && self.max_file_size_bytes % MB == 0 {
            format!("{}MB", self.max_file_size_bytes / MB)
        } else {
            format!("{} bytes", self.max_file_size_bytes)
        }
    }

    /// Validate the extension of an already-sanitised file name.
    ///
    /// Returns the [`FileKind`] so callers know which reader to use later.
    pub fn check_extension(&self, filename: &str) -> Result<FileKind, CoreError> {
        let ext = extension_of(filename).unwrap_or_default();
        let allowed = self.allowed_extensions.iter().any(|a| *a == ext);

        match FileKind::from_extension(&ext) {
            Some(kind) if allowed => Ok(kind),
            _ => Err(CoreError::BadRequest(format!(
                "File type not allowed. Allowed types: {}",
                self.allowed_extensions.join(", ")
            ))),
        }
    }

    /// Reject sizes over the configured maximum.
    pub fn check_size(&self, size: u64) -> Result<(), CoreError> {
        if size > self.max_file_size_bytes {
            return Err(CoreError::BadRequest(format!(
                "File too large. Maximum size: {}",
                self.max_size_label()
            )));
        }
        Ok(())
    }
}

/// Reduce a client-supplied file name to a safe final path component.
///
/// Strips any directory part (either separator style) and rejects names
/// that are empty or consist only of dots.
pub fn sanitize_filename(raw: &str) -> Result<String, CoreError> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .trim_start_matches('.');

    if name.is_empty() || name.contains('\0') {
        return Err(CoreError::BadRequest("Filename is required".into()));
    }
    Ok(name.to_string())
}

/// Lower-case extension of `filename`, without the dot.
pub fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Check the leading bytes of an upload against its declared kind.
pub fn check_content(kind: FileKind, data: &[u8]) -> Result<(), CoreError> {
    if data.is_empty() {
        return Err(CoreError::BadRequest("File is empty".into()));
    }
    let header = &data[..data.len().min(SNIFF_LEN)];
    if !kind.matches_content(header) {
        return Err(CoreError::BadRequest(
            "File content doesn't match extension. Possible file corruption or security risk."
                .into(),
        ));
    }
    Ok(())
}

/// Heuristic text check: no NUL bytes, no known binary signature, and
/// mostly printable characters.
fn looks_like_text(header: &[u8]) -> bool {
    if header.contains(&0) || BINARY_SIGNATURES.iter().any(|sig| header.starts_with(sig)) {
        return false;
    }
    let control = header.iter().filter(|&&b| is_control(b)).count();
    if PRINTABLE_SIGNATURES.iter().any(|sig| header.starts_with(sig))
        && (control > 0 || !is_utf8_prefix(header))
    {
        return false;
    }
    control * 10 <= header.len()
}

fn is_control(byte: u8) -> bool {
    byte < 0x20 && !matches!(byte, b'\n' | b'\r' | b'\t' | 0x0C)
}

/// Valid UTF-8, allowing a multi-byte sequence cut off at the end.
fn is_utf8_prefix(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
