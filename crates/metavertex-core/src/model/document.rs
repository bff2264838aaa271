// Files attached to a product, and the checks applied before storing them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extensions accepted for upload, grouped as the submission form offers them.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[
    // documents
    "pdf", "doc", "docx", "txt", "rtf",
    // images
    "jpg", "jpeg", "png", "gif", "webp",
    // spreadsheets
    "xls", "xlsx", "csv",
    // presentations
    "ppt", "pptx",
    // archives
    "zip", "rar",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanResult {
    Clean,
    Threat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub product_id: String,
    pub uploader_id: String,
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub sha256: String,
    pub scan: ScanResult,
    pub uploaded_at: DateTime<Utc>,
}

/// Lowercased extension of `name`, if any.
pub fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn is_accepted(name: &str) -> bool {
    extension(name).is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
}

/// MIME type served back on download.
pub fn content_type_for(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("txt") => "text/plain",
        Some("rtf") => "application/rtf",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("csv") => "text/csv",
        Some("ppt") => "application/vnd.ms-powerpoint",
        Some("pptx") => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        Some("zip") => "application/zip",
        Some("rar") => "application/vnd.rar",
        _ => "application/octet-stream",
    }
}

/// Signature scan. Empty payloads and executable images are threats.
pub fn scan(bytes: &[u8]) -> ScanResult {
    const SIGNATURES: &[&[u8]] = &[
        b"MZ",               // PE / DOS
        b"\x7fELF",          // ELF
        b"\xcf\xfa\xed\xfe", // Mach-O 64
        b"\xce\xfa\xed\xfe", // Mach-O 32
        b"\xca\xfe\xba\xbe", // Mach-O fat / Java class
        b"#!",               // scripts
    ];
    if bytes.is_empty() || SIGNATURES.iter().any(|sig| bytes.starts_with(sig)) {
        ScanResult::Threat
    } else {
        ScanResult::Clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension("Deck.PPTX").as_deref(), Some("pptx"));
        assert_eq!(extension("archive.tar.zip").as_deref(), Some("zip"));
        assert_eq!(extension("README"), None);
        assert_eq!(extension(".pdf"), None);
        assert_eq!(extension("trailing."), None);
    }

    #[test]
    fn accepts_only_listed_types() {
        assert!(is_accepted("pitch.pdf"));
        assert!(is_accepted("financials.XLSX"));
        assert!(!is_accepted("installer.exe"));
        assert!(!is_accepted("script.sh"));
        assert!(!is_accepted("noext"));
    }

    #[test]
    fn scan_flags_executables_and_empty_files() {
        assert_eq!(scan(b""), ScanResult::Threat);
        assert_eq!(scan(b"MZ\x90\x00"), ScanResult::Threat);
        assert_eq!(scan(b"\x7fELF\x02\x01"), ScanResult::Threat);
        assert_eq!(scan(b"#!/bin/sh\nrm -rf /"), ScanResult::Threat);
        assert_eq!(scan(b"%PDF-1.7\n"), ScanResult::Clean);
        assert_eq!(scan(b"PK\x03\x04"), ScanResult::Clean);
    }

    #[test]
    fn content_type_falls_back_to_octet_stream() {
        assert_eq!(content_type_for("a.pdf"), "application/pdf");
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.bin"), "application/octet-stream");
    }
}
