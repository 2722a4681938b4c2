//! MIME type detection for survey files by extension.

use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Detect a MIME type from the file extension. Unknown extensions map to
/// `application/octet-stream`, which the analyzer rejects.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png"          => "image/png",
        "gif"          => "image/gif",
        "webp"         => "image/webp",
        "bmp"          => "image/bmp",
        "tiff" | "tif" => "image/tiff",
        "heic"         => "image/heic",

        "pdf"          => "application/pdf",

        "txt"          => "text/plain",
        "csv"          => "text/csv",
        "json"         => "application/json",
        "doc"          => "application/msword",
        "docx"         => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls"          => "application/vnd.ms-excel",
        "xlsx"         => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip"          => "application/zip",

        _              => OCTET_STREAM,
    }
}

/// The declared content type when it says something, else a guess from the name.
pub fn resolve_mime_type(declared: Option<&str>, file_name: &str) -> String {
    match declared.map(str::trim) {
        Some(mime) if !mime.is_empty() && !mime.eq_ignore_ascii_case(OCTET_STREAM) => {
            mime.to_ascii_lowercase()
        }
        _ => detect_mime_type(Path::new(file_name)).to_string(),
    }
}
