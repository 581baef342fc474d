//! Output checks on a printed buffer.

use crate::generators::GeneratorError;

pub const PDF_SIGNATURE: &[u8] = b"%PDF";

/// Anything shorter cannot hold a header, one page object and a trailer.
pub const MIN_PDF_LEN: usize = 64;

/// Best-effort content sniffing for error messages.
pub fn sniff_content_type(data: &[u8]) -> Option<&'static str> {
    if data.len() < 4 {
        return None;
    }

    if data.starts_with(PDF_SIGNATURE) {
        return Some("application/pdf");
    }

    // PNG magic bytes
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return Some("image/png");
    }

    if data.starts_with(b"{") || data.starts_with(b"[") {
        return Some("application/json");
    }

    if data.starts_with(b"<?xml") || data.starts_with(b"<!DOCTYPE") || data.starts_with(b"<html") {
        return Some("text/html");
    }

    None
}

/// A printed buffer must start with `%PDF` and be at least
/// [`MIN_PDF_LEN`] bytes long.
pub fn validate_pdf(buffer: &[u8]) -> Result<(), GeneratorError> {
    if buffer.is_empty() {
        return Err(GeneratorError::OutputValidation("empty buffer".to_string()));
    }
    if !buffer.starts_with(PDF_SIGNATURE) {
        let seen = sniff_content_type(buffer).unwrap_or("unrecognised content");
        return Err(GeneratorError::OutputValidation(format!(
            "missing %PDF signature ({seen})"
        )));
    }
    if buffer.len() < MIN_PDF_LEN {
        return Err(GeneratorError::OutputValidation(format!(
            "buffer too short: {} bytes",
            buffer.len()
        )));
    }
    Ok(())
}
