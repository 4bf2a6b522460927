//! Certificate artifact location and naming rules.
//!
//! Records store the PDF location relative to a configured artifact root.
//! Paths are checked before they are persisted and again before they are
//! opened, so no stored value can escape the root.

use std::path::{Component, Path, PathBuf};

use crate::error::CoreError;

/// MIME type of every certificate artifact.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Check that `relative` is a plain relative path with no `..`, root, or
/// drive components.
pub fn validate_relative_path(relative: &str) -> Result<(), CoreError> {
    let path = Path::new(relative);
    if relative.trim().is_empty() {
        return Err(CoreError::Validation("artifact_path must not be empty".into()));
    }
    let plain = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !plain {
        return Err(CoreError::Validation(
            "artifact_path must be relative to the artifact root".into(),
        ));
    }
    Ok(())
}

/// Join `relative` onto `root` after validating it.
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf, CoreError> {
    validate_relative_path(relative)?;
    Ok(root.join(relative))
}

/// Download filename for a certificate, e.g. `TC-2024-001.pdf`.
///
/// Anything other than ASCII alphanumerics, `-` and `_` becomes `_` so the
/// value is safe inside a quoted `Content-Disposition` parameter.
pub fn attachment_filename(tc_number: &str) -> String {
    let stem: String = tc_number
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "transfer-certificate.pdf".to_string()
    } else {
        format!("{stem}.pdf")
    }
}
