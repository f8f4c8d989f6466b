//! Input resolution: validate a role-tagged document path.
//!
//! pdfium gives unhelpful crashes and errors on non-PDF input, so we check
//! existence, readability, and the `%PDF` magic bytes up front and attach
//! the document's role to every error. The role name ("Question Paper",
//! "Answer Sheet", "Model Answer Key") is what the user sees, not an
//! internal identifier.

use crate::document::{Document, DocumentRole};
use crate::error::EvalError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate a document path and produce a [`Document`] for the pipeline.
///
/// Checks, in order: the file exists, the process can open it, and it starts
/// with the `%PDF` magic bytes. Files shorter than four bytes fail the magic
/// check as not-a-PDF.
pub fn resolve_document(role: DocumentRole, path: &Path) -> Result<Document, EvalError> {
    if !path.exists() {
        return Err(EvalError::FileNotFound {
            role,
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            match f.read_exact(&mut magic) {
                Ok(()) if &magic == b"%PDF" => {}
                Ok(()) => {
                    return Err(EvalError::NotAPdf {
                        role,
                        path: path.to_path_buf(),
                        magic,
                    });
                }
                Err(_) => {
                    return Err(EvalError::NotAPdf {
                        role,
                        path: path.to_path_buf(),
                        magic: [0; 4],
                    });
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(EvalError::PermissionDenied {
                role,
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(EvalError::FileNotFound {
                role,
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Resolved {}: {}", role, path.display());

    Ok(Document {
        role,
        path: path.to_path_buf(),
        display_name: file_display_name(path),
    })
}

/// The file name shown in user-facing errors, falling back to the full path
/// when the path has no final component.
fn file_display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Validate an optional document slot: `None` stays `None`.
pub fn resolve_optional(
    role: DocumentRole,
    path: Option<&PathBuf>,
) -> Result<Option<Document>, EvalError> {
    path.map(|p| resolve_document(role, p)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_names_the_role() {
        let err = resolve_document(
            DocumentRole::QuestionPaper,
            Path::new("/definitely/not/here.pdf"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Question Paper"), "got: {err}");
    }

    #[test]
    fn non_pdf_content_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"<!DOCTYPE html><html></html>").unwrap();

        let err = resolve_document(DocumentRole::AnswerSheet, f.path()).unwrap_err();
        assert!(matches!(
            err,
            EvalError::NotAPdf {
                role: DocumentRole::AnswerSheet,
                ..
            }
        ));
    }

    #[test]
    fn truncated_file_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%P").unwrap();

        let err = resolve_document(DocumentRole::AnswerSheet, f.path()).unwrap_err();
        assert!(matches!(err, EvalError::NotAPdf { .. }));
    }

    #[test]
    fn pdf_magic_bytes_are_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n%fake body").unwrap();

        let doc = resolve_document(DocumentRole::QuestionPaper, f.path()).unwrap();
        assert_eq!(doc.role, DocumentRole::QuestionPaper);
        assert!(!doc.display_name.is_empty());
    }

    #[test]
    fn optional_slot_passes_none_through() {
        let resolved = resolve_optional(DocumentRole::ModelAnswerKey, None).unwrap();
        assert!(resolved.is_none());
    }
}
