//! Input validation: confirm the path names a readable PDF before pdfium
//! touches it, so callers get a clear error instead of a pdfium failure.

use crate::error::PaperShiftError;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Check that `path` exists, is readable and starts with `%PDF`.
///
/// Files shorter than four bytes are passed through; pdfium reports those.
pub fn validate_pdf(path: &Path) -> Result<(), PaperShiftError> {
    if !path.is_file() {
        return Err(PaperShiftError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PaperShiftError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(PaperShiftError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
        return Err(PaperShiftError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }

    debug!("Validated PDF input: {}", path.display());
    Ok(())
}
