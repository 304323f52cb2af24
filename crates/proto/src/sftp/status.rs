//! Provider error to STATUS code mapping.

use super::fs::{FsError, FsResult};
use super::types::StatusCode;

/// How provider errors are reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StatusMapping {
    /// OK, EOF, and FAILURE for everything else
    #[default]
    Coarse,
    /// Also reports NO_SUCH_FILE, PERMISSION_DENIED and OP_UNSUPPORTED
    Detailed,
}

impl StatusMapping {
    /// Maps a provider error to a status code.
    pub fn code_for(&self, err: &FsError) -> StatusCode {
        match (self, err) {
            (_, FsError::Eof) => StatusCode::Eof,
            (Self::Detailed, FsError::NotFound) => StatusCode::NoSuchFile,
            (Self::Detailed, FsError::PermissionDenied) => StatusCode::PermissionDenied,
            (Self::Detailed, FsError::Unsupported) => StatusCode::OpUnsupported,
            _ => StatusCode::Failure,
        }
    }

    /// Maps a provider result to a status code.
    pub fn code_for_result<T>(&self, result: &FsResult<T>) -> StatusCode {
        match result {
            Ok(_) => StatusCode::Ok,
            Err(e) => self.code_for(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_coarse_mapping() {
        let m = StatusMapping::Coarse;
        assert_eq!(m.code_for_result(&Ok::<(), FsError>(())), StatusCode::Ok);
        assert_eq!(m.code_for(&FsError::Eof), StatusCode::Eof);
        assert_eq!(m.code_for(&FsError::NotFound), StatusCode::Failure);
        assert_eq!(m.code_for(&FsError::PermissionDenied), StatusCode::Failure);
        assert_eq!(m.code_for(&FsError::Unsupported), StatusCode::Failure);
        assert_eq!(m.code_for(&FsError::TooManyOpenFiles), StatusCode::Failure);
        assert_eq!(
            m.code_for(&FsError::Io(io::Error::new(io::ErrorKind::Other, "x"))),
            StatusCode::Failure
        );
    }

    #[test]
    fn test_detailed_mapping() {
        let m = StatusMapping::Detailed;
        assert_eq!(m.code_for(&FsError::Eof), StatusCode::Eof);
        assert_eq!(m.code_for(&FsError::NotFound), StatusCode::NoSuchFile);
        assert_eq!(
            m.code_for(&FsError::PermissionDenied),
            StatusCode::PermissionDenied
        );
        assert_eq!(m.code_for(&FsError::Unsupported), StatusCode::OpUnsupported);
        assert_eq!(m.code_for(&FsError::TooManyOpenFiles), StatusCode::Failure);
        assert_eq!(
            m.code_for(&FsError::Other("x".to_string())),
            StatusCode::Failure
        );
    }

    #[test]
    fn test_default_is_coarse() {
        assert_eq!(StatusMapping::default(), StatusMapping::Coarse);
    }
}
