//! Error taxonomy for the store boundary.
//!
//! Three families show up here:
//!
//! - **structural**: `NotFound`, `AlreadyExists`, `NotEmpty`, `NotADirectory`,
//!   `IsADirectory`, `InvalidArgument`, `NameTooLong`, `NotPermitted`
//! - **resource**: `OutOfMemory`, `ValueTooLarge`
//! - **transfer**: `Fault` (nothing could be copied to or from the caller),
//!   `Io` (the store found itself in a state it cannot serve)
//!
//! Every variant maps onto exactly one POSIX error number via [`FsError::errno`]
//! so a host adapter can hand it back in its native convention.

use serde::{Deserialize, Serialize};

/// Errors returned by store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error, Serialize, Deserialize)]
pub enum FsError {
    #[error("no such entry")]
    NotFound,
    #[error("entry already exists")]
    AlreadyExists,
    #[error("directory not empty")]
    NotEmpty,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("out of memory")]
    OutOfMemory,
    #[error("value too large")]
    ValueTooLarge,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("file name too long")]
    NameTooLong,
    #[error("bad address")]
    Fault,
    #[error("I/O error")]
    Io,
    #[error("operation not permitted")]
    NotPermitted,
}

/// Result alias used throughout vtfs.
pub type FsResult<T> = Result<T, FsError>;

/// Linux errno values for the variants above.
pub mod errno {
    pub const EPERM: i32 = 1;
    pub const ENOENT: i32 = 2;
    pub const EIO: i32 = 5;
    pub const ENOMEM: i32 = 12;
    pub const EFAULT: i32 = 14;
    pub const EEXIST: i32 = 17;
    pub const ENOTDIR: i32 = 20;
    pub const EISDIR: i32 = 21;
    pub const EINVAL: i32 = 22;
    pub const EFBIG: i32 = 27;
    pub const ENAMETOOLONG: i32 = 36;
    pub const ENOTEMPTY: i32 = 39;
}

impl FsError {
    /// Positive errno for this error. Hosts that follow the kernel
    /// convention negate it on return.
    pub fn errno(self) -> i32 {
        match self {
            FsError::NotFound => errno::ENOENT,
            FsError::AlreadyExists => errno::EEXIST,
            FsError::NotEmpty => errno::ENOTEMPTY,
            FsError::NotADirectory => errno::ENOTDIR,
            FsError::IsADirectory => errno::EISDIR,
            FsError::OutOfMemory => errno::ENOMEM,
            FsError::ValueTooLarge => errno::EFBIG,
            FsError::InvalidArgument => errno::EINVAL,
            FsError::NameTooLong => errno::ENAMETOOLONG,
            FsError::Fault => errno::EFAULT,
            FsError::Io => errno::EIO,
            FsError::NotPermitted => errno::EPERM,
        }
    }

    /// Inverse of [`FsError::errno`].
    pub fn from_errno(code: i32) -> Option<Self> {
        let code = code.abs();
        let err = match code {
            errno::ENOENT => FsError::NotFound,
            errno::EEXIST => FsError::AlreadyExists,
            errno::ENOTEMPTY => FsError::NotEmpty,
            errno::ENOTDIR => FsError::NotADirectory,
            errno::EISDIR => FsError::IsADirectory,
            errno::ENOMEM => FsError::OutOfMemory,
            errno::EFBIG => FsError::ValueTooLarge,
            errno::EINVAL => FsError::InvalidArgument,
            errno::ENAMETOOLONG => FsError::NameTooLong,
            errno::EFAULT => FsError::Fault,
            errno::EIO => FsError::Io,
            errno::EPERM => FsError::NotPermitted,
            _ => return None,
        };
        Some(err)
    }

    /// Structural errors describe the shape of the tree, not a lack of
    /// resources. Callers usually surface them verbatim.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            FsError::NotFound
                | FsError::AlreadyExists
                | FsError::NotEmpty
                | FsError::NotADirectory
                | FsError::IsADirectory
                | FsError::InvalidArgument
                | FsError::NameTooLong
                | FsError::NotPermitted
        )
    }
}

impl From<FsError> for std::io::Error {
    fn from(err: FsError) -> Self {
        let kind = match err {
            FsError::NotFound => std::io::ErrorKind::NotFound,
            FsError::AlreadyExists => std::io::ErrorKind::AlreadyExists,
            FsError::NotEmpty => std::io::ErrorKind::DirectoryNotEmpty,
            FsError::NotADirectory => std::io::ErrorKind::NotADirectory,
            FsError::IsADirectory => std::io::ErrorKind::IsADirectory,
            FsError::OutOfMemory => std::io::ErrorKind::OutOfMemory,
            FsError::ValueTooLarge => std::io::ErrorKind::FileTooLarge,
            FsError::InvalidArgument | FsError::NameTooLong => std::io::ErrorKind::InvalidInput,
            FsError::NotPermitted => std::io::ErrorKind::PermissionDenied,
            FsError::Fault | FsError::Io => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::not_found(FsError::NotFound, 2)]
    #[case::exists(FsError::AlreadyExists, 17)]
    #[case::not_empty(FsError::NotEmpty, 39)]
    #[case::not_dir(FsError::NotADirectory, 20)]
    #[case::is_dir(FsError::IsADirectory, 21)]
    #[case::nomem(FsError::OutOfMemory, 12)]
    #[case::fbig(FsError::ValueTooLarge, 27)]
    #[case::inval(FsError::InvalidArgument, 22)]
    #[case::fault(FsError::Fault, 14)]
    #[case::perm(FsError::NotPermitted, 1)]
    fn errno_matches_linux(#[case] err: FsError, #[case] code: i32) {
        assert_eq!(err.errno(), code);
        assert_eq!(FsError::from_errno(-code), Some(err));
    }

    #[test]
    fn unknown_errno_is_none() {
        assert_eq!(FsError::from_errno(9999), None);
    }

    #[test]
    fn io_error_kind_conversion() {
        let err: std::io::Error = FsError::NotEmpty.into();
        assert_eq!(err.kind(), std::io::ErrorKind::DirectoryNotEmpty);
        assert_eq!(err.to_string(), "directory not empty");
    }

    #[test]
    fn structural_vs_resource() {
        assert!(FsError::NotEmpty.is_structural());
        assert!(!FsError::OutOfMemory.is_structural());
        assert!(!FsError::Fault.is_structural());
    }
}
