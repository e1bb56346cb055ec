// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! Error define
use nix::errno::Errno;
use snafu::prelude::*;
#[allow(unused_imports)]
pub use snafu::ResultExt;
use std::path::Path;

/// cgroup Error
#[allow(missing_docs)]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("IoError: {}", source))]
    Io { source: std::io::Error },

    #[snafu(display("NixErrno: {}", source))]
    Nix { source: nix::errno::Errno },

    #[snafu(display("Basic: {}", source))]
    Basic { source: basic::Error },

    #[snafu(display("InvalidArgument: {}", what))]
    InvalidArgument { what: String },

    #[snafu(display("NotSupported"))]
    NotSupported,

    #[snafu(display("NotFound: {}", what))]
    NotFound { what: String },

    #[snafu(display("NoController: {}", controller))]
    NoController { controller: String },

    #[snafu(display("Busy: {}", path))]
    Busy { path: String },

    #[snafu(display("PermissionDenied: {}", what))]
    Permission { what: String },

    #[snafu(display("AlreadyExists: {}", what))]
    Exists { what: String },

    #[snafu(display("DataFormatError: {}", data))]
    DataFormat { data: String },
}

impl Error {
    /// classify an io error raised while operating on `path`
    pub fn from_io(source: std::io::Error, path: &Path) -> Self {
        let what = path.to_string_lossy().to_string();
        match source.raw_os_error().map(Errno::from_i32) {
            Some(errno) if basic::errno_is_vanished(errno) => Error::NotFound { what },
            Some(errno) if basic::errno_is_busy(errno) => Error::Busy { path: what },
            Some(errno) if basic::errno_is_privilege(errno) => Error::Permission { what },
            _ => Error::Io { source },
        }
    }

    /// the structural errors are raised before any work is done, retrying
    /// the same call can not help.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument { .. } | Error::NotSupported | Error::NoController { .. }
        )
    }

    /// Translate the cgroup error to error number.
    pub fn errno(&self) -> i32 {
        match self {
            Error::Io { source } => source.raw_os_error().unwrap_or(Errno::EIO as i32),
            Error::Nix { source } => *source as i32,
            Error::Basic { source } => source.get_errno(),
            Error::InvalidArgument { .. } => Errno::EINVAL as i32,
            Error::NotSupported => Errno::EOPNOTSUPP as i32,
            Error::NotFound { .. } => Errno::ENOENT as i32,
            Error::NoController { .. } => Errno::ENODATA as i32,
            Error::Busy { .. } => Errno::EBUSY as i32,
            Error::Permission { .. } => Errno::EACCES as i32,
            Error::Exists { .. } => Errno::EEXIST as i32,
            Error::DataFormat { .. } => Errno::EIO as i32,
        }
    }
}

/// new Result
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io() {
        let p = Path::new("/sys/fs/cgroup/cpu/a");
        let e = Error::from_io(std::io::Error::from_raw_os_error(nix::libc::ENOENT), p);
        assert!(matches!(e, Error::NotFound { .. }));
        let e = Error::from_io(std::io::Error::from_raw_os_error(nix::libc::ESRCH), p);
        assert!(matches!(e, Error::NotFound { .. }));
        let e = Error::from_io(std::io::Error::from_raw_os_error(nix::libc::EBUSY), p);
        assert!(matches!(e, Error::Busy { .. }));
        let e = Error::from_io(std::io::Error::from_raw_os_error(nix::libc::ENOTEMPTY), p);
        assert!(matches!(e, Error::Busy { .. }));
        let e = Error::from_io(std::io::Error::from_raw_os_error(nix::libc::EPERM), p);
        assert!(matches!(e, Error::Permission { .. }));
        let e = Error::from_io(std::io::Error::from_raw_os_error(nix::libc::EIO), p);
        assert!(matches!(e, Error::Io { .. }));
    }

    #[test]
    fn test_errno() {
        assert_eq!(Error::NotSupported.errno(), nix::libc::EOPNOTSUPP);
        assert_eq!(
            Error::Busy {
                path: "/a".to_string()
            }
            .errno(),
            nix::libc::EBUSY
        );
        assert!(Error::NotSupported.is_structural());
        assert!(!Error::Busy {
            path: "/a".to_string()
        }
        .is_structural());
    }
}
