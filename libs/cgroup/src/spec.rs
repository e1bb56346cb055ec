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

//! "controller:path" specs, and mapping cgroup paths to login sessions
use crate::context::CgContext;
use crate::controller::{
    cg_controller_is_valid, cg_unescape, controller_normalize, CgController, NAMED_PREFIX,
};
use crate::error::*;
use crate::path::{cg_get_path, cg_pid_get_path_shifted, check_no_parent};
use basic::path_util::{path_is_absolute, path_is_safe, path_simplify, path_startswith};
use nix::unistd::Pid;
use std::fmt;
use std::path::PathBuf;

const UNIT_SUFFIXES: [&str; 3] = [".slice", ".scope", ".service"];

/// a parsed "controller:path" spec
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CgSpec {
    /// the controller, without the "name=" prefix
    pub controller: Option<String>,
    /// the controller was given as "name=..."
    pub named: bool,
    /// the simplified cgroup path
    pub path: Option<String>,
}

impl CgSpec {
    /// the controller as the hierarchy functions want it
    pub fn controller_name(&self) -> Option<String> {
        self.controller.as_ref().map(|c| {
            if self.named {
                format!("{}{}", NAMED_PREFIX, c)
            } else {
                c.clone()
            }
        })
    }
}

impl fmt::Display for CgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.controller_name(), &self.path) {
            (Some(c), Some(p)) => write!(f, "{}:{}", c, p),
            (Some(c), None) => write!(f, "{}", c),
            (None, Some(p)) => write!(f, "{}", p),
            (None, None) => Ok(()),
        }
    }
}

fn split_controller(controller: &str) -> Result<String> {
    let name = controller_normalize(controller);

    if !cg_controller_is_valid(controller)
        || (controller.starts_with(NAMED_PREFIX) && CgController::from_name(name).is_some())
    {
        return Err(Error::InvalidArgument {
            what: format!("invalid controller {}", controller),
        });
    }

    Ok(name.to_string())
}

fn split_path(path: &str) -> Result<String> {
    if !path_is_absolute(path) || !path_is_safe(path) {
        return Err(Error::InvalidArgument {
            what: format!("invalid cgroup path {}", path),
        });
    }

    Ok(path_simplify(path))
}

/// Split "controller:path", "controller" or "/path".
pub fn cg_split_spec(spec: &str) -> Result<CgSpec> {
    if spec.starts_with('/') {
        return Ok(CgSpec {
            controller: None,
            named: false,
            path: Some(split_path(spec)?),
        });
    }

    let (controller, path) = match spec.split_once(':') {
        Some((c, p)) => (c, p),
        None => (spec, ""),
    };

    let named = controller.starts_with(NAMED_PREFIX);
    let controller = split_controller(controller)?;
    let path = if path.is_empty() {
        None
    } else {
        Some(split_path(path)?)
    };

    Ok(CgSpec {
        controller: Some(controller),
        named,
        path,
    })
}

/// Turn a spec or an absolute path below the cgroup mount into the
/// filesystem path. Missing parts of a spec default to our named
/// hierarchy and "/".
pub fn cg_mangle_path(ctx: &CgContext, path: &str) -> Result<PathBuf> {
    let root = ctx.root().to_string_lossy();
    if path_startswith(path, &root).is_some() {
        check_no_parent(path)?;
        return Ok(PathBuf::from(path_simplify(path)));
    }

    let spec = cg_split_spec(path)?;
    let controller = spec
        .controller_name()
        .unwrap_or_else(|| ctx.hierarchy().to_string());
    let path = spec.path.as_deref().unwrap_or("/");

    cg_get_path(ctx, Some(&controller), path, "")
}

fn session_from_scope(component: &str) -> Option<&str> {
    let id = component
        .strip_prefix("session-")
        .and_then(|s| s.strip_suffix(".scope"))?;

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some(id)
}

/// Find the login session a cgroup path belongs to.
pub fn cg_path_get_session(path: &str) -> Result<String> {
    if let Some(id) = path.split('/').find_map(session_from_scope) {
        return Ok(id.to_string());
    }

    /* the flat layout: /<escaped session id>/... */
    let first = path.split('/').find(|c| !c.is_empty());
    if let Some(first) = first {
        if !UNIT_SUFFIXES.iter().any(|s| first.ends_with(s)) {
            let id = cg_unescape(first);
            if !id.is_empty() {
                return Ok(id.to_string());
            }
        }
    }

    Err(Error::NotFound {
        what: format!("session of {}", path),
    })
}

/// the login session of the process
pub fn cg_pid_get_session(ctx: &CgContext, pid: Pid) -> Result<String> {
    let path = cg_pid_get_path_shifted(ctx, pid, None)?;
    cg_path_get_session(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CgMode;
    use std::path::Path;

    #[test]
    fn test_split_spec() {
        assert_eq!(
            cg_split_spec("name=systemd:/user.slice/user-1000.slice").unwrap(),
            CgSpec {
                controller: Some("systemd".to_string()),
                named: true,
                path: Some("/user.slice/user-1000.slice".to_string()),
            }
        );
        assert_eq!(
            cg_split_spec("cpu:/a//b/").unwrap(),
            CgSpec {
                controller: Some("cpu".to_string()),
                named: false,
                path: Some("/a/b".to_string()),
            }
        );
        assert_eq!(
            cg_split_spec("/a//b").unwrap(),
            CgSpec {
                controller: None,
                named: false,
                path: Some("/a/b".to_string()),
            }
        );
        assert_eq!(
            cg_split_spec("memory").unwrap(),
            CgSpec {
                controller: Some("memory".to_string()),
                named: false,
                path: None,
            }
        );
        assert_eq!(cg_split_spec("cpu:").unwrap().path, None);
    }

    #[test]
    fn test_split_spec_invalid() {
        for spec in [
            "name=cpu:/a",
            "cpu:a/b",
            "cpu:/a/../b",
            "/a/./b",
            ":/a",
            "",
            "cpu,cpuacct:/a",
            "_foo:/a",
        ] {
            assert!(
                matches!(cg_split_spec(spec), Err(Error::InvalidArgument { .. })),
                "{}",
                spec
            );
        }
    }

    #[test]
    fn test_spec_display() {
        for spec in ["name=systemd:/a/b", "cpu:/x", "memory", "/a"] {
            assert_eq!(cg_split_spec(spec).unwrap().to_string(), spec);
        }
    }

    #[test]
    fn test_mangle_path() {
        let ctx = CgContext::builder()
            .root("/sys/fs/cgroup")
            .mode(CgMode::Legacy)
            .build()
            .unwrap();
        assert_eq!(
            cg_mangle_path(&ctx, "/sys/fs/cgroup//cpu/a/").unwrap(),
            Path::new("/sys/fs/cgroup/cpu/a")
        );
        assert_eq!(
            cg_mangle_path(&ctx, "cpu:/a").unwrap(),
            Path::new("/sys/fs/cgroup/cpu/a")
        );
        assert_eq!(
            cg_mangle_path(&ctx, "/user.slice").unwrap(),
            Path::new("/sys/fs/cgroup/systemd/user.slice")
        );
        assert_eq!(
            cg_mangle_path(&ctx, "memory").unwrap(),
            Path::new("/sys/fs/cgroup/memory")
        );
        assert!(cg_mangle_path(&ctx, "cpu:relative").is_err());

        assert!(matches!(
            cg_mangle_path(&ctx, "/sys/fs/cgroup/cpu/../../../etc"),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            cg_mangle_path(&ctx, "/sys/fs/cgroup/.."),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(cg_mangle_path(&ctx, "cpu:/a/../..").is_err());
    }

    #[test]
    fn test_path_get_session() {
        assert_eq!(
            cg_path_get_session("/user.slice/user-1000.slice/session-c2.scope").unwrap(),
            "c2"
        );
        assert_eq!(cg_path_get_session("/session-7.scope/x").unwrap(), "7");
        assert_eq!(cg_path_get_session("/3/foo").unwrap(), "3");
        assert_eq!(cg_path_get_session("/_tasks").unwrap(), "tasks");
        assert!(cg_path_get_session("/user.slice/user-1000.slice").is_err());
        assert!(cg_path_get_session("/init.scope").is_err());
        assert!(cg_path_get_session("/").is_err());
        assert!(cg_path_get_session("/session-a-b.scope").is_err());
    }

    #[test]
    fn test_pid_get_session() {
        let proc_root = tempfile::tempdir().unwrap();
        for (pid, content) in [
            (1, "0::/init.scope\n"),
            (42, "0::/user.slice/user-1000.slice/session-4.scope\n"),
            (43, "0::/system.slice/foo.service\n"),
        ] {
            let dir = proc_root.path().join(pid.to_string());
            std::fs::create_dir(&dir).unwrap();
            std::fs::write(dir.join("cgroup"), content).unwrap();
        }

        let ctx = CgContext::builder()
            .proc_root(proc_root.path())
            .mode(CgMode::Unified)
            .build()
            .unwrap();
        assert_eq!(cg_pid_get_session(&ctx, Pid::from_raw(42)).unwrap(), "4");
        assert!(matches!(
            cg_pid_get_session(&ctx, Pid::from_raw(43)),
            Err(Error::NotFound { .. })
        ));
    }
}
