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

//! Map (controller, cgroup path, attribute) to filesystem paths, and find
//! the cgroup of a process.
use crate::context::{CgContext, CgMode, CG_UNIFIED_NAME};
use crate::controller::{cg_controller_is_valid, controller_normalize, CgController};
use crate::error::*;
use basic::format_proc_pid_path;
use basic::path_util::{path_simplify, path_startswith};
use nix::unistd::Pid;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

const ROOT_PATH_SUFFIXES: [&str; 3] = ["/init.scope", "/system.slice", "/system"];

pub(crate) fn check_no_parent(s: &str) -> Result<()> {
    if s.split('/').any(|c| c == "..") {
        return Err(Error::InvalidArgument {
            what: format!("path {} climbs up", s),
        });
    }
    Ok(())
}

fn join_simplified(parts: &[&str]) -> String {
    let parts: Vec<&str> = parts.iter().copied().filter(|p| !p.is_empty()).collect();
    path_simplify(&parts.join("/"))
}

/// The directory name of a controller hierarchy below the mount root.
pub(crate) fn controller_to_dirname(controller: &str) -> &str {
    controller_normalize(controller)
}

/// Build the path of `suffix` in the cgroup `path` of the `controller`
/// hierarchy.
///
/// Without a controller only `path/suffix` is returned. The result never
/// carries duplicated slashes, "." components or a trailing slash.
pub fn cg_get_path(
    ctx: &CgContext,
    controller: Option<&str>,
    path: &str,
    suffix: &str,
) -> Result<PathBuf> {
    check_no_parent(path)?;
    check_no_parent(suffix)?;

    let controller = match controller {
        None => {
            if path.is_empty() && suffix.is_empty() {
                return Err(Error::InvalidArgument {
                    what: "empty cgroup path".to_string(),
                });
            }
            return Ok(PathBuf::from(join_simplified(&[path, suffix])));
        }
        Some(c) => c,
    };

    if !cg_controller_is_valid(controller) {
        return Err(Error::InvalidArgument {
            what: format!("invalid controller {}", controller),
        });
    }

    let root = ctx.root().to_string_lossy();
    let full = if !ctx.is_unified_for(controller) {
        join_simplified(&[&root, controller_to_dirname(controller), path, suffix])
    } else if ctx.mode() == CgMode::Hybrid {
        join_simplified(&[&root, CG_UNIFIED_NAME, path, suffix])
    } else {
        join_simplified(&[&root, path, suffix])
    };

    Ok(PathBuf::from(full))
}

/// Same as cg_get_path, but make sure the controller is usable first.
pub fn cg_get_path_and_check(
    ctx: &CgContext,
    controller: &str,
    path: &str,
    suffix: &str,
) -> Result<PathBuf> {
    if !cg_controller_is_valid(controller) {
        return Err(Error::InvalidArgument {
            what: format!("invalid controller {}", controller),
        });
    }

    if ctx.mode() == CgMode::Unified {
        if !ctx.is_hierarchy(controller) {
            let c = CgController::from_name(controller_normalize(controller))
                .ok_or(Error::NotSupported)?;
            if !ctx.mask_supported()?.contains(c.mask()) {
                return Err(Error::NotSupported);
            }
        }
    } else {
        let mount = cg_get_path(ctx, Some(controller), "", "")?;
        if !mount.is_dir() {
            log::debug!("controller {} is not mounted at {:?}", controller, mount);
            return Err(Error::NotSupported);
        }
    }

    cg_get_path(ctx, Some(controller), path, suffix)
}

/// Return the cgroup path of the process in the hierarchy of the
/// controller, our named hierarchy by default. Pid 0 is the caller.
pub fn cg_pid_get_path(ctx: &CgContext, controller: Option<&str>, pid: Pid) -> Result<String> {
    let controller = controller.unwrap_or_else(|| ctx.hierarchy());
    if !cg_controller_is_valid(controller) {
        return Err(Error::InvalidArgument {
            what: format!("invalid controller {}", controller),
        });
    }

    let unified = ctx.is_unified_for(controller);
    let wanted = controller_normalize(controller);

    let path = format_proc_pid_path!(ctx.proc_root(), pid, "cgroup");
    let file = File::open(&path).map_err(|e| Error::from_io(e, &path))?;

    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| Error::from_io(e, &path))?;

        let mut fields = line.splitn(3, ':');
        let (id, list, cg) = match (fields.next(), fields.next(), fields.next()) {
            (Some(id), Some(list), Some(cg)) => (id, list, cg),
            _ => continue,
        };

        if unified {
            if id == "0" && list.is_empty() {
                return Ok(cg.to_string());
            }
            continue;
        }

        if list.split(',').any(|c| controller_normalize(c) == wanted) {
            return Ok(cg.to_string());
        }
    }

    Err(Error::NoController {
        controller: controller.to_string(),
    })
}

/// The cgroup our hierarchy is rooted at, derived from the cgroup of pid 1.
pub fn cg_get_root_path(ctx: &CgContext) -> Result<String> {
    let p = cg_pid_get_path(ctx, None, Pid::from_raw(1))?;

    for suffix in ROOT_PATH_SUFFIXES {
        if let Some(stripped) = p.strip_suffix(suffix) {
            if stripped.is_empty() {
                return Ok("/".to_string());
            }
            return Ok(stripped.to_string());
        }
    }

    Ok(p)
}

/// Make `path` relative to `root`, which is the root path of the hierarchy
/// when not given. A path outside of root is returned unchanged.
pub fn cg_shift_path(ctx: &CgContext, path: &str, root: Option<&str>) -> Result<String> {
    let root = match root {
        Some(r) => r.to_string(),
        None => cg_get_root_path(ctx)?,
    };

    if root.is_empty() || root == "/" {
        return Ok(path.to_string());
    }

    match path_startswith(path, &root) {
        Some(rest) => Ok(format!("/{}", rest)),
        None => Ok(path.to_string()),
    }
}

/// the cgroup of the process in our hierarchy, relative to root
pub fn cg_pid_get_path_shifted(ctx: &CgContext, pid: Pid, root: Option<&str>) -> Result<String> {
    let raw = cg_pid_get_path(ctx, None, pid)?;
    cg_shift_path(ctx, &raw, root)
}
