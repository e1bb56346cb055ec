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

//! Apply an operation to our named hierarchy and, on the legacy layouts,
//! to each controller hierarchy as well. Only the named hierarchy decides
//! the result, the controller hierarchies are best effort.
use crate::context::{CgContext, CgMode};
use crate::controller::{CgController, CgMask};
use crate::error::*;
use crate::migrate::{cg_migrate_recursive, cg_migrate_recursive_fallback};
use crate::tree::{cg_attach, cg_attach_fallback, cg_create, cg_trim};
use crate::CgFlags;
use basic::path_util::path_equal;
use nix::unistd::Pid;

/// Create the cgroup in the named hierarchy and in the controllers of
/// mask. The cgroup is trimmed from the supported controllers outside of
/// mask. Return whether the cgroup was created in the named hierarchy.
pub fn cg_create_everywhere(
    ctx: &CgContext,
    supported: CgMask,
    mask: CgMask,
    path: &str,
) -> Result<bool> {
    let created = cg_create(ctx, ctx.hierarchy(), path)?;

    if ctx.mode() == CgMode::Unified {
        return Ok(created);
    }

    for c in supported.controllers() {
        if mask.contains(c.mask()) {
            if let Err(e) = cg_create(ctx, c.name(), path) {
                log::debug!("Failed to create {} in {}: {}", path, c, e);
            }
        } else if let Err(e) = cg_trim(ctx, c.name(), path, true) {
            log::debug!("Failed to trim {} in {}: {}", path, c, e);
        }
    }

    Ok(created)
}

/// Attach the process to the cgroup in the named hierarchy and each
/// supported controller. path_for may give another cgroup per controller.
pub fn cg_attach_everywhere<F>(
    ctx: &CgContext,
    supported: CgMask,
    path: &str,
    pid: Pid,
    path_for: F,
) -> Result<()>
where
    F: Fn(CgController) -> Option<String>,
{
    cg_attach(ctx, ctx.hierarchy(), path, pid)?;

    if ctx.mode() == CgMode::Unified {
        return Ok(());
    }

    for c in supported.controllers() {
        let p = path_for(c).unwrap_or_else(|| path.to_string());
        if let Err(e) = cg_attach_fallback(ctx, c.name(), &p, pid) {
            log::debug!("Failed to attach {} to {} in {}: {}", pid, p, c, e);
        }
    }

    Ok(())
}

/// cg_trim in the named hierarchy and each supported controller
pub fn cg_trim_everywhere(
    ctx: &CgContext,
    supported: CgMask,
    path: &str,
    delete_root: bool,
) -> Result<()> {
    cg_trim(ctx, ctx.hierarchy(), path, delete_root)?;

    if ctx.mode() == CgMode::Unified {
        return Ok(());
    }

    for c in supported.controllers() {
        if let Err(e) = cg_trim(ctx, c.name(), path, delete_root) {
            log::debug!("Failed to trim {} in {}: {}", path, c, e);
        }
    }

    Ok(())
}

/// Move the processes of `from` to `to` in the named hierarchy, then move
/// the processes of each controller hierarchy to what `to` holds now.
pub fn cg_migrate_everywhere<F>(
    ctx: &CgContext,
    supported: CgMask,
    from: &str,
    to: &str,
    path_for: F,
) -> Result<()>
where
    F: Fn(CgController) -> Option<String>,
{
    let hierarchy = ctx.hierarchy();

    if !path_equal(from, to) {
        cg_migrate_recursive(ctx, hierarchy, from, hierarchy, to, CgFlags::REMOVE)?;
    }

    if ctx.mode() == CgMode::Unified {
        return Ok(());
    }

    for c in supported.controllers() {
        let p = path_for(c).unwrap_or_else(|| to.to_string());
        let r = cg_migrate_recursive_fallback(ctx, hierarchy, to, c.name(), &p, CgFlags::empty());
        if let Err(e) = r {
            log::debug!("Failed to migrate {} to {} in {}: {}", to, p, c, e);
        }
    }

    Ok(())
}
