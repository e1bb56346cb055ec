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

//! Move all the processes of a cgroup to another one.
//!
//! The task list is read again until a pass finds nothing new, so the
//! processes forked while moving are caught too. Processes exiting in the
//! middle are not errors.
use crate::context::CgContext;
use crate::controller::controller_normalize;
use crate::error::*;
use crate::path::{cg_get_path, cg_get_path_and_check};
use crate::tree::{
    cg_create, cg_rmdir, cg_snapshot_pids, cg_subgroups, is_root_path, CGROUP_PROCS,
};
use crate::CgFlags;
use basic::path_util::path_prefixes;
use basic::process_util::is_kernel_thread;
use nix::libc;
use nix::unistd::Pid;
use std::collections::HashSet;

/// Move the processes of pfrom in the cfrom hierarchy into pto of the cto
/// hierarchy, the subgroups of pfrom are not touched.
///
/// Return true if any process was moved.
pub fn cg_migrate(
    ctx: &CgContext,
    cfrom: &str,
    pfrom: &str,
    cto: &str,
    pto: &str,
    flags: CgFlags,
) -> Result<bool> {
    cg_get_path(ctx, Some(cfrom), pfrom, CGROUP_PROCS)?;
    let to_procs = cg_get_path_and_check(ctx, cto, pto, CGROUP_PROCS)?;

    let ops = ctx.ops();
    let self_pid = ops.getpid();
    let from_root = is_root_path(pfrom);

    let mut done: HashSet<Pid> = HashSet::new();
    let mut first_err: Option<Error> = None;
    let mut moved = false;

    loop {
        let mut found = false;

        for pid in cg_snapshot_pids(ctx, cfrom, pfrom)? {
            if flags.contains(CgFlags::IGNORE_SELF) && pid == self_pid {
                continue;
            }

            if !done.insert(pid) {
                continue;
            }
            found = true;

            /* kernel threads can not be moved out of the root */
            if from_root && is_kernel_thread(ctx.proc_root(), pid) {
                continue;
            }

            match ops.attach(&to_procs, pid) {
                Ok(()) => {
                    log::debug!("Migrated {} from {}:{} to {}:{}", pid, cfrom, pfrom, cto, pto);
                    moved = true;
                }
                Err(e) if e.raw_os_error() == Some(libc::ESRCH) => {
                    log::debug!("Process {} exited while migrating", pid);
                }
                Err(e) => {
                    log::warn!("Failed to migrate {} to {:?}: {}", pid, to_procs, e);
                    first_err.get_or_insert(Error::from_io(e, &to_procs));
                }
            }
        }

        if !found {
            break;
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(moved),
    }
}

/// cg_migrate for pfrom and all its subgroups, the processes of the
/// subgroups also end up in pto. With REMOVE the drained source cgroups
/// are removed.
pub fn cg_migrate_recursive(
    ctx: &CgContext,
    cfrom: &str,
    pfrom: &str,
    cto: &str,
    pto: &str,
    flags: CgFlags,
) -> Result<bool> {
    let mut first_err: Option<Error> = None;

    let mut moved = match cg_migrate(ctx, cfrom, pfrom, cto, pto, flags) {
        Ok(v) => v,
        Err(e) if e.is_structural() => return Err(e),
        Err(e) => {
            first_err = Some(e);
            false
        }
    };

    match cg_subgroups(ctx, cfrom, pfrom) {
        Ok(subgroups) => {
            for sub in subgroups {
                match cg_migrate_recursive(ctx, cfrom, &sub, cto, pto, flags) {
                    Ok(v) => moved |= v,
                    Err(e) => {
                        first_err.get_or_insert(e);
                    }
                }
            }
        }
        Err(e) => {
            first_err.get_or_insert(e);
        }
    }

    if flags.contains(CgFlags::REMOVE) && !is_root_path(pfrom) {
        match cg_rmdir(ctx, cfrom, pfrom) {
            Ok(()) | Err(Error::NotFound { .. }) | Err(Error::Busy { .. }) => {}
            Err(e) => {
                first_err.get_or_insert(e);
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(moved),
    }
}

/// cg_migrate_recursive, and if that fails, make the destination exist in
/// the other controllers and then try the parents of pto.
pub fn cg_migrate_recursive_fallback(
    ctx: &CgContext,
    cfrom: &str,
    pfrom: &str,
    cto: &str,
    pto: &str,
    flags: CgFlags,
) -> Result<bool> {
    let err = match cg_migrate_recursive(ctx, cfrom, pfrom, cto, pto, flags) {
        Ok(v) => return Ok(v),
        Err(e) => e,
    };

    if err.is_structural() {
        return Err(err);
    }

    if matches!(err, Error::Busy { .. }) {
        match ctx.mask_supported() {
            Ok(mask) => {
                for c in mask.controllers() {
                    if c.name() == controller_normalize(cto) {
                        continue;
                    }
                    if let Err(e) = cg_create(ctx, c.name(), pto) {
                        log::debug!("Failed to create {} in {}: {}", pto, c, e);
                    }
                }
            }
            Err(e) => log::debug!("Failed to get the supported controllers: {}", e),
        }

        if let Ok(v) = cg_migrate_recursive(ctx, cfrom, pfrom, cto, pto, flags) {
            return Ok(v);
        }
    }

    for prefix in path_prefixes(pto) {
        if let Ok(v) = cg_migrate_recursive(ctx, cfrom, pfrom, cto, &prefix, flags) {
            log::debug!("Migrated {} to {} instead of {}: {}", pfrom, prefix, pto, err);
            return Ok(v);
        }
    }

    Err(err)
}
