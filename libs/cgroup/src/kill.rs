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

//! Signal all the processes of a cgroup.
use crate::context::CgContext;
use crate::error::*;
use crate::ops::ProcessOps;
use crate::path::cg_get_path;
use crate::tree::{cg_rmdir, cg_snapshot_pids, cg_subgroups, is_root_path};
use crate::CgFlags;
use basic::IN_SET;
use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use std::collections::HashSet;

/// Return false if the process was already gone.
fn kill_process(ops: &dyn ProcessOps, pid: Pid, signal: Signal, flags: CgFlags) -> Result<bool> {
    if flags.contains(CgFlags::SIGCONT) {
        if let Err(e) = ops.kill(pid, Signal::SIGCONT) {
            log::debug!("Failed to send SIGCONT to {}: {}", pid, e);
        }
    }

    match ops.kill(pid, signal) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(e) => {
            log::warn!("Failed to send {} to {}: {}", signal, pid, e);
            Err(Error::Nix { source: e })
        }
    }
}

/// Send the signal to every process in the cgroup that is not in pids, the
/// subgroups are not touched. Every process handled is added to pids, so a
/// process is never signalled twice with the same set. With REMOVE the
/// cgroup is removed after the sweep, failing to remove is not an error.
///
/// Return true if any process was signalled.
pub fn cg_kill(
    ctx: &CgContext,
    controller: &str,
    path: &str,
    signal: Signal,
    mut flags: CgFlags,
    pids: &mut HashSet<Pid>,
) -> Result<bool> {
    if IN_SET!(signal, Signal::SIGCONT, Signal::SIGKILL) {
        flags &= !CgFlags::SIGCONT;
    }

    let ops = ctx.ops();
    let self_pid = ops.getpid();

    let mut first_err: Option<Error> = None;
    let mut killed = false;

    loop {
        let mut found = false;

        for pid in cg_snapshot_pids(ctx, controller, path)? {
            if flags.contains(CgFlags::IGNORE_SELF) && pid == self_pid {
                continue;
            }

            if !pids.insert(pid) {
                continue;
            }
            found = true;

            log::debug!(
                "kill pid {} in cgroup {}:{} with signal {}",
                pid,
                controller,
                path,
                signal
            );
            match kill_process(ops, pid, signal, flags) {
                Ok(v) => killed |= v,
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        if !found {
            break;
        }
    }

    if flags.contains(CgFlags::REMOVE) && !is_root_path(path) {
        match cg_rmdir(ctx, controller, path) {
            Ok(()) | Err(Error::NotFound { .. }) => {}
            Err(e) => log::debug!("Failed to remove {}:{}: {}", controller, path, e),
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(killed),
    }
}

/// cg_kill for the cgroup and all its subgroups, deepest first. With REMOVE
/// each cgroup is removed after its processes were signalled.
pub fn cg_kill_recursive(
    ctx: &CgContext,
    controller: &str,
    path: &str,
    signal: Signal,
    flags: CgFlags,
    pids: &mut HashSet<Pid>,
) -> Result<bool> {
    cg_get_path(ctx, Some(controller), path, "")?;

    let mut first_err: Option<Error> = None;
    let mut killed = false;

    match cg_subgroups(ctx, controller, path) {
        Ok(subgroups) => {
            for sub in subgroups {
                match cg_kill_recursive(ctx, controller, &sub, signal, flags, pids) {
                    Ok(v) => killed |= v,
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

    match cg_kill(ctx, controller, path, signal, flags, pids) {
        Ok(v) => killed |= v,
        Err(e) => {
            first_err.get_or_insert(e);
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(killed),
    }
}
