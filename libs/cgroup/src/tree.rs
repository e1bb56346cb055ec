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

//! Create, inspect and remove cgroup directories, and move single
//! processes into them.
use crate::context::CgContext;
use crate::error::*;
use crate::path::{cg_get_path, cg_get_path_and_check};
use basic::fs_util::{mkdir_p_safe, read_one_line, write_string_file};
use basic::path_util::{path_prefixes, path_simplify};
use nix::unistd::Pid;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use walkdir::WalkDir;

/// the file listing the processes of a cgroup
pub const CGROUP_PROCS: &str = "cgroup.procs";
/// the event file of a cgroup v2 directory
pub const CGROUP_EVENTS: &str = "cgroup.events";

const RELEASE_AGENT: &str = "release_agent";
const NOTIFY_ON_RELEASE: &str = "notify_on_release";
const RMDIR_BUSY_RETRIES: u32 = 10;

pub(crate) fn is_root_path(path: &str) -> bool {
    let p = path_simplify(path);
    p.is_empty() || p == "/"
}

/// Create the cgroup directory and its missing parents. Return true if the
/// directory was created by this call.
pub fn cg_create(ctx: &CgContext, controller: &str, path: &str) -> Result<bool> {
    let cg_path = cg_get_path_and_check(ctx, controller, path, "")?;

    let created = mkdir_p_safe(&cg_path, 0o755, None, None).context(BasicSnafu)?;
    if created {
        log::debug!("Created cgroup {:?}", cg_path);
    }

    Ok(created)
}

/// Move the process into the cgroup, pid 0 means the caller.
pub fn cg_attach(ctx: &CgContext, controller: &str, path: &str, pid: Pid) -> Result<()> {
    let procs = cg_get_path_and_check(ctx, controller, path, CGROUP_PROCS)?;

    let pid = if pid.as_raw() == 0 {
        ctx.ops().getpid()
    } else {
        pid
    };

    ctx.ops()
        .attach(&procs, pid)
        .map_err(|e| Error::from_io(e, &procs))?;

    log::debug!("Attached {} to {:?}", pid, procs);
    Ok(())
}

/// cg_attach, and if that fails try the parents of the cgroup up to the
/// root of the hierarchy.
pub fn cg_attach_fallback(
    ctx: &CgContext,
    controller: &str,
    path: &str,
    pid: Pid,
) -> Result<()> {
    let err = match cg_attach(ctx, controller, path, pid) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    if err.is_structural() {
        return Err(err);
    }

    for prefix in path_prefixes(path) {
        if cg_attach(ctx, controller, &prefix, pid).is_ok() {
            log::debug!("Attached {} to {} instead of {}: {}", pid, prefix, path, err);
            return Ok(());
        }
    }

    Err(err)
}

/// Create the cgroup and move the process in. Return whether the cgroup
/// was created.
pub fn cg_create_and_attach(
    ctx: &CgContext,
    controller: &str,
    path: &str,
    pid: Pid,
) -> Result<bool> {
    let created = cg_create(ctx, controller, path)?;
    cg_attach(ctx, controller, path, pid)?;
    Ok(created)
}

fn parse_pids(content: &str) -> Result<Vec<Pid>> {
    let mut pids = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let pid = line.parse::<i32>().map_err(|_| Error::DataFormat {
            data: line.to_string(),
        })?;
        if pid <= 0 {
            return Err(Error::DataFormat {
                data: line.to_string(),
            });
        }

        pids.push(Pid::from_raw(pid));
    }

    Ok(pids)
}

/// the processes in the cgroup, its subgroups are not included.
pub fn cg_get_pids(ctx: &CgContext, controller: &str, path: &str) -> Result<Vec<Pid>> {
    let procs = cg_get_path(ctx, Some(controller), path, CGROUP_PROCS)?;
    let content = fs::read_to_string(&procs).map_err(|e| Error::from_io(e, &procs))?;
    parse_pids(&content)
}

/// Same as cg_get_pids, a missing cgroup has no processes.
pub(crate) fn cg_snapshot_pids(
    ctx: &CgContext,
    controller: &str,
    path: &str,
) -> Result<Vec<Pid>> {
    match cg_get_pids(ctx, controller, path) {
        Err(Error::NotFound { .. }) => Ok(Vec::new()),
        r => r,
    }
}

fn dir_has_tasks(dir: &Path) -> bool {
    match fs::read_to_string(dir.join(CGROUP_PROCS)) {
        Ok(content) => content.lines().any(|l| !l.trim().is_empty()),
        Err(_) => false,
    }
}

/// The direct subgroups of the cgroup, as cgroup paths. A missing cgroup
/// has none.
pub fn cg_subgroups(ctx: &CgContext, controller: &str, path: &str) -> Result<Vec<String>> {
    let dir = cg_get_path(ctx, Some(controller), path, "")?;

    let read_dir = match fs::read_dir(&dir) {
        Ok(v) => v,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::from_io(e, &dir)),
    };

    let mut subgroups = Vec::new();
    for entry in read_dir {
        let entry = entry.context(IoSnafu)?;
        /* file_type does not follow symlinks */
        if !entry.file_type().context(IoSnafu)?.is_dir() {
            continue;
        }

        let name = entry.file_name();
        subgroups.push(path_simplify(&format!("{}/{}", path, name.to_string_lossy())));
    }

    subgroups.sort();
    Ok(subgroups)
}

/// Whether the cgroup has no processes. A missing cgroup is empty.
pub fn cg_is_empty(ctx: &CgContext, controller: &str, path: &str) -> Result<bool> {
    Ok(cg_snapshot_pids(ctx, controller, path)?.is_empty())
}

/// Return the value of the key in cgroup.events.
pub fn cg_read_event(
    ctx: &CgContext,
    controller: &str,
    path: &str,
    event: &str,
) -> Result<String> {
    let events_path = cg_get_path(ctx, Some(controller), path, CGROUP_EVENTS)?;
    let file = File::open(&events_path).map_err(|e| Error::from_io(e, &events_path))?;
    let reader = BufReader::new(file);

    for line in reader.lines() {
        let content = line.context(IoSnafu)?;
        let words: Vec<&str> = content.split_whitespace().collect();

        if words.len() != 2 || words[0] != event {
            continue;
        }

        return Ok(words[1].to_string());
    }

    Err(Error::NotFound {
        what: format!("{} in {:?}", event, events_path),
    })
}

/// Whether the cgroup and all its subgroups have no processes. The root of
/// the hierarchy is never empty.
pub fn cg_is_empty_recursive(ctx: &CgContext, controller: &str, path: &str) -> Result<bool> {
    if is_root_path(path) {
        return Ok(false);
    }

    if !cg_is_empty(ctx, controller, path)? {
        return Ok(false);
    }

    if ctx.is_unified_for(controller) {
        match cg_read_event(ctx, controller, path, "populated") {
            Ok(v) => return Ok(v == "0"),
            Err(Error::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
    }

    for sub in cg_subgroups(ctx, controller, path)? {
        if !cg_is_empty_recursive(ctx, controller, &sub)? {
            return Ok(false);
        }
    }

    Ok(true)
}

/* Sometimes there are still tasks in the cgroup, and rmdir will return
 * EBUSY, we wait 10 us for 10 times. */
pub(crate) fn remove_dir(cg_path: &Path) -> Result<()> {
    let mut try_times = 0;
    loop {
        let e = match fs::remove_dir(cg_path) {
            Ok(()) => {
                log::debug!("Successfully removed {:?}", cg_path);
                return Ok(());
            }
            Err(e) => e,
        };

        if e.raw_os_error() == Some(nix::libc::EBUSY) && try_times < RMDIR_BUSY_RETRIES {
            std::thread::sleep(std::time::Duration::from_micros(10));
            try_times += 1;
            continue;
        }

        return Err(Error::from_io(e, cg_path));
    }
}

/// Remove exactly one cgroup directory.
pub fn cg_rmdir(ctx: &CgContext, controller: &str, path: &str) -> Result<()> {
    if is_root_path(path) {
        return Err(Error::InvalidArgument {
            what: "refusing to remove the root cgroup".to_string(),
        });
    }

    let cg_path = cg_get_path(ctx, Some(controller), path, "")?;
    remove_dir(&cg_path)
}

fn ignore_trim_error(e: &Error) -> bool {
    matches!(e, Error::NotFound { .. } | Error::Busy { .. })
}

/// Remove the empty subgroups of the cgroup, children first. Cgroups with
/// processes, and so their parents, are kept. The cgroup itself is removed
/// only if delete_root is set.
pub fn cg_trim(ctx: &CgContext, controller: &str, path: &str, delete_root: bool) -> Result<()> {
    let root = cg_get_path(ctx, Some(controller), path, "")?;
    if !root.is_dir() {
        return Ok(());
    }

    let mut first_err: Option<Error> = None;

    let walker = WalkDir::new(&root)
        .min_depth(1)
        .contents_first(true)
        .same_file_system(true);
    for entry in walker {
        let entry = match entry {
            Ok(v) => v,
            Err(e) => {
                let p = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                let err = Error::from_io(e.into(), &p);
                if !ignore_trim_error(&err) {
                    log::warn!("Failed to walk {:?}: {}", p, err);
                    first_err.get_or_insert(err);
                }
                continue;
            }
        };

        if !entry.file_type().is_dir() || dir_has_tasks(entry.path()) {
            continue;
        }

        if let Err(e) = remove_dir(entry.path()) {
            if !ignore_trim_error(&e) {
                log::warn!("Failed to trim {:?}: {}", entry.path(), e);
                first_err.get_or_insert(e);
            }
        }
    }

    if delete_root && !is_root_path(path) && !dir_has_tasks(&root) {
        if let Err(e) = remove_dir(&root) {
            if !ignore_trim_error(&e) {
                log::warn!("Failed to trim {:?}: {}", root, e);
                first_err.get_or_insert(e);
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// write the attribute of the cgroup
pub fn cg_set_attribute(
    ctx: &CgContext,
    controller: &str,
    path: &str,
    attribute: &str,
    value: &str,
) -> Result<()> {
    let p = cg_get_path(ctx, Some(controller), path, attribute)?;
    write_string_file(&p, value).map_err(|e| Error::from_io(e, &p))
}

/// read the first line of the attribute of the cgroup
pub fn cg_get_attribute(
    ctx: &CgContext,
    controller: &str,
    path: &str,
    attribute: &str,
) -> Result<String> {
    let p = cg_get_path(ctx, Some(controller), path, attribute)?;
    read_one_line(&p).map_err(|e| Error::from_io(e, &p))
}

fn check_release_agent(ctx: &CgContext, controller: &str) -> Result<()> {
    if ctx.is_unified_for(controller) {
        return Err(Error::NotSupported);
    }
    Ok(())
}

/// Install the release agent of a legacy hierarchy and turn on
/// notify_on_release. Return true if notify_on_release was changed.
pub fn cg_install_release_agent(ctx: &CgContext, controller: &str, agent: &str) -> Result<bool> {
    check_release_agent(ctx, controller)?;

    let current = cg_get_attribute(ctx, controller, "", RELEASE_AGENT)?;
    let current = current.trim();
    if current.is_empty() {
        cg_set_attribute(ctx, controller, "", RELEASE_AGENT, agent)?;
        log::debug!("Installed release agent {} for {}", agent, controller);
    } else if current != agent {
        return Err(Error::Exists {
            what: format!("release agent {}", current),
        });
    }

    let notify = cg_get_attribute(ctx, controller, "", NOTIFY_ON_RELEASE)?;
    match notify.trim() {
        "0" => {
            cg_set_attribute(ctx, controller, "", NOTIFY_ON_RELEASE, "1")?;
            Ok(true)
        }
        "1" => Ok(false),
        other => Err(Error::DataFormat {
            data: other.to_string(),
        }),
    }
}

/// Turn off notify_on_release and clear the release agent.
pub fn cg_uninstall_release_agent(ctx: &CgContext, controller: &str) -> Result<()> {
    check_release_agent(ctx, controller)?;

    cg_set_attribute(ctx, controller, "", NOTIFY_ON_RELEASE, "0")?;
    cg_set_attribute(ctx, controller, "", RELEASE_AGENT, "\n")?;
    Ok(())
}
