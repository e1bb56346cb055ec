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

//! A fake cgroup hierarchy in a temporary directory. Tasks are plain
//! cgroup.procs files, a directory without the file has no tasks.
#![allow(dead_code)]

use cgroup::{CgContext, CgMode, ProcessOps, CGROUP_PROCS};
use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use walkdir::WalkDir;

pub const SELF_PID: i32 = 999;

#[derive(Default)]
pub struct FakeState {
    pub kills: Vec<(Pid, Signal)>,
    pub exited: HashSet<Pid>,
    /// cgroup.procs refusing tasks with EBUSY while one of the dirs is missing
    pub busy: Option<(PathBuf, Vec<PathBuf>)>,
}

/// Records the signals, and moves tasks between the cgroup.procs files of
/// one hierarchy the way the kernel does.
#[derive(Clone)]
pub struct FakeOps {
    root: PathBuf,
    legacy: bool,
    state: Arc<Mutex<FakeState>>,
}

impl FakeOps {
    fn hierarchy_of(&self, procs: &Path) -> PathBuf {
        if !self.legacy {
            return self.root.clone();
        }

        match procs.strip_prefix(&self.root).ok().and_then(|p| p.iter().next()) {
            Some(first) => self.root.join(first),
            None => self.root.clone(),
        }
    }

    fn drop_task(&self, hierarchy: &Path, pid: Pid) -> std::io::Result<()> {
        let pid = pid.to_string();
        for entry in WalkDir::new(hierarchy).into_iter().flatten() {
            if entry.file_name() != CGROUP_PROCS {
                continue;
            }

            let content = fs::read_to_string(entry.path())?;
            let left: Vec<&str> = content.lines().filter(|l| l.trim() != pid).collect();
            if left.is_empty() {
                fs::remove_file(entry.path())?;
            } else {
                fs::write(entry.path(), left.join("\n") + "\n")?;
            }
        }
        Ok(())
    }
}

impl ProcessOps for FakeOps {
    fn getpid(&self) -> Pid {
        Pid::from_raw(SELF_PID)
    }

    fn kill(&self, pid: Pid, signal: Signal) -> nix::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.exited.contains(&pid) {
            return Err(Errno::ESRCH);
        }
        state.kills.push((pid, signal));
        Ok(())
    }

    fn attach(&self, procs: &Path, pid: Pid) -> std::io::Result<()> {
        {
            let state = self.state.lock().unwrap();
            if state.exited.contains(&pid) {
                return Err(std::io::Error::from_raw_os_error(libc::ESRCH));
            }
            if let Some((busy, needed)) = &state.busy {
                if busy == procs && needed.iter().any(|d| !d.is_dir()) {
                    return Err(std::io::Error::from_raw_os_error(libc::EBUSY));
                }
            }
        }

        if !procs.parent().map_or(false, |p| p.is_dir()) {
            return Err(std::io::Error::from_raw_os_error(libc::ENOENT));
        }

        self.drop_task(&self.hierarchy_of(procs), pid)?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(procs)?;
        file.write_all(format!("{}\n", pid).as_bytes())
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub ctx: CgContext,
    pub state: Arc<Mutex<FakeState>>,
}

/// A cgroup root with the given hierarchies mounted, and an empty procfs.
pub fn fixture(mode: CgMode, mounts: &[&str]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("cgroup");
    let proc_root = dir.path().join("proc");
    fs::create_dir(&root).unwrap();
    fs::create_dir(&proc_root).unwrap();
    for m in mounts {
        fs::create_dir_all(root.join(m)).unwrap();
    }

    let state = Arc::new(Mutex::new(FakeState::default()));
    let ops = FakeOps {
        root: root.clone(),
        legacy: mode != CgMode::Unified,
        state: state.clone(),
    };

    let ctx = CgContext::builder()
        .root(&root)
        .proc_root(&proc_root)
        .mode(mode)
        .ops(Box::new(ops))
        .build()
        .unwrap();

    Fixture { dir, ctx, state }
}

impl Fixture {
    /// the path below the cgroup root
    pub fn path(&self, rel: &str) -> PathBuf {
        self.ctx.root().join(rel.trim_start_matches('/'))
    }

    pub fn set_tasks(&self, rel: &str, pids: &[i32]) {
        let dir = self.path(rel);
        fs::create_dir_all(&dir).unwrap();
        let content: String = pids.iter().map(|p| format!("{}\n", p)).collect();
        fs::write(dir.join(CGROUP_PROCS), content).unwrap();
    }

    pub fn tasks(&self, rel: &str) -> Vec<i32> {
        match fs::read_to_string(self.path(rel).join(CGROUP_PROCS)) {
            Ok(content) => content
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(|l| l.trim().parse().unwrap())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// a process with the command line, empty for kernel threads
    pub fn set_cmdline(&self, pid: i32, cmdline: &str) {
        let dir = self.ctx.proc_root().join(pid.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("cmdline"), cmdline).unwrap();
    }

    pub fn exit(&self, pid: i32) {
        self.state
            .lock()
            .unwrap()
            .exited
            .insert(Pid::from_raw(pid));
    }

    /// attaching to the cgroup fails with EBUSY until all the dirs exist
    pub fn busy_until(&self, rel: &str, needed: &[&str]) {
        let procs = self.path(rel).join(CGROUP_PROCS);
        let needed = needed.iter().map(|d| self.path(d)).collect();
        self.state.lock().unwrap().busy = Some((procs, needed));
    }

    pub fn kills(&self) -> Vec<(i32, Signal)> {
        self.state
            .lock()
            .unwrap()
            .kills
            .iter()
            .map(|(p, s)| (p.as_raw(), *s))
            .collect()
    }
}
