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

//! the process primitives the migrate and kill engines are built on
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use std::path::Path;

/// Process primitives used by the cgroup operations.
pub trait ProcessOps {
    /// the pid of the caller
    fn getpid(&self) -> Pid;

    /// deliver the signal to the process
    fn kill(&self, pid: Pid, signal: Signal) -> nix::Result<()>;

    /// move the process into the cgroup whose cgroup.procs file is `procs`
    fn attach(&self, procs: &Path, pid: Pid) -> std::io::Result<()>;
}

/// The primitives of the running system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOps;

impl ProcessOps for SystemOps {
    fn getpid(&self) -> Pid {
        nix::unistd::getpid()
    }

    fn kill(&self, pid: Pid, signal: Signal) -> nix::Result<()> {
        nix::sys::signal::kill(pid, signal)
    }

    fn attach(&self, procs: &Path, pid: Pid) -> std::io::Result<()> {
        basic::fs_util::write_string_file(procs, &format!("{}\n", pid))
    }
}
