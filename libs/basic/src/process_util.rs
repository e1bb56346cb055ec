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

//! process helpers backed by procfs
use crate::format_proc_pid_path;
use nix::unistd::Pid;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Kernel threads have an empty command line. PID 1 is never a kernel
/// thread. A process that can not be inspected (e.g. it already exited)
/// is not reported as one.
pub fn is_kernel_thread(proc_root: &Path, pid: Pid) -> bool {
    if pid == Pid::from_raw(1) {
        return false;
    }

    let path = format_proc_pid_path!(proc_root, pid, "cmdline");
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };

    let mut buf = [0u8; 1];
    matches!(file.read(&mut buf), Ok(0))
}
