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

//! the library of operation on the cgroup
//!
//! Every operation takes a [`CgContext`], which knows the mount points and
//! caches the detected hierarchy layout.

use bitflags::bitflags;
pub mod context;
pub mod controller;
pub mod error;
pub mod everywhere;
pub mod kill;
pub mod migrate;
pub mod ops;
pub mod path;
pub mod spec;
pub mod tree;

pub use crate::context::{
    cg_is_legacy_wanted, cg_kernel_controllers, cg_mask_supported, cg_mode, CgContext,
    CgContextBuilder, CgMode, CG_BASE_DIR, PROC_DIR, SYSTEMD_CGROUP_CONTROLLER,
};
pub use crate::controller::{
    cg_controller_is_valid, cg_escape, cg_unescape, controller_normalize, CgController, CgMask,
};
pub use crate::everywhere::{
    cg_attach_everywhere, cg_create_everywhere, cg_migrate_everywhere, cg_trim_everywhere,
};
pub use crate::kill::{cg_kill, cg_kill_recursive};
pub use crate::migrate::{cg_migrate, cg_migrate_recursive, cg_migrate_recursive_fallback};
pub use crate::ops::{ProcessOps, SystemOps};
pub use crate::path::{
    cg_get_path, cg_get_path_and_check, cg_get_root_path, cg_pid_get_path,
    cg_pid_get_path_shifted, cg_shift_path,
};
pub use crate::spec::{
    cg_mangle_path, cg_path_get_session, cg_pid_get_session, cg_split_spec, CgSpec,
};
pub use crate::tree::{
    cg_attach, cg_attach_fallback, cg_create, cg_create_and_attach, cg_get_attribute, cg_get_pids,
    cg_install_release_agent, cg_is_empty, cg_is_empty_recursive, cg_read_event, cg_rmdir,
    cg_set_attribute, cg_subgroups, cg_trim, cg_uninstall_release_agent, CGROUP_EVENTS,
    CGROUP_PROCS,
};

bitflags! {
    /// the flags of the kill and migrate operations
    pub struct CgFlags: u8 {
        /// send SIGCONT to the process before the signal
        const SIGCONT = 1 << 0;
        /// ignore the process which call the operation
        const IGNORE_SELF = 1 << 1;
        /// remove the cgroup dir after it was handled
        const REMOVE = 1 << 2;
    }
}
