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

//! The handle every cgroup operation works on. It knows where the cgroup
//! and proc filesystems are, which named hierarchy is ours, and caches the
//! mounted hierarchy layout and the supported controllers.
use crate::controller::{cg_controller_is_valid, controller_normalize, CgController, CgMask};
use crate::error::*;
use crate::ops::{ProcessOps, SystemOps};
use basic::fs_util::read_one_line;
use basic::proc_cmdline::cmdline_get_bool;
use nix::libc;
use nix::sys::statfs::{statfs, FsType};
use once_cell::sync::OnceCell;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[cfg(target_env = "musl")]
type FsTypeT = libc::c_ulong;

#[cfg(not(target_env = "musl"))]
type FsTypeT = libc::c_long;

/// the base dir of the cgroup
pub const CG_BASE_DIR: &str = "/sys/fs/cgroup";
/// the mount point of procfs
pub const PROC_DIR: &str = "/proc";
/// the named hierarchy used when no controller is given
pub const SYSTEMD_CGROUP_CONTROLLER: &str = "name=systemd";

/// the unified hierarchy of the hybrid layout, below CG_BASE_DIR
pub(crate) const CG_UNIFIED_NAME: &str = "unified";
const CGROUP_CONTROLLERS: &str = "cgroup.controllers";
const UNIFIED_CMDLINE_KEY: &str = "systemd.unified_cgroup_hierarchy";

/// the layout of the mounted cgroup hierarchies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CgMode {
    /// cgroup v1, one hierarchy per controller
    Legacy,
    /// cgroup v1 controllers, our named hierarchy is on cgroup v2 at CG_BASE_DIR/unified
    Hybrid,
    /// cgroup v2 mounted to CG_BASE_DIR
    Unified,
}

impl fmt::Display for CgMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CgMode::Legacy => "legacy",
            CgMode::Hybrid => "hybrid",
            CgMode::Unified => "unified",
        };
        f.write_str(s)
    }
}

fn is_fs_type(path: &Path, magic: libc::c_long) -> Option<bool> {
    match statfs(path) {
        Ok(s) => Some(s.filesystem_type() == FsType(magic as FsTypeT)),
        Err(e) => {
            log::debug!("Failed to statfs {:?}: {}", path, e);
            None
        }
    }
}

/// None means the layout can not be told.
fn probe_mode(root: &Path) -> Option<CgMode> {
    if is_fs_type(root, libc::CGROUP2_SUPER_MAGIC)? {
        return Some(CgMode::Unified);
    }

    if !is_fs_type(root, libc::TMPFS_MAGIC)? {
        return None;
    }

    if is_fs_type(&root.join(CG_UNIFIED_NAME), libc::CGROUP2_SUPER_MAGIC) == Some(true) {
        return Some(CgMode::Hybrid);
    }

    Some(CgMode::Legacy)
}

/// The cgroup context, see the module documentation.
///
/// The cached values are computed once, the first caller wins and
/// concurrent callers wait for it.
pub struct CgContext {
    root: PathBuf,
    proc_root: PathBuf,
    hierarchy: String,
    unified_wanted: Option<bool>,
    forced_mode: Option<CgMode>,
    mode: OnceCell<Option<CgMode>>,
    mask: OnceCell<CgMask>,
    ops: Box<dyn ProcessOps + Send + Sync>,
}

impl fmt::Debug for CgContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CgContext")
            .field("root", &self.root)
            .field("proc_root", &self.proc_root)
            .field("hierarchy", &self.hierarchy)
            .field("mode", &self.mode.get())
            .field("mask", &self.mask.get())
            .finish()
    }
}

impl CgContext {
    /// the context of the running system
    pub fn new() -> CgContext {
        CgContext {
            root: PathBuf::from(CG_BASE_DIR),
            proc_root: PathBuf::from(PROC_DIR),
            hierarchy: SYSTEMD_CGROUP_CONTROLLER.to_string(),
            unified_wanted: None,
            forced_mode: None,
            mode: OnceCell::new(),
            mask: OnceCell::new(),
            ops: Box::new(SystemOps),
        }
    }

    /// customize the context
    pub fn builder() -> CgContextBuilder {
        CgContextBuilder::default()
    }

    /// the mount point of the cgroup hierarchies
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// the mount point of procfs
    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    /// our named hierarchy, as configured, e.g. "name=systemd"
    pub fn hierarchy(&self) -> &str {
        &self.hierarchy
    }

    /// whether the controller is our named hierarchy, with or without "name="
    pub fn is_hierarchy(&self, controller: &str) -> bool {
        controller_normalize(controller) == controller_normalize(&self.hierarchy)
    }

    pub(crate) fn ops(&self) -> &dyn ProcessOps {
        &*self.ops
    }

    fn probed_mode(&self) -> Option<CgMode> {
        *self.mode.get_or_init(|| {
            let mode = self.forced_mode.or_else(|| probe_mode(&self.root));
            match mode {
                Some(m) => log::debug!("cgroup hierarchy at {:?} is {}", self.root, m),
                None => log::warn!(
                    "Can not tell the cgroup layout at {:?}, assuming legacy.",
                    self.root
                ),
            }
            mode
        })
    }

    /// The layout of the mounted hierarchies, detected once. If the layout
    /// can not be told, legacy is assumed.
    pub fn mode(&self) -> CgMode {
        self.probed_mode().unwrap_or(CgMode::Legacy)
    }

    /// whether the paths of the controller live in a cgroup v2 tree
    pub(crate) fn is_unified_for(&self, controller: &str) -> bool {
        match self.mode() {
            CgMode::Unified => true,
            CgMode::Hybrid => self.is_hierarchy(controller),
            CgMode::Legacy => false,
        }
    }

    /// The well known controllers available. Unified reads the controllers
    /// enabled at the root, legacy checks which hierarchies are mounted.
    pub fn mask_supported(&self) -> Result<CgMask> {
        self.mask.get_or_try_init(|| self.probe_mask()).map(|m| *m)
    }

    fn probe_mask(&self) -> Result<CgMask> {
        if self.mode() == CgMode::Unified {
            let path = self.root.join(CGROUP_CONTROLLERS);
            let line = read_one_line(&path).map_err(|e| Error::from_io(e, &path))?;
            return Ok(line
                .split_whitespace()
                .filter_map(CgController::from_name)
                .collect());
        }

        Ok(CgController::ALL
            .into_iter()
            .filter(|c| self.root.join(c.name()).is_dir())
            .collect())
    }

    /// Whether the legacy hierarchies should be used. A mounted layout
    /// decides by itself, otherwise the configured hint and then the kernel
    /// command line are consulted.
    pub fn is_legacy_wanted(&self) -> bool {
        if let Some(mode) = self.probed_mode() {
            return mode != CgMode::Unified;
        }

        if let Some(unified) = self.unified_wanted {
            return !unified;
        }

        match cmdline_get_bool(&self.proc_root.join("cmdline"), UNIFIED_CMDLINE_KEY) {
            Ok(Some(unified)) => !unified,
            Ok(None) => true,
            Err(e) => {
                log::debug!("Failed to read the kernel command line: {}", e);
                true
            }
        }
    }

    /// forget the cached layout and controllers
    pub fn flush(&mut self) {
        self.mode = OnceCell::new();
        self.mask = OnceCell::new();
    }
}

impl Default for CgContext {
    fn default() -> Self {
        CgContext::new()
    }
}

/// the builder of CgContext
#[derive(Default)]
pub struct CgContextBuilder {
    root: Option<PathBuf>,
    proc_root: Option<PathBuf>,
    hierarchy: Option<String>,
    unified_wanted: Option<bool>,
    mode: Option<CgMode>,
    ops: Option<Box<dyn ProcessOps + Send + Sync>>,
}

impl CgContextBuilder {
    /// the cgroup mount point, CG_BASE_DIR by default
    pub fn root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.root = Some(root.into());
        self
    }

    /// the procfs mount point, PROC_DIR by default
    pub fn proc_root<P: Into<PathBuf>>(mut self, proc_root: P) -> Self {
        self.proc_root = Some(proc_root.into());
        self
    }

    /// our named hierarchy, SYSTEMD_CGROUP_CONTROLLER by default
    pub fn hierarchy(mut self, hierarchy: &str) -> Self {
        self.hierarchy = Some(hierarchy.to_string());
        self
    }

    /// the hint used when the layout can not be detected
    pub fn unified_wanted(mut self, unified: Option<bool>) -> Self {
        self.unified_wanted = unified;
        self
    }

    /// skip the detection and use this layout
    pub fn mode(mut self, mode: CgMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// replace the process primitives
    pub fn ops(mut self, ops: Box<dyn ProcessOps + Send + Sync>) -> Self {
        self.ops = Some(ops);
        self
    }

    /// build the context
    pub fn build(self) -> Result<CgContext> {
        let mut ctx = CgContext::new();

        if let Some(hierarchy) = self.hierarchy {
            let name = controller_normalize(&hierarchy);
            if !cg_controller_is_valid(&hierarchy) || CgController::from_name(name).is_some() {
                return Err(Error::InvalidArgument {
                    what: format!("invalid named hierarchy {}", hierarchy),
                });
            }
            ctx.hierarchy = hierarchy;
        }

        if let Some(root) = self.root {
            ctx.root = root;
        }
        if let Some(proc_root) = self.proc_root {
            ctx.proc_root = proc_root;
        }
        if let Some(ops) = self.ops {
            ctx.ops = ops;
        }
        ctx.unified_wanted = self.unified_wanted;
        ctx.forced_mode = self.mode;

        Ok(ctx)
    }
}

/// the layout of the mounted hierarchies
pub fn cg_mode(ctx: &CgContext) -> CgMode {
    ctx.mode()
}

/// the well known controllers usable on this system
pub fn cg_mask_supported(ctx: &CgContext) -> Result<CgMask> {
    ctx.mask_supported()
}

/// whether the legacy hierarchies are in use or wanted
pub fn cg_is_legacy_wanted(ctx: &CgContext) -> bool {
    ctx.is_legacy_wanted()
}

/// return the enabled controllers of the kernel, read from /proc/cgroups.
pub fn cg_kernel_controllers(ctx: &CgContext) -> Result<Vec<String>> {
    let path = ctx.proc_root().join("cgroups");
    let file = File::open(&path).map_err(|e| Error::from_io(e, &path))?;

    let mut controllers = Vec::new();

    for line in BufReader::new(file).lines() {
        let line = line.context(IoSnafu)?;
        if line.starts_with('#') {
            continue;
        }

        let r: Vec<&str> = line.split_whitespace().collect();
        if r.len() != 4 {
            continue;
        }

        // the controller was disabled
        if r[3] != "1" {
            continue;
        }
        controllers.push(r[0].to_string());
    }

    Ok(controllers)
}
