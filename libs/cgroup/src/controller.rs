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

//! The well known kernel controllers and the naming rules of controllers
//! and cgroup directories.
//!
//! Named hierarchies are accepted both as "foo" and "name=foo", they must not
//! collide with a kernel controller name. Names handed back are always
//! normalized, i.e. without the "name=" prefix.
use crate::error::*;
use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

/// the prefix of the named hierarchies
pub const NAMED_PREFIX: &str = "name=";

const CONTROLLER_NAME_MAX: usize = 255;

/// the well known cgroup controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CgController {
    /// cpu
    Cpu,
    /// cpuacct
    CpuAcct,
    /// blkio
    Blkio,
    /// memory
    Memory,
    /// devices
    Devices,
}

bitflags! {
    /// a set of the well known controllers, bit n is the n-th CgController
    pub struct CgMask: u32 {
        /// cpu
        const CPU = 1 << 0;
        /// cpuacct
        const CPUACCT = 1 << 1;
        /// blkio
        const BLKIO = 1 << 2;
        /// memory
        const MEMORY = 1 << 3;
        /// devices
        const DEVICES = 1 << 4;
    }
}

impl CgController {
    /// all the controllers, in the order of their mask bits
    pub const ALL: [CgController; 5] = [
        CgController::Cpu,
        CgController::CpuAcct,
        CgController::Blkio,
        CgController::Memory,
        CgController::Devices,
    ];

    /// the kernel facing name
    pub fn name(self) -> &'static str {
        match self {
            CgController::Cpu => "cpu",
            CgController::CpuAcct => "cpuacct",
            CgController::Blkio => "blkio",
            CgController::Memory => "memory",
            CgController::Devices => "devices",
        }
    }

    /// look a controller up by its kernel facing name
    pub fn from_name(name: &str) -> Option<CgController> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// the mask bit of the controller
    pub fn mask(self) -> CgMask {
        CgMask::from_bits_truncate(1 << self as u32)
    }
}

impl fmt::Display for CgController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CgController {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CgController::from_name(s).ok_or_else(|| Error::InvalidArgument {
            what: format!("unknown controller {}", s),
        })
    }
}

impl CgMask {
    /// iterate over the controllers in the mask
    pub fn controllers(self) -> impl Iterator<Item = CgController> {
        CgController::ALL
            .into_iter()
            .filter(move |c| self.contains(c.mask()))
    }

    /// the names of the controllers in the mask, separated by space
    pub fn names(self) -> String {
        self.controllers()
            .map(|c| c.name())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromIterator<CgController> for CgMask {
    fn from_iter<I: IntoIterator<Item = CgController>>(iter: I) -> Self {
        iter.into_iter().fold(CgMask::empty(), |m, c| m | c.mask())
    }
}

/// drop the "name=" prefix
pub fn controller_normalize(controller: &str) -> &str {
    controller.strip_prefix(NAMED_PREFIX).unwrap_or(controller)
}

/// whether the controller name is acceptable, "foo" and "name=foo" are both accepted.
pub fn cg_controller_is_valid(controller: &str) -> bool {
    let p = controller_normalize(controller);

    if p.is_empty() || p.starts_with('_') || p.len() > CONTROLLER_NAME_MAX {
        return false;
    }

    p.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escape a name to be used as a directory in the cgroup tree: names that
/// might collide with kernel attribute files or controller prefixed
/// attributes (like "cpu.shares") get a '_' prefix.
pub fn cg_escape(name: &str) -> String {
    let need_prefix = if name.is_empty()
        || name.starts_with('_')
        || name.starts_with('.')
        || name == "notify_on_release"
        || name == "release_agent"
        || name == "tasks"
        || name.starts_with("cgroup.")
    {
        true
    } else {
        match name.rfind('.') {
            Some(dot) => CgController::from_name(&name[..dot]).is_some(),
            None => false,
        }
    };

    if need_prefix {
        format!("_{}", name)
    } else {
        name.to_string()
    }
}

/// undo cg_escape
pub fn cg_unescape(name: &str) -> &str {
    name.strip_prefix('_').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_name_roundtrip() {
        for c in CgController::ALL {
            assert_eq!(CgController::from_name(c.name()), Some(c));
            assert_eq!(c.name().parse::<CgController>().unwrap(), c);
        }
        assert_eq!(CgController::from_name("freezer"), None);
        assert!("".parse::<CgController>().is_err());
    }

    #[test]
    fn test_mask() {
        assert_eq!(CgController::Cpu.mask(), CgMask::CPU);
        assert_eq!(CgController::Devices.mask(), CgMask::DEVICES);
        assert_eq!(CgMask::all().bits(), (1 << CgController::ALL.len()) - 1);
        assert_eq!(CgMask::from_bits_truncate(0xff), CgMask::all());

        let m = CgMask::CPU | CgMask::MEMORY;
        let v: Vec<CgController> = m.controllers().collect();
        assert_eq!(v, vec![CgController::Cpu, CgController::Memory]);
        assert_eq!(m.names(), "cpu memory");
        assert_eq!(v.into_iter().collect::<CgMask>(), m);
    }

    #[test]
    fn test_controller_is_valid() {
        assert!(cg_controller_is_valid("cpu"));
        assert!(cg_controller_is_valid("name=systemd"));
        assert!(cg_controller_is_valid("foo_bar2"));
        assert!(!cg_controller_is_valid(""));
        assert!(!cg_controller_is_valid("name="));
        assert!(!cg_controller_is_valid("_foo"));
        assert!(!cg_controller_is_valid("cpu,cpuacct"));
        assert!(!cg_controller_is_valid("a/b"));
        assert!(!cg_controller_is_valid(&"a".repeat(256)));
    }

    #[test]
    fn test_escape() {
        assert_eq!(cg_escape("foo.service"), "foo.service");
        assert_eq!(cg_escape("_foo"), "__foo");
        assert_eq!(cg_escape(".foo"), "_.foo");
        assert_eq!(cg_escape("tasks"), "_tasks");
        assert_eq!(cg_escape("cgroup.procs"), "_cgroup.procs");
        assert_eq!(cg_escape("cpu.shares"), "_cpu.shares");
        assert_eq!(cg_escape("cpux.shares"), "cpux.shares");
        assert_eq!(cg_escape(""), "_");

        for n in ["foo.service", "tasks", "cpu.shares", "_x"] {
            assert_eq!(cg_unescape(&cg_escape(n)), n);
        }
    }
}
