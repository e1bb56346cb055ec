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
//
#![allow(non_snake_case)]
use cgroup::{CgContext, CG_BASE_DIR, PROC_DIR, SYSTEMD_CGROUP_CONTROLLER};
use confique::Config;
use std::str::FromStr;

pub const CGCTL_CONFIG: &str = "/etc/cgctl/cgctl.toml";

#[derive(Config, Default, Debug)]
pub struct CgctlConfig {
    #[config(nested)]
    pub Cgroup: SectionCgroup,
    #[config(nested)]
    pub Log: SectionLog,
}

#[derive(Config, Debug)]
pub struct SectionCgroup {
    #[config(env = "CGCTL_ROOT", default = "/sys/fs/cgroup")]
    pub Root: String,
    #[config(env = "CGCTL_PROC_ROOT", default = "/proc")]
    pub ProcRoot: String,
    #[config(default = "name=systemd")]
    pub Hierarchy: String,
    #[config(env = "CGCTL_UNIFIED_HIERARCHY")]
    pub UnifiedHierarchy: Option<bool>,
}

impl Default for SectionCgroup {
    fn default() -> Self {
        SectionCgroup {
            Root: CG_BASE_DIR.to_string(),
            ProcRoot: PROC_DIR.to_string(),
            Hierarchy: SYSTEMD_CGROUP_CONTROLLER.to_string(),
            UnifiedHierarchy: None,
        }
    }
}

#[derive(Config, Debug)]
pub struct SectionLog {
    #[config(default = "info")]
    pub Level: String,
    #[config(default = "console")]
    pub Target: String,
}

impl Default for SectionLog {
    fn default() -> Self {
        SectionLog {
            Level: "info".to_string(),
            Target: "console".to_string(),
        }
    }
}

impl CgctlConfig {
    pub fn new(file: Option<&str>) -> CgctlConfig {
        let builder = CgctlConfig::builder().env();
        let cgctl_config = builder.file(file.unwrap_or(CGCTL_CONFIG));
        match cgctl_config.load() {
            Ok(c) => c,
            Err(e) => {
                /* the logger is not ready yet */
                if file.is_some() {
                    eprintln!("cgctl: failed to load configuration, using defaults: {}", e);
                }
                CgctlConfig::default()
            }
        }
    }

    /// the log level, info if the configured one can not be parsed
    pub fn log_level(&self) -> log::Level {
        log::Level::from_str(self.Log.Level.trim()).unwrap_or(log::Level::Info)
    }

    pub fn log_targets(&self) -> Vec<&str> {
        self.Log
            .Target
            .split(',')
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn context(&self) -> cgroup::error::Result<CgContext> {
        CgContext::builder()
            .root(&self.Cgroup.Root)
            .proc_root(&self.Cgroup.ProcRoot)
            .hierarchy(&self.Cgroup.Hierarchy)
            .unified_wanted(self.Cgroup.UnifiedHierarchy)
            .build()
    }
}
