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

//! basic primitives shared by the cgroup library and cgctl
pub mod config;
pub mod error;
pub use error::*;
pub mod fs_util;
pub mod macros;
pub mod path_util;
pub mod proc_cmdline;
pub mod process_util;

/// the maximum length of a path, including the terminating NUL
pub const PATH_LENGTH_MAX: usize = 4096;
