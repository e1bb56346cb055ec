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

//! kernel command line lookup
use crate::config::parse_boolean;
use crate::error::*;
use std::fs::File;
use std::io::Read;
use std::path::Path;

fn cmdline_content(path: &Path) -> Result<String> {
    let mut file = File::open(path).context(IoSnafu)?;

    let mut buf = String::new();
    file.read_to_string(&mut buf).context(IoSnafu)?;
    Ok(buf)
}

/// read the kernel command line from `path` (usually /proc/cmdline) and
/// return the value of the key.
///
/// A bare `key` without `=` yields an empty value.
pub fn cmdline_get_value(path: &Path, key: &str) -> Result<Option<String>> {
    let buf = cmdline_content(path)?;

    for cmd in buf.split_whitespace() {
        match cmd.split_once('=') {
            Some((k, v)) if k == key => return Ok(Some(v.to_string())),
            None if cmd == key => return Ok(Some(String::new())),
            _ => {}
        }
    }

    Ok(None)
}

/// read the kernel command line and return the bool value of the key,
/// None if the key is absent. A bare key counts as true.
pub fn cmdline_get_bool(path: &Path, key: &str) -> Result<Option<bool>> {
    match cmdline_get_value(path, key)? {
        None => Ok(None),
        Some(v) if v.is_empty() => Ok(Some(true)),
        Some(v) => parse_boolean(&v).map(Some),
    }
}
