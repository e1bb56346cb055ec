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

//! parsing of the values found in kernel and configuration files
use crate::error::*;

const TRUE_VALUES: [&str; 6] = ["1", "yes", "y", "true", "t", "on"];
const FALSE_VALUES: [&str; 6] = ["0", "no", "n", "false", "f", "off"];

/// Parse a boolean the way the kernel command line spells it. Surrounding
/// whitespace and case are ignored.
pub fn parse_boolean(item: &str) -> Result<bool> {
    let value = item.trim().to_lowercase();

    if TRUE_VALUES.contains(&value.as_str()) {
        return Ok(true);
    }
    if FALSE_VALUES.contains(&value.as_str()) {
        return Ok(false);
    }

    Err(Error::Parse {
        source: format!("invalid boolean value '{}'", item.trim()).into(),
    })
}
