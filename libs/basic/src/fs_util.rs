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

//! file and directory helpers
use crate::error::*;
use crate::path_util::{path_is_absolute, path_simplify};
use nix::errno::Errno;
use nix::sys::stat::Mode;
use nix::unistd::{chown, mkdir, Gid, Uid};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// read the first line of a file, without the trailing newline
pub fn read_one_line(path: &Path) -> std::io::Result<String> {
    let file = std::fs::File::open(path)?;
    let mut buffer = BufReader::new(file);
    let mut first_line = String::with_capacity(1024);
    let _ = buffer.read_line(&mut first_line)?;
    Ok(first_line.trim_end_matches('\n').to_string())
}

/// write string to an existing file, the file is never created.
///
/// kernel pseudo files take the whole value in a single write.
pub fn write_string_file<P: AsRef<Path>>(path: P, value: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).open(&path)?;

    file.write_all(value.as_bytes())?;

    Ok(())
}

/// mkdir -p with the given directory mode, the missing directories are
/// created top-down. If an owner is given, the final directory is chowned to it.
///
/// Return true if the final directory was created by this call, false if it
/// already existed.
pub fn mkdir_p_safe(path: &Path, mode: u32, uid: Option<Uid>, gid: Option<Gid>) -> Result<bool> {
    let path_str = path.to_string_lossy();
    let simplified_path = path_simplify(&path_str);

    if !path_is_absolute(&simplified_path) {
        return Err(Error::Invalid {
            what: format!(
                "Invalid Path: {}, only absolute path is allowed.",
                path_str
            ),
        });
    }

    let target = PathBuf::from(&simplified_path);
    if target.is_dir() {
        return Ok(false);
    }

    let mode = Mode::from_bits_truncate(mode);
    let mut cur_path = PathBuf::from("/");
    let mut created = false;
    // mkdir -p up to down
    for e in simplified_path.split('/').filter(|e| !e.is_empty()) {
        cur_path.push(e);
        match mkdir(&cur_path, mode) {
            Ok(()) => created = true,
            Err(Errno::EEXIST) => {
                if !cur_path.is_dir() {
                    return Err(Error::Nix {
                        source: Errno::ENOTDIR,
                    });
                }
                created = false;
            }
            Err(e) => {
                log::debug!("Failed to create directory {:?}: {}", cur_path, e);
                return Err(Error::Nix { source: e });
            }
        }
    }

    if created && (uid.is_some() || gid.is_some()) {
        chown(&cur_path, uid, gid).context(NixSnafu)?;
    }

    Ok(created)
}
