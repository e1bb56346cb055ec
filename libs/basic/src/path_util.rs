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

//! the utils of the path operation
//!
use crate::PATH_LENGTH_MAX;
use std::path::Path;

/// return true if the path of a and b equaled.
pub fn path_equal(a: &str, b: &str) -> bool {
    let p_a = Path::new(a);
    let p_b = Path::new(b);
    p_a == p_b
}

/// Remove redundant inner and trailing slashes and unnecessary dots to simplify path.
/// e.g., //foo//.//bar/ becomes /foo/bar
/// .//foo//.//bar/ becomes foo/bar
pub fn path_simplify(s: &str) -> String {
    let mut ret = String::new();

    let mut pre = "";

    for com in s.split('/') {
        match com {
            "" => {
                if ret.is_empty() && pre.is_empty() {
                    ret.push('/');
                }
            }
            "." => {
                if pre.is_empty() {
                    pre = ".";
                }
            }
            _ => {
                ret.push_str(com);
                ret.push('/');
                pre = com;
            }
        }
    }
    /* drop the trailing slash, but keep the root */
    if ret.len() > 1 && ret.ends_with('/') {
        let _ = ret.pop();
    }

    ret
}

/// return true if the path starts with '/'
pub fn path_is_absolute(s: &str) -> bool {
    s.starts_with('/')
}

/// Check whether `path` lies below `prefix`, comparing whole components and
/// ignoring duplicated slashes. Return the remainder without leading slashes.
///
/// e.g., ("/sys/fs/cgroup/cpu", "/sys//fs/cgroup/") returns Some("cpu"),
/// ("/foo/barfoo", "/foo/bar") returns None.
pub fn path_startswith<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if path_is_absolute(path) != path_is_absolute(prefix) {
        return None;
    }

    let mut rest = path;
    let mut pfx = prefix;
    loop {
        rest = rest.trim_start_matches('/');
        pfx = pfx.trim_start_matches('/');

        if pfx.is_empty() {
            return Some(rest);
        }
        if rest.is_empty() {
            return None;
        }

        let a = rest.find('/').unwrap_or(rest.len());
        let b = pfx.find('/').unwrap_or(pfx.len());
        if rest[..a] != pfx[..b] {
            return None;
        }

        rest = &rest[a..];
        pfx = &pfx[b..];
    }
}

/// A path is safe if it is not empty, fits in PATH_MAX and has neither "."
/// nor ".." components, so it can not climb out of the directory it is
/// joined to.
pub fn path_is_safe(s: &str) -> bool {
    if s.is_empty() || s.len() >= PATH_LENGTH_MAX {
        return false;
    }

    !s.split('/').any(|c| c == "." || c == "..")
}

/// All the proper prefixes of a path, the deepest first.
/// e.g., /a/b/c gives [/a/b, /a, /]
pub fn path_prefixes(s: &str) -> Vec<String> {
    let mut cur = path_simplify(s);
    let mut ret = Vec::new();

    if cur == "/" {
        return ret;
    }

    while let Some(pos) = cur.rfind('/') {
        cur.truncate(pos);
        if cur.is_empty() {
            ret.push("/".to_string());
            break;
        }
        ret.push(cur.clone());
    }

    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_equal() {
        assert!(path_equal("/etc", "/etc"));
        assert!(path_equal("//etc", "/etc"));
        assert!(path_equal("/etc//", "/etc"));
        assert!(!path_equal("/etc", "./etc"));
        assert!(path_equal("/x/./y", "/x/y"));
        assert!(!path_equal("/etc", "/var"));
    }

    #[test]
    fn test_path_simplify() {
        assert_eq!(path_simplify("//foo//.//bar/"), "/foo/bar");
        assert_eq!(path_simplify(".//foo//.//bar/"), "foo/bar");
        assert_eq!(path_simplify("foo//.//bar/"), "foo/bar");
        assert_eq!(path_simplify("/"), "/");
        assert_eq!(path_simplify("///"), "/");
        assert_eq!(path_simplify(""), "");

        let once = path_simplify("/sys//fs/cgroup///cpu/");
        assert_eq!(path_simplify(&once), once);
    }

    #[test]
    fn test_path_startswith() {
        assert_eq!(
            path_startswith("/sys/fs/cgroup/cpu/a", "/sys//fs/cgroup/"),
            Some("cpu/a")
        );
        assert_eq!(path_startswith("/foo", "/foo"), Some(""));
        assert_eq!(path_startswith("/foo/", "/"), Some("foo/"));
        assert_eq!(path_startswith("/foo/barfoo", "/foo/bar"), None);
        assert_eq!(path_startswith("/foo", "/foo/bar"), None);
        assert_eq!(path_startswith("foo/bar", "/foo"), None);
    }

    #[test]
    fn test_path_is_safe() {
        assert!(path_is_safe("/a/b"));
        assert!(path_is_safe("/a//b/"));
        assert!(path_is_safe("a.slice"));
        assert!(!path_is_safe(""));
        assert!(!path_is_safe("/a/../b"));
        assert!(!path_is_safe(".."));
        assert!(!path_is_safe("/a/./b"));
        assert!(!path_is_safe(&"a".repeat(PATH_LENGTH_MAX)));
    }

    #[test]
    fn test_path_prefixes() {
        assert_eq!(path_prefixes("/a/b/c"), vec!["/a/b", "/a", "/"]);
        assert_eq!(path_prefixes("/a//b/"), vec!["/a", "/"]);
        assert_eq!(path_prefixes("/a"), vec!["/"]);
        assert!(path_prefixes("/").is_empty());
    }
}
