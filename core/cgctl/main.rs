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

//! cgctl inspects and manipulates the cgroup trees from the command line.
//! Every subcommand maps onto one operation of the cgroup library, the exit
//! code of a failed command is the error number of the failure.

mod config;

use cgroup::error::{Error, Result};
use cgroup::{CgContext, CgFlags};
use clap::Parser;
use config::CgctlConfig;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use std::collections::HashSet;
use std::process::exit;
use std::str::FromStr;

/// parse program arguments
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    subcmd: SubCmd,

    /// Configuration file
    #[clap(short, long)]
    config: Option<String>,
}

#[derive(Parser, Debug)]
enum SubCmd {
    /// `[query]` Show the layout of the mounted hierarchies
    #[clap(display_order = 1)]
    Mode {},

    /// `[query]` List the supported controllers
    #[clap(display_order = 2)]
    Controllers {
        /// List every controller the kernel knows
        #[clap(short, long)]
        kernel: bool,
    },

    /// `[query]` Show the filesystem path of a cgroup
    #[clap(display_order = 3)]
    Path {
        #[clap(required = true)]
        spec: String,
        suffix: Option<String>,
    },

    /// `[query]` Show the cgroup of a process
    #[clap(display_order = 4)]
    PidPath {
        #[clap(required = true)]
        pid: i32,
        /// The hierarchy to look in, our named hierarchy by default
        #[clap(long)]
        controller: Option<String>,
        /// Strip the root of the cgroup tree from the result
        #[clap(long)]
        shifted: bool,
    },

    /// `[query]` Show the root of the cgroup tree we manage
    #[clap(display_order = 5)]
    RootPath {},

    /// `[query]` Tell whether a cgroup has no processes
    #[clap(display_order = 6)]
    IsEmpty {
        #[clap(required = true)]
        spec: String,
        /// Also look into the subgroups
        #[clap(short, long)]
        recursive: bool,
    },

    /// `[tree]` Create a cgroup
    #[clap(display_order = 7)]
    Create {
        #[clap(required = true)]
        spec: String,
    },

    /// `[tree]` Remove an empty cgroup
    #[clap(display_order = 8)]
    Remove {
        #[clap(required = true)]
        spec: String,
    },

    /// `[tree]` Remove the empty subgroups of a cgroup
    #[clap(display_order = 9)]
    Trim {
        #[clap(required = true)]
        spec: String,
        /// Remove the cgroup itself too
        #[clap(long)]
        delete_root: bool,
    },

    /// `[process]` Move a process into a cgroup
    #[clap(display_order = 10)]
    Attach {
        #[clap(required = true)]
        spec: String,
        #[clap(required = true)]
        pid: i32,
        /// Try the parents of the cgroup if it can not take the process
        #[clap(long)]
        fallback: bool,
    },

    /// `[process]` Send a signal to the processes of a cgroup
    #[clap(display_order = 11)]
    Kill {
        #[clap(required = true)]
        spec: String,
        #[clap(short, long, default_value = "SIGTERM", parse(try_from_str = parse_signal))]
        signal: Signal,
        /// Include the subgroups
        #[clap(short, long)]
        recursive: bool,
        /// Wake the processes up with SIGCONT first
        #[clap(long)]
        sigcont: bool,
        #[clap(long)]
        ignore_self: bool,
        /// Remove the cgroups afterwards
        #[clap(long)]
        remove: bool,
    },

    /// `[process]` Move the processes of one cgroup into another
    #[clap(display_order = 12)]
    Migrate {
        #[clap(required = true)]
        from: String,
        #[clap(required = true)]
        to: String,
        /// Include the subgroups
        #[clap(short, long)]
        recursive: bool,
        /// Remove the drained cgroups
        #[clap(long)]
        remove: bool,
        #[clap(long)]
        ignore_self: bool,
        /// Try the parents of the destination too, needs --recursive
        #[clap(long, requires = "recursive")]
        fallback: bool,
    },

    /// `[name]` Split a controller:path spec
    #[clap(display_order = 13)]
    Split {
        #[clap(required = true)]
        spec: String,
    },

    /// `[name]` Show the login session of a cgroup path or a process
    #[clap(display_order = 14)]
    Session {
        #[clap(required_unless_present = "pid")]
        path: Option<String>,
        #[clap(long, conflicts_with = "path")]
        pid: Option<i32>,
    },

    /// `[name]` Escape a name for use as a cgroup directory
    #[clap(display_order = 15)]
    Escape {
        #[clap(required = true)]
        name: String,
    },

    /// `[agent]` Manage the release agent of a legacy hierarchy
    #[clap(display_order = 16)]
    ReleaseAgent {
        #[clap(subcommand)]
        action: AgentAction,
    },
}

#[derive(Parser, Debug)]
enum AgentAction {
    /// Install the agent, unless one is installed already
    Install {
        #[clap(required = true)]
        agent: String,
        #[clap(long)]
        controller: Option<String>,
    },

    /// Turn off the release notification and drop the agent
    Uninstall {
        #[clap(long)]
        controller: Option<String>,
    },
}

/// "SIGKILL", "KILL" or "9"
fn parse_signal(s: &str) -> std::result::Result<Signal, String> {
    if let Ok(num) = s.parse::<i32>() {
        return Signal::try_from(num).map_err(|e| format!("{}: {}", s, e));
    }

    let name = s.to_uppercase();
    let name = if name.starts_with("SIG") {
        name
    } else {
        format!("SIG{}", name)
    };
    Signal::from_str(&name).map_err(|e| format!("{}: {}", s, e))
}

/// The hierarchy and path a spec names. The controller defaults to our
/// named hierarchy and the path to the root.
fn resolve_spec(ctx: &CgContext, spec: &str) -> Result<(String, String)> {
    let spec = cgroup::cg_split_spec(spec)?;
    let controller = spec
        .controller_name()
        .unwrap_or_else(|| ctx.hierarchy().to_string());
    let path = spec.path.unwrap_or_else(|| "/".to_string());
    Ok((controller, path))
}

fn pid_from_arg(pid: i32) -> Result<Pid> {
    if pid < 0 {
        return Err(Error::InvalidArgument {
            what: format!("invalid pid {}", pid),
        });
    }
    Ok(Pid::from_raw(pid))
}

fn run_agent(ctx: &CgContext, action: AgentAction) -> Result<()> {
    match action {
        AgentAction::Install { agent, controller } => {
            let controller = controller.unwrap_or_else(|| ctx.hierarchy().to_string());
            if cgroup::cg_install_release_agent(ctx, &controller, &agent)? {
                println!("installed");
            } else {
                println!("already installed");
            }
        }
        AgentAction::Uninstall { controller } => {
            let controller = controller.unwrap_or_else(|| ctx.hierarchy().to_string());
            cgroup::cg_uninstall_release_agent(ctx, &controller)?;
        }
    }
    Ok(())
}

fn run(ctx: &CgContext, subcmd: SubCmd) -> Result<()> {
    match subcmd {
        SubCmd::Mode {} => println!("{}", ctx.mode()),

        SubCmd::Controllers { kernel } => {
            if kernel {
                for c in cgroup::cg_kernel_controllers(ctx)? {
                    println!("{}", c);
                }
            } else {
                for c in ctx.mask_supported()?.controllers() {
                    println!("{}", c);
                }
            }
        }

        SubCmd::Path { spec, suffix } => {
            let path = match suffix {
                None => cgroup::cg_mangle_path(ctx, &spec)?,
                Some(suffix) => {
                    let (controller, path) = resolve_spec(ctx, &spec)?;
                    cgroup::cg_get_path(ctx, Some(&controller), &path, &suffix)?
                }
            };
            println!("{}", path.display());
        }

        SubCmd::PidPath {
            pid,
            controller,
            shifted,
        } => {
            let pid = pid_from_arg(pid)?;
            let path = if shifted {
                cgroup::cg_pid_get_path_shifted(ctx, pid, None)?
            } else {
                cgroup::cg_pid_get_path(ctx, controller.as_deref(), pid)?
            };
            println!("{}", path);
        }

        SubCmd::RootPath {} => println!("{}", cgroup::cg_get_root_path(ctx)?),

        SubCmd::IsEmpty { spec, recursive } => {
            let (controller, path) = resolve_spec(ctx, &spec)?;
            let empty = if recursive {
                cgroup::cg_is_empty_recursive(ctx, &controller, &path)?
            } else {
                cgroup::cg_is_empty(ctx, &controller, &path)?
            };
            println!("{}", if empty { "yes" } else { "no" });
        }

        SubCmd::Create { spec } => {
            let (controller, path) = resolve_spec(ctx, &spec)?;
            if !cgroup::cg_create(ctx, &controller, &path)? {
                log::info!("{}:{} exists already", controller, path);
            }
        }

        SubCmd::Remove { spec } => {
            let (controller, path) = resolve_spec(ctx, &spec)?;
            cgroup::cg_rmdir(ctx, &controller, &path)?;
        }

        SubCmd::Trim { spec, delete_root } => {
            let (controller, path) = resolve_spec(ctx, &spec)?;
            cgroup::cg_trim(ctx, &controller, &path, delete_root)?;
        }

        SubCmd::Attach {
            spec,
            pid,
            fallback,
        } => {
            let (controller, path) = resolve_spec(ctx, &spec)?;
            let pid = pid_from_arg(pid)?;
            if fallback {
                cgroup::cg_attach_fallback(ctx, &controller, &path, pid)?;
            } else {
                cgroup::cg_attach(ctx, &controller, &path, pid)?;
            }
        }

        SubCmd::Kill {
            spec,
            signal,
            recursive,
            sigcont,
            ignore_self,
            remove,
        } => {
            let (controller, path) = resolve_spec(ctx, &spec)?;
            let mut flags = CgFlags::empty();
            flags.set(CgFlags::SIGCONT, sigcont);
            flags.set(CgFlags::IGNORE_SELF, ignore_self);
            flags.set(CgFlags::REMOVE, remove);

            let mut pids = HashSet::new();
            let killed = if recursive {
                cgroup::cg_kill_recursive(ctx, &controller, &path, signal, flags, &mut pids)?
            } else {
                cgroup::cg_kill(ctx, &controller, &path, signal, flags, &mut pids)?
            };
            if !killed {
                log::info!("No process in {}:{} was signalled", controller, path);
            }
        }

        SubCmd::Migrate {
            from,
            to,
            recursive,
            remove,
            ignore_self,
            fallback,
        } => {
            let (cfrom, pfrom) = resolve_spec(ctx, &from)?;
            let (cto, pto) = resolve_spec(ctx, &to)?;
            let mut flags = CgFlags::empty();
            flags.set(CgFlags::IGNORE_SELF, ignore_self);
            flags.set(CgFlags::REMOVE, remove);

            let moved = if fallback {
                cgroup::cg_migrate_recursive_fallback(ctx, &cfrom, &pfrom, &cto, &pto, flags)?
            } else if recursive {
                cgroup::cg_migrate_recursive(ctx, &cfrom, &pfrom, &cto, &pto, flags)?
            } else {
                cgroup::cg_migrate(ctx, &cfrom, &pfrom, &cto, &pto, flags)?
            };
            if !moved {
                log::info!("No process was moved from {}:{}", cfrom, pfrom);
            }
        }

        SubCmd::Split { spec } => {
            let spec = cgroup::cg_split_spec(&spec)?;
            println!("controller: {}", spec.controller_name().unwrap_or_default());
            println!("path: {}", spec.path.unwrap_or_default());
        }

        SubCmd::Session { path, pid } => {
            let session = match (path, pid) {
                (_, Some(pid)) => cgroup::cg_pid_get_session(ctx, pid_from_arg(pid)?)?,
                (Some(path), None) => cgroup::cg_path_get_session(&path)?,
                (None, None) => {
                    return Err(Error::InvalidArgument {
                        what: "a path or a pid is needed".to_string(),
                    })
                }
            };
            println!("{}", session);
        }

        SubCmd::Escape { name } => println!("{}", cgroup::cg_escape(&name)),

        SubCmd::ReleaseAgent { action } => run_agent(ctx, action)?,
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    let config = CgctlConfig::new(args.config.as_deref());
    logger::init_log("cgctl", config.log_level(), &config.log_targets());

    let ctx = match config.context() {
        Ok(ctx) => ctx,
        Err(e) => {
            log::error!("Invalid cgroup configuration: {}", e);
            exit(e.errno());
        }
    };

    if let Err(e) = run(&ctx, args.subcmd) {
        eprintln!("cgctl: {}", e);
        exit(e.errno());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgroup::CgMode;
    use clap::CommandFactory;

    #[test]
    fn test_args() {
        Args::command().debug_assert();

        let args = Args::try_parse_from(["cgctl", "kill", "cpu:/a", "-s", "KILL", "-r"]).unwrap();
        match args.subcmd {
            SubCmd::Kill {
                spec,
                signal,
                recursive,
                ..
            } => {
                assert_eq!(spec, "cpu:/a");
                assert_eq!(signal, Signal::SIGKILL);
                assert!(recursive);
            }
            _ => panic!("unexpected subcommand"),
        }

        assert!(Args::try_parse_from(["cgctl", "session"]).is_err());
        assert!(Args::try_parse_from(["cgctl", "session", "/a", "--pid", "1"]).is_err());
        assert!(Args::try_parse_from(["cgctl", "kill", "/a", "-s", "BOGUS"]).is_err());
        assert!(Args::try_parse_from(["cgctl", "migrate", "/a", "/b", "--fallback"]).is_err());
        let args = Args::try_parse_from(["cgctl", "migrate", "/a", "/b", "-r", "--fallback"]);
        assert!(matches!(
            args.unwrap().subcmd,
            SubCmd::Migrate {
                recursive: true,
                fallback: true,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_signal() {
        assert_eq!(parse_signal("SIGTERM").unwrap(), Signal::SIGTERM);
        assert_eq!(parse_signal("hup").unwrap(), Signal::SIGHUP);
        assert_eq!(parse_signal("9").unwrap(), Signal::SIGKILL);
        assert!(parse_signal("0").is_err());
        assert!(parse_signal("NOPE").is_err());
    }

    #[test]
    fn test_run() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("systemd")).unwrap();
        std::fs::create_dir(root.path().join("cpu")).unwrap();
        let ctx = CgContext::builder()
            .root(root.path())
            .mode(CgMode::Legacy)
            .build()
            .unwrap();

        assert_eq!(
            resolve_spec(&ctx, "/a.slice").unwrap(),
            ("name=systemd".to_string(), "/a.slice".to_string())
        );
        assert_eq!(
            resolve_spec(&ctx, "cpu").unwrap(),
            ("cpu".to_string(), "/".to_string())
        );

        run(
            &ctx,
            SubCmd::Create {
                spec: "cpu:/a/b".to_string(),
            },
        )
        .unwrap();
        assert!(root.path().join("cpu/a/b").is_dir());

        run(
            &ctx,
            SubCmd::Trim {
                spec: "cpu:/a".to_string(),
                delete_root: true,
            },
        )
        .unwrap();
        assert!(!root.path().join("cpu/a").exists());

        let e = run(
            &ctx,
            SubCmd::Create {
                spec: "memory:/a".to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(e.errno(), nix::libc::EOPNOTSUPP);

        let e = run(
            &ctx,
            SubCmd::Attach {
                spec: "/a".to_string(),
                pid: -1,
                fallback: false,
            },
        )
        .unwrap_err();
        assert!(matches!(e, Error::InvalidArgument { .. }));
    }
}
