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

//! The backend of the `log` facade used by cgctl. Library crates only use
//! the `log` macros; the binary picks the targets here.
use std::{
    io::Write,
    os::unix::net::UnixDatagram,
    sync::Mutex,
};

pub use log::{Level, LevelFilter};

fn write_msg_common(writer: &mut impl Write, module: &str, msg: String) {
    let time: libc::time_t = unsafe { libc::time(std::ptr::null_mut()) };
    let mut now: libc::tm = unsafe { std::mem::zeroed() };
    unsafe { libc::localtime_r(&time, &mut now) };
    let now_str = format!(
        "{:0>4}-{:0>2}-{:0>2} {:0>2}:{:0>2}:{:0>2} ",
        now.tm_year + 1900, /* tm_year is years since 1900 */
        now.tm_mon + 1,     /* tm_mon is months since Jan: [0, 11] */
        now.tm_mday,
        now.tm_hour,
        now.tm_min,
        now.tm_sec
    );

    /* time, module, message in one write so lines do not interleave */
    let line = now_str + module + " " + &msg + "\n";
    if let Err(e) = writer.write_all(line.as_bytes()) {
        eprintln!("Failed to log message: {}", e);
    }
}

struct SysLogger {
    dgram: Mutex<UnixDatagram>,
}

impl SysLogger {
    fn connect() -> Result<Self, std::io::Error> {
        let sock = UnixDatagram::unbound()?;
        sock.connect("/dev/log")?;
        Ok(Self {
            dgram: Mutex::new(sock),
        })
    }
}

/* This is an extremely simple implementation, and only
 * supports the very basic log function. */
impl log::Log for SysLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let mut msg = String::new();
        msg += match record.module_path() {
            None => "unknown",
            Some(v) => v,
        };
        msg += " ";
        msg += &record.args().to_string();

        let dgram = match self.dgram.lock() {
            Ok(v) => v,
            Err(_) => return,
        };
        if let Err(e) = dgram.send(msg.as_bytes()) {
            eprintln!("Failed to send message to syslogger: {}", e);
        }
    }

    fn flush(&self) {}
}

/// Console output goes to stderr, stdout belongs to the command results.
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let mut stderr = std::io::stderr();
        let module_path = match record.module_path() {
            None => "unknown",
            Some(v) => v,
        };
        write_msg_common(&mut stderr, module_path, record.args().to_string());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Collect different kinds of loggers together.
struct CombinedLogger {
    level: Level,
    loggers: Vec<Box<dyn log::Log>>,
}

impl log::Log for CombinedLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        for logger in &self.loggers {
            logger.log(record);
        }
    }

    fn flush(&self) {
        for logger in &self.loggers {
            logger.flush();
        }
    }
}

fn build_logger(name: &str, level: Level, targets: &[&str]) -> CombinedLogger {
    let mut loggers: Vec<Box<dyn log::Log>> = Vec::new();

    for target in targets {
        let logger = match target.trim() {
            "console" => Box::new(ConsoleLogger) as Box<dyn log::Log>,
            "syslog" => match SysLogger::connect() {
                Ok(logger) => Box::new(logger) as Box<dyn log::Log>,
                Err(e) => {
                    eprintln!("{} failed to create syslogger: {:?}", name, e);
                    continue;
                }
            },
            other => {
                eprintln!("{}: log target '{}' is strange, ignoring.", name, other);
                continue;
            }
        };

        loggers.push(logger);
    }

    CombinedLogger { level, loggers }
}

/// Initialize the global logger instance.
/// Available log `targets` include `syslog` and `console`.
///
/// # Arguments
///
/// * `name` - The application name that initializes the logger. Just used for debugging.
/// * `level` - Log message level.
/// * `targets` - A set of log targets.
///
/// The logger can be set only once per process, later calls only adjust the level.
pub fn init_log(name: &str, level: Level, targets: &[&str]) {
    let logger = build_logger(name, level, targets);
    if logger.loggers.is_empty() {
        eprintln!("{}: no available log targets.", name);
    }

    log::set_max_level(level.to_level_filter());
    if let Err(e) = log::set_boxed_logger(Box::new(logger)) {
        eprintln!("{}: failed to set global logger: {}", name, e);
    }
}

/// Initialize console logger.
pub fn init_log_to_console(name: &str, level: Level) {
    init_log(name, level, &["console"]);
}
