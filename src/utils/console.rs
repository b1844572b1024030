// src/utils/console.rs

//! Server-style console output for interactive runs.
//!
//! Provides consistent progress output with timestamps and levels. Library
//! diagnostics go through the `log` facade instead.

use std::sync::OnceLock;

use chrono::Local;

/// Console verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "debug" | "trace" => Level::Debug,
            "info" => Level::Info,
            "warn" => Level::Warn,
            "error" => Level::Error,
            _ => Level::Info,
        }
    }
}

/// Current console level
static LEVEL: OnceLock<Level> = OnceLock::new();

/// Initialize console output with a level name
pub fn init(level: &str) {
    let _ = LEVEL.set(Level::parse(level));
}

fn should_print(level: Level) -> bool {
    level >= LEVEL.get().copied().unwrap_or(Level::Info)
}

/// Format a line with timestamp and level
fn format_line(level: Level, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{}] [{}] {}", timestamp, level.as_str(), message)
}

pub fn info(message: &str) {
    if should_print(Level::Info) {
        println!("{}", format_line(Level::Info, message));
    }
}

pub fn error(message: &str) {
    if should_print(Level::Error) {
        eprintln!("{}", format_line(Level::Error, message));
    }
}

/// Success line (always shown)
pub fn success(message: &str) {
    println!("{}", format_line(Level::Info, &format!("✓ {}", message)));
}

/// A step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    if should_print(Level::Info) {
        let msg = format!("[STEP {}/{}] {}", step_num, total, message);
        println!("{}", format_line(Level::Info, &msg));
    }
}

pub fn header(title: &str) {
    if should_print(Level::Info) {
        let border = "═".repeat(60);
        println!("{}", format_line(Level::Info, &border));
        println!("{}", format_line(Level::Info, &format!("  {}", title)));
        println!("{}", format_line(Level::Info, &border));
    }
}

/// Indented sub-item
pub fn sub_item(message: &str) {
    if should_print(Level::Info) {
        println!("{}", format_line(Level::Info, &format!("    {}", message)));
    }
}

/// Summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    if should_print(Level::Info) {
        println!();
        println!("{}", format_line(Level::Info, &format!("[SUMMARY] {}", title)));
        for (key, value) in items {
            println!("{}", format_line(Level::Info, &format!("    {}: {}", key, value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("debug"), Level::Debug);
        assert_eq!(Level::parse("WARN"), Level::Warn);
        assert_eq!(Level::parse("unknown"), Level::Info);
    }

    #[test]
    fn test_format_line() {
        let line = format_line(Level::Warn, "video upload retried");
        assert!(line.ends_with("[WARN] video upload retried"));
    }
}
