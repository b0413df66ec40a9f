//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `carelink_core` linkage and schema bootstrap outside any host.
//! - Optionally report relationship drift for an existing database file.
//! - Write store and drift events to a rolling log under the temp dir.
//!
//! Usage: `carelink_cli [DB_PATH]`. Without a path an in-memory store is used.

use carelink_core::db::migrations::schema_target;
use carelink_core::{
    default_log_level, init_logging, RelationshipService, SqliteCoordinator, StoreConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;

fn cli_log_dir() -> PathBuf {
    std::env::temp_dir().join("carelink-cli-logs")
}

fn main() -> ExitCode {
    let config = match std::env::args().nth(1) {
        Some(path) => StoreConfig::file(path),
        None => StoreConfig::default(),
    };

    let log_dir = cli_log_dir();
    match init_logging(default_log_level(), &log_dir.to_string_lossy()) {
        Ok(()) => println!("logging level={} dir={}", default_log_level(), log_dir.display()),
        Err(err) => eprintln!("logging disabled: {err}"),
    }

    println!("carelink_core version={}", carelink_core::core_version());
    println!("carelink_core schema_version={}", schema_target());

    let coordinator = match SqliteCoordinator::open(config) {
        Ok(coordinator) => coordinator,
        Err(err) => {
            eprintln!("failed to open store: {err}");
            return ExitCode::FAILURE;
        }
    };

    match RelationshipService::new(&coordinator).audit_relationships() {
        Ok(violations) => {
            println!("relationship_violations={}", violations.len());
            for violation in violations {
                println!("  {violation:?}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("audit failed: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::cli_log_dir;
    use carelink_core::{default_log_level, LoggingConfig};

    #[test]
    fn cli_log_dir_is_accepted_by_logging_config() {
        let dir = cli_log_dir();
        let config = LoggingConfig::parse(default_log_level(), &dir.to_string_lossy()).unwrap();
        assert_eq!(config.log_dir, dir);
    }
}
