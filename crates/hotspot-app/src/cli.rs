//! CLI argument definitions for the `hotspot` binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use hotspot_core::config::{BackendKind, HotspotConfig};

/// Hotspot: behavioral analytics ingestion server and traffic simulator.
#[derive(Parser, Debug)]
#[command(name = "hotspot", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the ingestion and query server (the default).
    Serve(ServeArgs),
    /// Drive scripted tracker sessions against an endpoint.
    Simulate(SimulateArgs),
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Interface to bind.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// Port to bind.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Storage backend: memory or sqlite.
    #[arg(short = 'b', long = "backend")]
    pub backend: Option<BackendKind>,

    /// SQLite database file (sqlite backend only).
    #[arg(long = "db-path")]
    pub db_path: Option<PathBuf>,

    /// Event log capacity.
    #[arg(long = "max-events")]
    pub max_events: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Ingestion endpoint URL. Defaults to the configured server address.
    #[arg(short = 'e', long = "endpoint")]
    pub endpoint: Option<String>,

    /// Number of simulated visits.
    #[arg(short = 's', long = "sessions", default_value_t = 3)]
    pub sessions: usize,

    /// Clicks per visit.
    #[arg(long = "clicks", default_value_t = 12)]
    pub clicks: usize,

    /// RNG seed, for reproducible traffic.
    #[arg(long = "seed", default_value_t = 7)]
    pub seed: u64,

    /// Ingest into a throwaway in-memory store instead of posting, and print the overview.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > HOTSPOT_CONFIG env var > ~/.hotspot/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("HOTSPOT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value > "info".
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        if let Some(ref level) = self.log_level {
            return level.clone();
        }
        if !config_level.trim().is_empty() {
            return config_level.to_string();
        }
        "info".to_string()
    }
}

impl ServeArgs {
    /// Resolve the server port.
    ///
    /// Priority: --port flag > HOTSPOT_PORT env var > config file value > 4040.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("HOTSPOT_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        if config_port != 0 {
            return config_port;
        }
        4040
    }

    /// Fold the flags into the loaded configuration.
    pub fn apply(&self, config: &mut HotspotConfig) {
        config.server.port = self.resolve_port(config.server.port);
        if let Some(ref host) = self.host {
            config.server.host = host.clone();
        }
        if let Some(backend) = self.backend {
            config.store.backend = backend;
        }
        if let Some(ref path) = self.db_path {
            config.store.sqlite_path = path.to_string_lossy().into_owned();
        }
        if let Some(max) = self.max_events {
            config.store.max_events = max;
        }
    }
}

impl SimulateArgs {
    /// Priority: --endpoint flag > `http://<server.host>:<server.port><tracker.endpoint>`.
    pub fn resolve_endpoint(&self, config: &HotspotConfig) -> String {
        if let Some(ref endpoint) = self.endpoint {
            return endpoint.clone();
        }
        let path = &config.tracker.endpoint;
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.clone();
        }
        format!(
            "http://{}:{}{}",
            config.server.host, config.server.port, path
        )
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".hotspot").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".hotspot").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_is_optional() {
        let args = CliArgs::parse_from(["hotspot"]);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_serve_flags_override_config() {
        let args = CliArgs::parse_from([
            "hotspot", "serve", "--port", "9090", "--backend", "sqlite", "--db-path", "/tmp/h.db",
        ]);
        let Some(Command::Serve(serve)) = args.command else {
            panic!("expected serve");
        };

        let mut config = HotspotConfig::default();
        serve.apply(&mut config);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.store.backend, BackendKind::Sqlite);
        assert_eq!(config.store.sqlite_path, "/tmp/h.db");
        assert_eq!(config.store.max_events, 100_000);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::parse_from(["hotspot", "simulate", "--dry-run", "-l", "debug"]);
        assert_eq!(args.resolve_log_level("info"), "debug");
        let Some(Command::Simulate(sim)) = args.command else {
            panic!("expected simulate");
        };
        assert!(sim.dry_run);
        assert_eq!(sim.sessions, 3);
    }

    #[test]
    fn test_log_level_falls_back() {
        let args = CliArgs::parse_from(["hotspot"]);
        assert_eq!(args.resolve_log_level("warn"), "warn");
        assert_eq!(args.resolve_log_level(""), "info");
    }

    #[test]
    fn test_endpoint_from_config() {
        let args = CliArgs::parse_from(["hotspot", "simulate"]);
        let Some(Command::Simulate(sim)) = args.command else {
            panic!("expected simulate");
        };
        assert_eq!(
            sim.resolve_endpoint(&HotspotConfig::default()),
            "http://127.0.0.1:4040/api/tracking"
        );
    }
}
