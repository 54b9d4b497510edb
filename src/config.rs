//! Server configuration.
//! Each setting resolves from a CLI flag, then an environment variable, then a default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};

pub const USAGE: &str = "sessiongate\n\nUSAGE:\n  sessiongate [--host H] [--http-port N] [--public-dir PATH] [--users PATH]\n              [--session-ttl-secs N] [--sweep-interval-secs N] [--secure-cookie [bool]]\n\nOPTIONS:\n  --host H                  Bind address (env: SESSIONGATE_HOST, default 127.0.0.1)\n  --http-port N             HTTP port (env: SESSIONGATE_HTTP_PORT, default 3000)\n  --public-dir PATH         Directory holding login.html, dashboard.html and assets (env: SESSIONGATE_PUBLIC_DIR, default public)\n  --users PATH              JSON users file replacing the demo list (env: SESSIONGATE_USERS_FILE)\n  --session-ttl-secs N      Idle session lifetime (env: SESSIONGATE_SESSION_TTL_SECS, default 3600)\n  --sweep-interval-secs N   Expired-session sweep period, 0 disables (env: SESSIONGATE_SWEEP_INTERVAL_SECS, default 60)\n  --secure-cookie [bool]    Mark the session cookie Secure (env: SESSIONGATE_SECURE_COOKIE, default false)\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
    pub public_dir: PathBuf,
    pub users_file: Option<PathBuf>,
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    pub secure_cookie: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            http_port: 3000,
            public_dir: PathBuf::from("public"),
            users_file: None,
            session_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
            secure_cookie: false,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String { format!("{}:{}", self.host, self.http_port) }

    /// Resolve from process arguments and environment.
    pub fn from_env_and_args(args: &[String]) -> Result<Self> {
        Self::resolve(args, |name| std::env::var(name).ok())
    }

    /// Resolve with an injectable environment lookup.
    pub fn resolve<F>(args: &[String], env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();

        let host = arg_value(args, "--host")
            .or_else(|| env("SESSIONGATE_HOST"))
            .unwrap_or(d.host);

        let http_port = match arg_value(args, "--http-port").or_else(|| env("SESSIONGATE_HTTP_PORT")) {
            Some(v) => v.parse::<u16>().map_err(|_| anyhow!("invalid http port '{}'", v))?,
            None => d.http_port,
        };

        let public_dir = arg_value(args, "--public-dir")
            .or_else(|| env("SESSIONGATE_PUBLIC_DIR"))
            .map(PathBuf::from)
            .unwrap_or(d.public_dir);

        let users_file = arg_value(args, "--users")
            .or_else(|| env("SESSIONGATE_USERS_FILE"))
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let session_ttl = match arg_value(args, "--session-ttl-secs").or_else(|| env("SESSIONGATE_SESSION_TTL_SECS")) {
            Some(v) => {
                let secs = parse_secs(&v, "session ttl")?;
                if secs == 0 { return Err(anyhow!("session ttl must be greater than zero")); }
                Duration::from_secs(secs)
            }
            None => d.session_ttl,
        };

        let sweep_interval = match arg_value(args, "--sweep-interval-secs").or_else(|| env("SESSIONGATE_SWEEP_INTERVAL_SECS")) {
            Some(v) => Duration::from_secs(parse_secs(&v, "sweep interval")?),
            None => d.sweep_interval,
        };

        let secure_cookie = parse_bool_flag(args, "--secure-cookie")
            .or_else(|| env("SESSIONGATE_SECURE_COOKIE").and_then(|v| parse_bool(&v)))
            .unwrap_or(d.secure_cookie);

        Ok(Self { host, http_port, public_dir, users_file, session_ttl, sweep_interval, secure_cookie })
    }
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn parse_secs(v: &str, what: &str) -> Result<u64> {
    v.trim().parse::<u64>().map_err(|_| anyhow!("invalid {} '{}'", what, v))
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// Presence enables; an immediately following boolean token overrides.
fn parse_bool_flag(args: &[String], flag: &str) -> Option<bool> {
    let pos = args.iter().position(|a| a == flag)?;
    match args.get(pos + 1) {
        Some(next) if !next.starts_with('-') => Some(parse_bool(next).unwrap_or(true)),
        _ => Some(true),
    }
}
