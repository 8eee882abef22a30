//!
//! waypoint configuration
//! ----------------------
//! Server settings resolved from `WAYPOINT_*` environment variables, with a
//! couple of command-line flags taking precedence. Resolution never touches the
//! network or the database; it only validates and fills defaults.

use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::identity::MIN_SECRET_LEN;

pub const DEFAULT_HTTP_PORT: u16 = 3000;
pub const DEFAULT_DB_PATH: &str = "data/trip.db";
pub const DEFAULT_CLIENT_URL: &str = "http://localhost:5173";

pub const ENV_HTTP_PORT: &str = "WAYPOINT_HTTP_PORT";
pub const ENV_DB_PATH: &str = "WAYPOINT_DB_PATH";
pub const ENV_SESSION_SECRET: &str = "WAYPOINT_SESSION_SECRET";
pub const ENV_CLIENT_URL: &str = "WAYPOINT_CLIENT_URL";
pub const ENV_INSECURE_COOKIES: &str = "WAYPOINT_INSECURE_COOKIES";

#[derive(Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub db_path: PathBuf,
    pub session_secret: String,
    pub client_url: String,
    /// Mark the session cookie `Secure`. Off only for plain-HTTP local development.
    pub secure_cookies: bool,
}

// Hand-written so the secret never reaches a log line
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_port", &self.http_port)
            .field("db_path", &self.db_path)
            .field("session_secret", &"<redacted>")
            .field("client_url", &self.client_url)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve from an arbitrary variable source; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let http_port = match lookup(ENV_HTTP_PORT) {
            Some(v) => match parse_port(&v) {
                Some(p) => p,
                None => bail!("{} must be a port number, got '{}'", ENV_HTTP_PORT, v),
            },
            None => DEFAULT_HTTP_PORT,
        };
        let db_path = lookup(ENV_DB_PATH)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let Some(session_secret) = lookup(ENV_SESSION_SECRET) else {
            bail!("{} is not set; refusing to start without a session signing secret", ENV_SESSION_SECRET);
        };
        if session_secret.len() < MIN_SECRET_LEN {
            bail!("{} must be at least {} bytes", ENV_SESSION_SECRET, MIN_SECRET_LEN);
        }
        let client_url = lookup(ENV_CLIENT_URL)
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CLIENT_URL.to_string());
        let insecure = match lookup(ENV_INSECURE_COOKIES) {
            Some(v) => match parse_bool(&v) {
                Some(b) => b,
                None => bail!("{} must be a boolean, got '{}'", ENV_INSECURE_COOKIES, v),
            },
            None => false,
        };
        Ok(Self { http_port, db_path, session_secret, client_url, secure_cookies: !insecure })
    }

    /// Command-line flags override the environment.
    pub fn apply_args(&mut self, args: &[String]) -> Result<()> {
        if let Some(v) = arg_value(args, "--http-port") {
            match parse_port(v) {
                Some(p) => self.http_port = p,
                None => bail!("--http-port expects a port number, got '{}'", v),
            }
        }
        if let Some(v) = arg_value(args, "--db-path") {
            self.db_path = PathBuf::from(v);
        }
        Ok(())
    }
}

pub fn parse_port(s: &str) -> Option<u16> {
    s.trim().parse::<u16>().ok()
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Value following `flag`, if both are present.
pub fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].as_str());
        }
        i += 1;
    }
    None
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
