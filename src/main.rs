use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use waypoint::config::{has_flag, ServerConfig};

const USAGE: &str = "waypoint server

USAGE:
  waypoint_server [--http-port N] [--db-path PATH]

OPTIONS:
  --http-port N     HTTP port (env: WAYPOINT_HTTP_PORT, default 3000)
  --db-path PATH    SQLite database file (env: WAYPOINT_DB_PATH, default data/trip.db)

ENVIRONMENT:
  WAYPOINT_SESSION_SECRET    session signing secret, required, at least 16 bytes
  WAYPOINT_CLIENT_URL        allowed browser origin (default http://localhost:5173)
  WAYPOINT_INSECURE_COOKIES  true to drop the Secure cookie flag for plain-HTTP development
  RUST_LOG                   log filter (default info)
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = ServerConfig::from_env()?;
    config.apply_args(&args)?;

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(target: "waypoint", "waypoint starting: RUST_LOG='{}', config={:?}", rust_log, config);

    waypoint::server::run(config).await
}
