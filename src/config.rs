//! Server configuration via CLI args and environment variables.

use clap::Parser;

use svcgraph_service::ServiceConfig;

/// HTTP server for service dependency graphs.
#[derive(Parser, Debug, Clone)]
#[command(name = "svcgraph-server", version, about)]
pub struct Config {
    /// Bind address.
    #[arg(long, default_value = "0.0.0.0", env = "SVCGRAPH_HOST")]
    pub host: String,

    /// Bind port.
    #[arg(long, default_value_t = 8080, env = "SVCGRAPH_PORT")]
    pub port: u16,

    /// SQLite database URL (e.g. `sqlite://svcgraph.db`). Omit for in-memory mode.
    #[arg(long, env = "SVCGRAPH_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Maximum pooled store connections.
    #[arg(long, default_value_t = 8, env = "SVCGRAPH_MAX_CONNECTIONS")]
    pub max_connections: u32,

    /// CORS allowed origins (comma-separated). Empty for no CORS.
    #[arg(long, env = "SVCGRAPH_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Log level.
    #[arg(long, default_value = "info", env = "SVCGRAPH_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: "text" or "json".
    #[arg(long, default_value = "text", env = "SVCGRAPH_LOG_FORMAT")]
    pub log_format: String,
}

impl Config {
    /// Parses configuration from CLI args and env vars.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// The subset of the configuration the service layer needs.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            database_url: self.database_url.clone(),
            max_connections: self.max_connections,
        }
    }
}
