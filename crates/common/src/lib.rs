use clap::Parser;
use database::Database;

pub mod auth;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:bankcards.db")]
    pub database_url: String,

    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: String,

    #[arg(long, env = "TOKEN_TTL_HOURS", default_value = "24")]
    pub token_ttl_hours: i64,
}

impl Config {
    /// Fixed-value config for tests; handlers only read `jwt_secret` and
    /// `token_ttl_hours` out of it.
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            port: 0,
            jwt_secret: "test-secret".into(),
            token_ttl_hours: 24,
        }
    }
}
