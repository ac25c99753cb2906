use anyhow::{Context, Result};
use platform_db::DatabaseSettings;
use platform_obs::ObsConfig;

/// Everything the binary reads from the environment (and `.env`).
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub obs: ObsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // A missing .env file is fine; a malformed one is not.
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err).context("failed to read .env"),
        }
        let database = DatabaseSettings::from_env().context("invalid database settings")?;
        Ok(Self {
            database,
            obs: ObsConfig::from_env(),
        })
    }
}
