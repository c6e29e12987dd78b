use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Config {
    /// Database URL, read from `TASK_DB`.
    pub task_db: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Fails when `TASK_DB` is not set.
    pub fn from_env() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }
}

fn default_port() -> u16 {
    8000
}
