use std::path::Path;

use ::config as config_rs;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Settings read from an optional TOML file, then from `<PREFIX>_*`
/// environment variables, which win.
pub trait EnvConfig: Sized + DeserializeOwned {
    const PREFIX: &'static str = "OXIDE_GEN";
    const SEPARATOR: &'static str = "__";

    fn load_dotenv() {
        let _ = dotenvy::dotenv();
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// `required` makes a missing `file` an error instead of being ignored.
    fn load(file: &Path, required: bool) -> Result<Self> {
        Self::load_dotenv();

        let settings = config_rs::Config::builder()
            .add_source(
                config_rs::File::from(file.to_path_buf())
                    .format(config_rs::FileFormat::Toml)
                    .required(required),
            )
            .add_source(
                config_rs::Environment::with_prefix(Self::PREFIX)
                    .prefix_separator("_")
                    .separator(Self::SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read config from {} and environment", file.display()))?;

        let cfg = settings
            .try_deserialize::<Self>()
            .context("failed to deserialize config")?;

        cfg.validate()?;
        Ok(cfg)
    }
}
