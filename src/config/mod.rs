pub mod configs;
pub mod defaults;
pub mod envconfig;
pub mod validate;

pub use configs::{
    CodegenConfig, ConflictsConfig, GeneralConfig, LayerSettings, LayersConfig, LoggingConfig,
    TemplatesConfig,
};
pub use envconfig::EnvConfig;
