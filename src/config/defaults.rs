pub const DEFAULT_CONFIG_FILE: &str = "oxide-codegen.toml";
pub const DEFAULT_PROJECT_ROOT: &str = ".";
pub const DEFAULT_MANIFEST_PATH: &str = "Cargo.toml";
pub const DEFAULT_OVERRIDES_PATH: &str = ".oxide-codegen/overrides.json";
pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_TABLE_PREFIX: &str = "";
pub const DEFAULT_LEDGER: bool = true;
pub const DEFAULT_RUST_LOG: &str = "info";
pub const DEFAULT_OVERWRITE_PRISTINE: bool = false;
pub const DEFAULT_ENTITY_TRAITS: &[&str] = &["Serialize", "Deserialize"];
pub const DEFAULT_ROUTE_VALIDATION: bool = false;
