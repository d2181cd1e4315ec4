use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("template '{template}' failed to render: {message}")]
    Render { template: String, message: String },
    #[error("invalid override for table '{table}': {message}")]
    InvalidOverride { table: String, message: String },
    #[error("invalid identifier '{ident}' for {label}")]
    InvalidIdent { ident: String, label: &'static str },
}

pub type CodegenResult<T> = Result<T, CodegenError>;

impl CodegenError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn render(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            template: template.into(),
            message: message.into(),
        }
    }

    pub fn invalid_override(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOverride {
            table: table.into(),
            message: message.into(),
        }
    }
}
