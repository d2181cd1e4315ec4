use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CodegenError, CodegenResult};

pub const LEDGER_PATH: &str = ".oxide-codegen/ledger.json";
const LEDGER_VERSION: u32 = 1;

/// Hashes of the content last written to each generated file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Ledger {
    pub version: u32,
    pub files: BTreeMap<String, String>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            version: LEDGER_VERSION,
            files: BTreeMap::new(),
        }
    }
}

impl Ledger {
    pub fn load(path: &Path) -> CodegenResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents =
            fs::read_to_string(path).map_err(|err| CodegenError::io("read", path, err))?;
        serde_json::from_str(&contents).map_err(|source| CodegenError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> CodegenResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| CodegenError::io("create", parent, err))?;
        }
        let mut contents = serde_json::to_string_pretty(self).map_err(|source| {
            CodegenError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        contents.push('\n');
        fs::write(path, contents).map_err(|err| CodegenError::io("write", path, err))
    }

    pub fn record(&mut self, path: &Path, contents: &str) {
        self.files.insert(ledger_key(path), hash_str(contents));
    }

    /// `true` when `contents` is exactly what was last written to `path`.
    pub fn is_pristine(&self, path: &Path, contents: &str) -> bool {
        self.files
            .get(&ledger_key(path))
            .is_some_and(|hash| *hash == hash_str(contents))
    }
}

fn ledger_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

pub fn hash_str(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_lowercase_sha256() {
        assert_eq!(
            hash_str(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn detects_pristine_files() {
        let mut ledger = Ledger::default();
        ledger.record(Path::new("src/dto/user_dto.rs"), "pub struct UserDto;\n");
        assert!(ledger.is_pristine(Path::new("src/dto/user_dto.rs"), "pub struct UserDto;\n"));
        assert!(!ledger.is_pristine(Path::new("src/dto/user_dto.rs"), "// edited\n"));
        assert!(!ledger.is_pristine(Path::new("src/vo/user_vo.rs"), "pub struct UserDto;\n"));
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(LEDGER_PATH);
        let mut ledger = Ledger::default();
        ledger.record(Path::new("src/entities/user.rs"), "x");
        ledger.save(&path).expect("save ledger");
        assert_eq!(Ledger::load(&path).expect("load ledger"), ledger);
        assert_eq!(
            Ledger::load(&dir.path().join("none.json")).expect("missing ledger"),
            Ledger::default()
        );
    }
}
