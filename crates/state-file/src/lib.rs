use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Key-value persistence for values the CLI remembers between runs
/// (last deployed contract address, RPC endpoint).
///
/// Stored as `KEY=VALUE` lines. Blank lines and `#` comments are ignored.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load a single value by key. Empty values count as missing.
    pub fn load_value(&self, key: &str) -> Option<String> {
        self.load_all()
            .remove(key)
            .filter(|value| !value.is_empty())
    }

    /// Save a single key-value pair, preserving the other entries.
    pub fn save_value(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.load_all();
        state.insert(key.to_string(), value.to_string());
        self.save_all(&state)
    }

    pub fn load_all(&self) -> BTreeMap<String, String> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return BTreeMap::new();
        };

        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect()
    }

    /// Write all entries, sorted by key.
    pub fn save_all(&self, state: &BTreeMap<String, String>) -> Result<()> {
        let content: String = state.iter().map(|(k, v)| format!("{k}={v}\n")).collect();
        fs::write(&self.path, content)
            .with_context(|| format!("failed to write state file {}", self.path.display()))
    }

    pub fn delete(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_state(name: &str) -> StateFile {
        let path = std::env::temp_dir().join(format!("{name}-{}.env", std::process::id()));
        let _ = fs::remove_file(&path);
        StateFile::new(path)
    }

    #[test]
    fn test_save_and_load_value() {
        let state = temp_state("fundraise_state_1");
        state.save_value("CONTRACT_ADDRESS", "0xabc").unwrap();
        assert_eq!(state.load_value("CONTRACT_ADDRESS"), Some("0xabc".to_string()));
        state.delete().unwrap();
    }

    #[test]
    fn test_load_value_nonexistent() {
        let state = StateFile::new("does-not-exist-fundraise.env");
        assert_eq!(state.load_value("RPC_URL"), None);
        assert!(state.load_all().is_empty());
    }

    #[test]
    fn test_save_preserves_other_values_sorted() {
        let state = temp_state("fundraise_state_2");
        state.save_value("RPC_URL", "http://127.0.0.1:8545").unwrap();
        state.save_value("CONTRACT_ADDRESS", "0xabc").unwrap();

        let contents = fs::read_to_string(state.path()).unwrap();
        assert_eq!(
            contents,
            "CONTRACT_ADDRESS=0xabc\nRPC_URL=http://127.0.0.1:8545\n"
        );
        state.delete().unwrap();
        assert!(!state.exists());
    }

    #[test]
    fn test_comments_and_empty_values_ignored() {
        let state = temp_state("fundraise_state_3");
        fs::write(state.path(), "# deployed by hand\nPRIVATE_KEY=\n RPC_URL = ws://x \n").unwrap();

        assert_eq!(state.load_value("PRIVATE_KEY"), None);
        assert_eq!(state.load_value("RPC_URL"), Some("ws://x".to_string()));
        state.delete().unwrap();
    }
}
