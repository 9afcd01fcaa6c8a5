use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::SnapshotStore;

const STATE_FORMAT_VERSION: u32 = 1;

/// Small persisted record of UI-facing session settings: theme, editor-mode
/// flag, outline panel visibility and splitter position. Round-tripped
/// through the `state` store record; a corrupt or unknown-version blob falls
/// back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default = "SessionState::default_version")]
    pub version: u32,
    pub theme: String,
    pub vim_mode: bool,
    pub toc_visible: bool,
    pub splitter_position: u8,
    pub modified_at: DateTime<Utc>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            version: STATE_FORMAT_VERSION,
            theme: String::from("light"),
            vim_mode: false,
            toc_visible: false,
            splitter_position: 50,
            modified_at: Utc::now(),
        }
    }
}

impl SessionState {
    fn default_version() -> u32 {
        STATE_FORMAT_VERSION
    }

    /// Repair out-of-range values in place, logging each correction.
    pub fn validate(&mut self) {
        if self.splitter_position > 100 {
            log::warn!(
                "Invalid splitter position: {}, using default",
                self.splitter_position
            );
            self.splitter_position = 50;
        }
        if self.theme.is_empty() {
            log::warn!("Empty theme name, using default");
            self.theme = String::from("light");
        }
    }

    pub fn load(store: &dyn SnapshotStore, key: &str) -> Self {
        match store.load(key) {
            Ok(Some(blob)) => match serde_json::from_str::<Self>(&blob) {
                Ok(mut state) => {
                    if state.version != STATE_FORMAT_VERSION {
                        log::warn!("Unknown state record version {}", state.version);
                        return Self::default();
                    }
                    state.validate();
                    state
                }
                Err(e) => {
                    log::error!("Failed to parse state record: {}", e);
                    Self::default()
                }
            },
            Ok(None) => Self::default(),
            Err(e) => {
                log::error!("Failed to load state: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&mut self, store: &mut dyn SnapshotStore, key: &str) -> Result<()> {
        self.validate();
        self.modified_at = Utc::now();
        let json = serde_json::to_string(self)?;
        store.save(key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_default_state() {
        let state = SessionState::default();
        assert_eq!(state.theme, "light");
        assert!(!state.vim_mode);
        assert!(!state.toc_visible);
        assert_eq!(state.splitter_position, 50);
    }

    #[test]
    fn test_roundtrip() {
        let mut store = MemoryStore::new();
        let mut state = SessionState::default();
        state.theme = String::from("dark");
        state.vim_mode = true;
        state.splitter_position = 70;
        state.save(&mut store, "state").unwrap();

        let loaded = SessionState::load(&store, "state");
        assert_eq!(loaded.theme, "dark");
        assert!(loaded.vim_mode);
        assert_eq!(loaded.splitter_position, 70);
    }

    #[test]
    fn test_validate_repairs_values() {
        let mut state = SessionState::default();
        state.splitter_position = 150;
        state.theme = String::new();
        state.validate();
        assert_eq!(state.splitter_position, 50);
        assert_eq!(state.theme, "light");
    }

    #[test]
    fn test_corrupt_blob_falls_back_to_default() {
        let mut store = MemoryStore::new();
        store.save("state", "{{{{").unwrap();
        let loaded = SessionState::load(&store, "state");
        assert_eq!(loaded, SessionState { modified_at: loaded.modified_at.clone(), ..SessionState::default() });
    }

    #[test]
    fn test_unknown_version_falls_back_to_default() {
        let mut store = MemoryStore::new();
        let blob = r#"{"version":9,"theme":"dark","vim_mode":true,"toc_visible":false,"splitter_position":50,"modified_at":"2024-01-01T00:00:00Z"}"#;
        store.save("state", blob).unwrap();
        let loaded = SessionState::load(&store, "state");
        assert_eq!(loaded.theme, "light");
    }

    #[test]
    fn test_missing_record_is_default() {
        let store = MemoryStore::new();
        let loaded = SessionState::load(&store, "state");
        assert_eq!(loaded.theme, "light");
    }
}
