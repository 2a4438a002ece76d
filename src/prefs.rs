//! Persisted client-side preferences.
//!
//! The only persisted flag is whether the first-run guided tour has been
//! completed, stored under a fixed key in a small JSON file.

use std::path::PathBuf;

use crate::error::Result;

/// Key of the guided-tour completion flag.
pub const TOUR_COMPLETED_KEY: &str = "conectahub.tour.completed";

/// Tiny key-value file for client-side flags.
pub struct LocalPrefs {
    path: PathBuf,
}

impl LocalPrefs {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Whether the first-run tour was completed. Unreadable or missing
    /// prefs count as "not completed".
    pub fn tour_completed(&self) -> bool {
        self.read_map()
            .get(TOUR_COMPLETED_KEY)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_tour_completed(&self) -> Result<()> {
        let mut map = self.read_map();
        map.insert(TOUR_COMPLETED_KEY.to_string(), serde_json::Value::Bool(true));

        let contents = serde_json::to_string_pretty(&map)
            .map_err(|e| anyhow::anyhow!("Prefs serialization failed: {}", e))?;
        std::fs::write(&self.path, contents)
            .map_err(|e| anyhow::anyhow!("Prefs write failed: {}", e))?;
        Ok(())
    }

    fn read_map(&self) -> serde_json::Map<String, serde_json::Value> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_prefs(name: &str) -> LocalPrefs {
        let mut path = std::env::temp_dir();
        path.push(format!("conectahub_prefs_{}_{}.json", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        LocalPrefs::new(path)
    }

    #[test]
    fn test_tour_flag_defaults_false() {
        let prefs = temp_prefs("default");
        assert!(!prefs.tour_completed());
    }

    #[test]
    fn test_tour_flag_round_trip() {
        let prefs = temp_prefs("roundtrip");
        prefs.set_tour_completed().unwrap();
        assert!(prefs.tour_completed());
    }
}
