//! Process-wide preferences — a flat key → byte-blob store.
//!
//! Callers serialize whatever they persist (window geometry, etc.) into an
//! opaque `Vec<u8>` themselves; this module only moves blobs to and from
//! disk. The store is a bincode-encoded map written to the platform config
//! directory, loaded once at startup and saved explicitly.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

pub struct Prefs {
    values: HashMap<String, Vec<u8>>,
    path: Option<PathBuf>,
}

impl Prefs {
    /// Load the store from the default platform location.
    /// A missing or unreadable file yields an empty store.
    pub fn load() -> Self {
        Self::load_from(Self::prefs_path())
    }

    /// Load the store from an explicit location (`None` = in-memory only).
    /// A corrupt file is treated the same as a missing one.
    pub fn load_from(path: Option<PathBuf>) -> Self {
        let values = path
            .as_deref()
            .and_then(|p| fs::read(p).ok())
            .and_then(|raw| bincode::deserialize(&raw).ok())
            .unwrap_or_default();
        Self { values, path }
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.values.get(key).map(Vec::as_slice)
    }

    pub fn set(&mut self, key: &str, value: Vec<u8>) {
        self.values.insert(key.to_string(), value);
    }

    /// Write the store back to disk. Best-effort: failures are logged and
    /// otherwise ignored so closing the dialog can never fail on I/O.
    pub fn save(&self) {
        let Some(path) = &self.path else { return };
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match bincode::serialize(&self.values) {
            Ok(raw) => {
                if let Err(e) = fs::write(path, raw) {
                    crate::log_warn!("failed to write preferences to {:?}: {}", path, e);
                }
            }
            Err(e) => {
                crate::log_warn!("failed to encode preferences: {}", e);
            }
        }
    }

    /// Platform location of the preferences file.
    /// On Linux:   ~/.config/imagetrim/prefs.bin  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\ImageTrim\prefs.bin
    /// On macOS:   ~/Library/Application Support/ImageTrim/prefs.bin
    /// Fallback:   same directory as the executable.
    fn prefs_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("imagetrim");
            return Some(config_dir.join("prefs.bin"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("ImageTrim").join("prefs.bin"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("ImageTrim")
                    .join("prefs.bin"),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("imagetrim_prefs.bin")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("imagetrim-prefs-test-{}-{}.bin", name, std::process::id()))
    }

    #[test]
    fn set_get_roundtrip() {
        let mut prefs = Prefs::load_from(None);
        assert!(prefs.get("geometry").is_none());

        prefs.set("geometry", vec![1, 2, 3, 4]);
        assert_eq!(prefs.get("geometry"), Some(&[1u8, 2, 3, 4][..]));

        // Overwrite replaces the old blob
        prefs.set("geometry", vec![9]);
        assert_eq!(prefs.get("geometry"), Some(&[9u8][..]));
    }

    #[test]
    fn save_load_roundtrip() {
        let path = temp_store("roundtrip");
        let _ = fs::remove_file(&path);

        let mut prefs = Prefs::load_from(Some(path.clone()));
        prefs.set("a", vec![0xAA; 16]);
        prefs.set("b", Vec::new());
        prefs.save();

        let reloaded = Prefs::load_from(Some(path.clone()));
        assert_eq!(reloaded.get("a"), Some(&[0xAA; 16][..]));
        assert_eq!(reloaded.get("b"), Some(&[][..]));
        assert!(reloaded.get("c").is_none());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_loads_empty() {
        let path = temp_store("missing");
        let _ = fs::remove_file(&path);
        let prefs = Prefs::load_from(Some(path));
        assert!(prefs.get("anything").is_none());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let path = temp_store("corrupt");
        fs::write(&path, b"definitely not bincode").unwrap();

        let prefs = Prefs::load_from(Some(path.clone()));
        assert!(prefs.get("anything").is_none());

        let _ = fs::remove_file(&path);
    }
}
