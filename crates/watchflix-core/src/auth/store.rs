use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use super::credentials::{Credential, Slot};

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// Durable storage for the three credential slots.
pub trait TokenStore: Send + Sync {
    fn read(&self, slot: Slot) -> Result<Option<String>>;

    fn write(&self, slot: Slot, value: &str) -> Result<()>;

    /// Remove every slot.
    fn clear(&self) -> Result<()>;

    fn load_credential(&self) -> Result<Option<Credential>> {
        Ok(Credential::from_slots(
            self.read(Slot::Username)?,
            self.read(Slot::AccessToken)?,
            self.read(Slot::RefreshToken)?,
        ))
    }

    fn save_credential(&self, credential: &Credential) -> Result<()> {
        self.write(Slot::Username, credential.username())?;
        self.write(Slot::AccessToken, credential.access_token())?;
        self.write(Slot::RefreshToken, credential.refresh_token())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl SessionFile {
    fn slot_mut(&mut self, slot: Slot) -> &mut Option<String> {
        match slot {
            Slot::Username => &mut self.username,
            Slot::AccessToken => &mut self.access_token,
            Slot::RefreshToken => &mut self.refresh_token,
        }
    }

    fn get(&self, slot: Slot) -> Option<String> {
        match slot {
            Slot::Username => self.username.clone(),
            Slot::AccessToken => self.access_token.clone(),
            Slot::RefreshToken => self.refresh_token.clone(),
        }
    }
}

/// All slots in one JSON document. Every write replaces the file through a
/// rename and `clear` deletes it, so the slots change together.
pub struct FileTokenStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    fn load_file(path: &Path) -> Result<SessionFile> {
        if !path.exists() {
            return Ok(SessionFile::default());
        }
        let contents = std::fs::read_to_string(path).context("Failed to read session file")?;
        serde_json::from_str(&contents).context("Failed to parse session file")
    }

    fn save_file(&self, file: &SessionFile) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(file)?;
        std::fs::write(&tmp, contents).context("Failed to write session file")?;
        std::fs::rename(&tmp, &path).context("Failed to replace session file")?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut SessionFile)) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| anyhow!("session file lock poisoned"))?;
        let mut file = Self::load_file(&self.path())?;
        apply(&mut file);
        self.save_file(&file)
    }
}

impl TokenStore for FileTokenStore {
    fn read(&self, slot: Slot) -> Result<Option<String>> {
        let _guard = self.lock.lock().map_err(|_| anyhow!("session file lock poisoned"))?;
        Ok(Self::load_file(&self.path())?.get(slot))
    }

    fn write(&self, slot: Slot, value: &str) -> Result<()> {
        self.update(|file| *file.slot_mut(slot) = Some(value.to_string()))
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| anyhow!("session file lock poisoned"))?;
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
        }
        Ok(())
    }

    fn load_credential(&self) -> Result<Option<Credential>> {
        let _guard = self.lock.lock().map_err(|_| anyhow!("session file lock poisoned"))?;
        let file = Self::load_file(&self.path())?;
        Ok(Credential::from_slots(
            file.username,
            file.access_token,
            file.refresh_token,
        ))
    }

    fn save_credential(&self, credential: &Credential) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| anyhow!("session file lock poisoned"))?;
        self.save_file(&SessionFile {
            username: Some(credential.username().to_string()),
            access_token: Some(credential.access_token().to_string()),
            refresh_token: Some(credential.refresh_token().to_string()),
        })
    }
}

/// Process-local slots; nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    slots: Mutex<BTreeMap<Slot, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<Slot, String>>> {
        self.slots.lock().map_err(|_| anyhow!("token store lock poisoned"))
    }
}

impl TokenStore for MemoryTokenStore {
    fn read(&self, slot: Slot) -> Result<Option<String>> {
        Ok(self.slots()?.get(&slot).cloned())
    }

    fn write(&self, slot: Slot, value: &str) -> Result<()> {
        self.slots()?.insert(slot, value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.slots()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested"));

        assert!(store.load_credential().unwrap().is_none());

        let credential = Credential::new("neo", "access-1", "refresh-1");
        store.save_credential(&credential).unwrap();
        assert!(store.path().exists());
        assert_eq!(store.load_credential().unwrap(), Some(credential));

        store.write(Slot::AccessToken, "access-2").unwrap();
        assert_eq!(store.read(Slot::AccessToken).unwrap().as_deref(), Some("access-2"));
        assert_eq!(store.read(Slot::RefreshToken).unwrap().as_deref(), Some("refresh-1"));

        store.clear().unwrap();
        assert!(!store.path().exists());
        for slot in Slot::ALL {
            assert_eq!(store.read(slot).unwrap(), None);
        }

        // Clearing an already empty store is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_uses_slot_keys_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        store
            .save_credential(&Credential::new("neo", "a", "r"))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["username"], "neo");
        assert_eq!(raw["accessToken"], "a");
        assert_eq!(raw["refreshToken"], "r");
    }

    #[test]
    fn test_partial_file_loads_as_anonymous() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        std::fs::write(store.path(), r#"{"username": "neo", "accessToken": "a"}"#).unwrap();
        assert!(store.load_credential().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        std::fs::write(store.path(), "not json").unwrap();
        assert!(store.load_credential().is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTokenStore::new();
        store.save_credential(&Credential::new("neo", "a", "r")).unwrap();
        assert_eq!(store.read(Slot::Username).unwrap().as_deref(), Some("neo"));
        store.clear().unwrap();
        assert!(store.load_credential().unwrap().is_none());
    }
}
