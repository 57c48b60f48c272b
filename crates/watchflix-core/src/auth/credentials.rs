use std::fmt;

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};

use super::store::TokenStore;

/// Default keyring service name
pub const SERVICE_NAME: &str = "watchflix";

/// The three independently persisted credential slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Username,
    AccessToken,
    RefreshToken,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Username, Slot::AccessToken, Slot::RefreshToken];

    /// Storage key for this slot
    pub fn key(self) -> &'static str {
        match self {
            Slot::Username => "username",
            Slot::AccessToken => "accessToken",
            Slot::RefreshToken => "refreshToken",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// An authenticated identity: both tokens are always present.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    username: String,
    access_token: String,
    refresh_token: String,
}

impl Credential {
    pub fn new(
        username: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Assemble a credential from raw slot values. A missing or empty token
    /// in either slot means anonymous, never a half-authenticated session.
    pub fn from_slots(
        username: Option<String>,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) -> Option<Self> {
        let access_token = access_token.filter(|t| !t.is_empty())?;
        let refresh_token = refresh_token.filter(|t| !t.is_empty())?;
        Some(Self {
            username: username.unwrap_or_default(),
            access_token,
            refresh_token,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Same identity with a new access token, and a new refresh token when
    /// the server rotated it.
    pub fn refreshed(&self, access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            username: self.username.clone(),
            access_token,
            refresh_token: refresh_token.unwrap_or_else(|| self.refresh_token.clone()),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Token slots kept in the OS keychain, one entry per slot.
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, slot: Slot) -> Result<Entry> {
        Entry::new(&self.service, slot.key()).context("Failed to create keyring entry")
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn read(&self, slot: Slot) -> Result<Option<String>> {
        match self.entry(slot)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {} from keychain", slot)),
        }
    }

    fn write(&self, slot: Slot, value: &str) -> Result<()> {
        self.entry(slot)?
            .set_password(value)
            .with_context(|| format!("Failed to store {} in keychain", slot))
    }

    fn clear(&self) -> Result<()> {
        // Attempt every slot before reporting the first failure
        let mut first_error = None;
        for slot in Slot::ALL {
            let result = self.entry(slot).and_then(|entry| match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(e)
                    .with_context(|| format!("Failed to delete {} from keychain", slot)),
            });
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slots_requires_both_tokens() {
        let full = Credential::from_slots(
            Some("neo".to_string()),
            Some("access".to_string()),
            Some("refresh".to_string()),
        )
        .unwrap();
        assert_eq!(full.username(), "neo");
        assert_eq!(full.access_token(), "access");
        assert_eq!(full.refresh_token(), "refresh");

        assert!(Credential::from_slots(Some("neo".into()), Some("access".into()), None).is_none());
        assert!(Credential::from_slots(Some("neo".into()), None, Some("refresh".into())).is_none());
        assert!(
            Credential::from_slots(Some("neo".into()), Some(String::new()), Some("r".into()))
                .is_none()
        );

        // A missing username alone doesn't invalidate the tokens
        let nameless =
            Credential::from_slots(None, Some("a".into()), Some("r".into())).unwrap();
        assert_eq!(nameless.username(), "");
    }

    #[test]
    fn test_refreshed_keeps_identity() {
        let credential = Credential::new("trinity", "a1", "r1");

        let same_refresh = credential.refreshed("a2".to_string(), None);
        assert_eq!(same_refresh.username(), "trinity");
        assert_eq!(same_refresh.access_token(), "a2");
        assert_eq!(same_refresh.refresh_token(), "r1");

        let rotated = credential.refreshed("a3".to_string(), Some("r2".to_string()));
        assert_eq!(rotated.refresh_token(), "r2");
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let credential = Credential::new("morpheus", "secret-access", "secret-refresh");
        let debug = format!("{:?}", credential);
        assert!(debug.contains("morpheus"));
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
    }

    #[test]
    fn test_slot_keys() {
        let keys: Vec<&str> = Slot::ALL.iter().map(|s| s.key()).collect();
        assert_eq!(keys, vec!["username", "accessToken", "refreshToken"]);
    }
}
