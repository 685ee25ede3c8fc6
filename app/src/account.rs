use std::path::PathBuf;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use webasto::Credentials;

#[derive(Debug, Serialize, Deserialize)]
struct AccountDocument {
    credentials: Credentials,
}

/// Persisted account credentials. The settings file seeds the store on first
/// start; afterwards the stored document wins, so a reauthorization through
/// the API survives restarts without touching the settings file.
pub struct AccountStore {
    path: PathBuf,
    active: RwLock<Credentials>,
}

impl AccountStore {
    pub async fn open(directory: impl Into<PathBuf>, seed: Credentials) -> anyhow::Result<Self> {
        let path = directory.into().join("account.json");

        let credentials = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let document: AccountDocument = serde_json::from_str(&raw)
                    .with_context(|| format!("Corrupt account store at {}", path.display()))?;
                document.credentials
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => seed,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Error reading account store at {}", path.display()))
            }
        };

        Ok(Self {
            path,
            active: RwLock::new(credentials),
        })
    }

    pub async fn active(&self) -> Credentials {
        self.active.read().await.clone()
    }

    pub async fn persist(&self, credentials: &Credentials) -> anyhow::Result<()> {
        let document = AccountDocument {
            credentials: credentials.clone(),
        };
        let raw = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, raw)
            .await
            .with_context(|| format!("Error writing account store to {}", self.path.display()))?;

        *self.active.write().await = credentials.clone();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_owned(),
            password: password.to_owned(),
        }
    }

    #[tokio::test]
    async fn settings_seed_the_first_start() {
        let dir = tempfile::tempdir().unwrap();

        let store = AccountStore::open(dir.path(), credentials("owner@example.com", "pw"))
            .await
            .unwrap();

        assert_eq!(store.active().await.email, "owner@example.com");
    }

    #[tokio::test]
    async fn persisted_credentials_win_over_the_seed() {
        let dir = tempfile::tempdir().unwrap();

        let store = AccountStore::open(dir.path(), credentials("owner@example.com", "old"))
            .await
            .unwrap();
        store
            .persist(&credentials("owner@example.com", "rotated"))
            .await
            .unwrap();

        let reopened = AccountStore::open(dir.path(), credentials("owner@example.com", "old"))
            .await
            .unwrap();

        assert_eq!(reopened.active().await.password, "rotated");
    }
}
