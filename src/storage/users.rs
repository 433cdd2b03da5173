//! Flat-file user database
//!
//! The whole array is read on every access and rewritten in full on every
//! insert. Ids are `count + 1` at insert time.
//!
//! Single writer only: two concurrent inserts can both read the same
//! snapshot, assign the same id, and the later rewrite drops the earlier
//! record. Nothing here guards against that.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Result, UserbaseError};
use crate::types::{NewUser, User, UserId};

/// JSON-file backed user store
#[derive(Debug, Clone)]
pub struct UserStore {
    path: PathBuf,
}

impl UserStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All users in insertion order. A missing file reads as empty.
    pub async fn list(&self) -> Result<Vec<User>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&raw).map_err(|e| {
            UserbaseError::Storage(format!("corrupt user file {}: {}", self.path.display(), e))
        })
    }

    pub async fn get(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.list().await?.into_iter().find(|u| u.id == id))
    }

    /// Append a user and rewrite the file; returns the stored record
    pub async fn create(&self, input: NewUser) -> Result<User> {
        let mut users = self.list().await?;
        let user = input.with_id(users.len() as UserId + 1);
        users.push(user.clone());
        self.write_all(&users).await?;
        tracing::info!(id = user.id, "Stored user");
        Ok(user)
    }

    async fn write_all(&self, users: &[User]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(users)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
