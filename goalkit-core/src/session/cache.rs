//! Cached session pair (bearer token and user record) on top of a [`SessionStore`].

use std::sync::Arc;

use log::warn;
use secrecy::{ExposeSecret, SecretString};

use crate::{
    config::SessionConfig,
    error::GoalKitError,
    identity::User,
    store::{SessionStore, StoreResult},
};

pub(crate) struct SessionCache {
    store: Arc<dyn SessionStore>,
    token_key: String,
    user_key: String,
}

impl SessionCache {
    pub(crate) fn new(store: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        Self {
            store,
            token_key: config.token_key.clone(),
            user_key: config.user_key.clone(),
        }
    }

    pub(crate) fn token(&self) -> StoreResult<Option<SecretString>> {
        Ok(self
            .store
            .get(&self.token_key)?
            .filter(|token| !token.is_empty())
            .map(SecretString::from))
    }

    /// A record that no longer decodes is treated as absent.
    pub(crate) fn user(&self) -> StoreResult<Option<User>> {
        let Some(raw) = self.store.get(&self.user_key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!("Ignoring undecodable cached user record: {e}");
                Ok(None)
            }
        }
    }

    /// Both halves must be present.
    pub(crate) fn load(&self) -> StoreResult<Option<(SecretString, User)>> {
        match (self.token()?, self.user()?) {
            (Some(token), Some(user)) => Ok(Some((token, user))),
            _ => Ok(None),
        }
    }

    pub(crate) fn store_user(&self, user: &User) -> Result<(), GoalKitError> {
        let json =
            serde_json::to_string(user).map_err(|e| GoalKitError::SerializationError {
                error: format!("Failed to serialize user record: {e}"),
            })?;
        self.store.set(&self.user_key, &json)?;
        Ok(())
    }

    /// Writes the pair; a half-written pair is rolled back.
    pub(crate) fn persist(
        &self,
        token: &SecretString,
        user: &User,
    ) -> Result<(), GoalKitError> {
        self.store.set(&self.token_key, token.expose_secret())?;
        if let Err(e) = self.store_user(user) {
            if let Err(rollback) = self.store.remove(&self.token_key) {
                warn!("Failed to roll back cached token: {rollback}");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Removes both halves, attempting the second even if the first fails.
    pub(crate) fn clear(&self) -> StoreResult<()> {
        let token = self.store.remove(&self.token_key);
        let user = self.store.remove(&self.user_key);
        token.and(user)
    }
}
