//! User repository: privileged management through the identity provider's
//! admin surface, with graceful degradation to a `profiles`-only listing for
//! sessions without elevated privileges.
//!
//! The capability object decides which path runs — callers never probe by
//! letting an admin call fail.

use std::sync::Arc;

use crate::auth::{AuthError, Capabilities, UserDirectory};
use crate::store::{RowStore, StoreError};
use crate::types::{NewUser, Profile, UserPatch, UserRecord};

pub const PROFILES_TABLE: &str = "profiles";

/// Errors from user management, from either collaborator.
#[derive(Debug, thiserror::Error)]
pub enum UserRepoError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A user listing plus how much of it the caller was allowed to see.
/// `degraded` listings carry no emails, roles, or statuses and admit no
/// admin actions.
#[derive(Debug)]
pub struct UserListing {
    pub users: Vec<UserRecord>,
    pub degraded: bool,
}

/// Fetch the profile row for a signed-in user (used by the session layer
/// right after authentication).
pub async fn fetch_profile<S: RowStore>(
    store: &S,
    user_id: &str,
) -> Result<Option<Profile>, StoreError> {
    match store.select_by_id(PROFILES_TABLE, user_id).await? {
        Some(row) => serde_json::from_value(row)
            .map(Some)
            .map_err(|e| StoreError::Decode(e.to_string())),
        None => Ok(None),
    }
}

pub struct UserRepository<S: RowStore, D: UserDirectory> {
    store: Arc<S>,
    directory: Arc<D>,
    capabilities: Capabilities,
}

impl<S: RowStore, D: UserDirectory> UserRepository<S, D> {
    pub fn new(store: Arc<S>, directory: Arc<D>, capabilities: Capabilities) -> Self {
        Self {
            store,
            directory,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// List users at the best fidelity the session allows.
    pub async fn list(&self) -> Result<UserListing, UserRepoError> {
        if self.capabilities.can_list_user_emails {
            let users = self.directory.list_users().await?;
            return Ok(UserListing {
                users,
                degraded: false,
            });
        }

        let rows = self
            .store
            .select(PROFILES_TABLE, Some("full_name.asc"))
            .await?;
        let users = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<Profile>(row) {
                Ok(profile) => Some(UserRecord {
                    id: profile.id.clone(),
                    name: profile.display_name().to_string(),
                    email: None,
                    department: None,
                    role: None,
                    status: None,
                }),
                Err(e) => {
                    log::warn!("skipping undecodable profile row: {}", e);
                    None
                }
            })
            .collect();

        Ok(UserListing {
            users,
            degraded: true,
        })
    }

    pub async fn create(&self, user: &NewUser) -> Result<UserRecord, UserRepoError> {
        if !self.capabilities.can_create_users {
            return Err(AuthError::Forbidden.into());
        }
        Ok(self.directory.create_user(user).await?)
    }

    pub async fn update(&self, id: &str, patch: &UserPatch) -> Result<UserRecord, UserRepoError> {
        if !self.capabilities.can_edit_users {
            return Err(AuthError::Forbidden.into());
        }
        Ok(self.directory.update_user(id, patch).await?)
    }

    pub async fn delete(&self, id: &str) -> Result<(), UserRepoError> {
        if !self.capabilities.can_delete_users {
            return Err(AuthError::Forbidden.into());
        }
        Ok(self.directory.delete_user(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::types::UserStatus;

    /// Directory double backed by a plain vector.
    #[derive(Default)]
    struct MemoryDirectory {
        users: Mutex<Vec<UserRecord>>,
    }

    impl MemoryDirectory {
        fn seeded() -> Self {
            let dir = Self::default();
            dir.users.lock().push(UserRecord {
                id: "u1".to_string(),
                name: "Ana Souza".to_string(),
                email: Some("ana@empresa.com".to_string()),
                department: Some("TI".to_string()),
                role: Some("admin".to_string()),
                status: Some(UserStatus::Active),
            });
            dir
        }
    }

    #[async_trait]
    impl UserDirectory for MemoryDirectory {
        async fn list_users(&self) -> Result<Vec<UserRecord>, AuthError> {
            Ok(self.users.lock().clone())
        }

        async fn create_user(&self, user: &NewUser) -> Result<UserRecord, AuthError> {
            let record = UserRecord {
                id: format!("u{}", self.users.lock().len() + 1),
                name: user.name.clone(),
                email: Some(user.email.clone()),
                department: user.department.clone(),
                role: user.role.clone(),
                status: Some(user.status),
            };
            self.users.lock().push(record.clone());
            Ok(record)
        }

        async fn update_user(
            &self,
            id: &str,
            patch: &UserPatch,
        ) -> Result<UserRecord, AuthError> {
            let mut users = self.users.lock();
            let user = users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or(AuthError::NotAuthenticated)?;
            if let Some(ref name) = patch.name {
                user.name = name.clone();
            }
            if let Some(status) = patch.status {
                user.status = Some(status);
            }
            Ok(user.clone())
        }

        async fn delete_user(&self, id: &str) -> Result<(), AuthError> {
            self.users.lock().retain(|u| u.id != id);
            Ok(())
        }
    }

    fn elevated() -> Capabilities {
        Capabilities {
            can_list_user_emails: true,
            can_create_users: true,
            can_edit_users: true,
            can_delete_users: true,
        }
    }

    #[tokio::test]
    async fn test_privileged_listing_has_full_columns() {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::seeded());
        let repo = UserRepository::new(store, directory, elevated());

        let listing = repo.list().await.unwrap();
        assert!(!listing.degraded);
        assert_eq!(listing.users.len(), 1);
        assert_eq!(listing.users[0].email.as_deref(), Some("ana@empresa.com"));
        assert_eq!(listing.users[0].status, Some(UserStatus::Active));
    }

    #[tokio::test]
    async fn test_degraded_listing_uses_profiles_only() {
        let store = Arc::new(MemoryStore::new());
        store.seed(
            PROFILES_TABLE,
            serde_json::json!({ "id": "u1", "full_name": "Ana Souza", "username": "ana" }),
        );
        store.seed(
            PROFILES_TABLE,
            serde_json::json!({ "id": "u2", "full_name": null, "username": "bruno" }),
        );
        let directory = Arc::new(MemoryDirectory::seeded());
        let repo = UserRepository::new(store, directory, Capabilities::default());

        let listing = repo.list().await.unwrap();
        assert!(listing.degraded);
        assert_eq!(listing.users.len(), 2);
        assert_eq!(listing.users[0].name, "Ana Souza");
        assert_eq!(listing.users[1].name, "bruno");
        // Identity-provider columns never appear in the degraded view.
        assert!(listing.users.iter().all(|u| u.email.is_none()));
        assert!(listing.users.iter().all(|u| u.status.is_none()));
    }

    #[tokio::test]
    async fn test_mutations_require_capability() {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::seeded());
        let repo = UserRepository::new(store, directory, Capabilities::default());

        let new_user = NewUser {
            name: "Novo".to_string(),
            email: "novo@empresa.com".to_string(),
            password: "segredo".to_string(),
            department: None,
            role: None,
            status: UserStatus::Active,
        };

        assert!(matches!(
            repo.create(&new_user).await,
            Err(UserRepoError::Auth(AuthError::Forbidden))
        ));
        assert!(matches!(
            repo.delete("u1").await,
            Err(UserRepoError::Auth(AuthError::Forbidden))
        ));
    }

    #[tokio::test]
    async fn test_create_and_update_through_directory() {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::seeded());
        let repo = UserRepository::new(store, directory.clone(), elevated());

        let created = repo
            .create(&NewUser {
                name: "Bruno Reis".to_string(),
                email: "bruno@empresa.com".to_string(),
                password: "segredo".to_string(),
                department: Some("Manutenção".to_string()),
                role: Some("tecnico".to_string()),
                status: UserStatus::Active,
            })
            .await
            .unwrap();
        assert_eq!(created.email.as_deref(), Some("bruno@empresa.com"));

        let patch = UserPatch {
            status: Some(UserStatus::Inactive),
            ..Default::default()
        };
        let updated = repo.update(&created.id, &patch).await.unwrap();
        assert_eq!(updated.status, Some(UserStatus::Inactive));
        assert_eq!(directory.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_profile() {
        let store = MemoryStore::new();
        store.seed(
            PROFILES_TABLE,
            serde_json::json!({ "id": "u9", "full_name": "Carla Dias", "avatar_url": null }),
        );

        let profile = fetch_profile(&store, "u9").await.unwrap().unwrap();
        assert_eq!(profile.display_name(), "Carla Dias");

        assert!(fetch_profile(&store, "missing").await.unwrap().is_none());
    }
}
