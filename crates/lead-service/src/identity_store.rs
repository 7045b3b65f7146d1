//! Per-caller profiles and role assignments

use crate::storage::Backend;
use leads_common::{Identity, Result, UserProfile, UserRole};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct IdentityTable {
    profiles: HashMap<Identity, UserProfile>,
    roles: HashMap<Identity, UserRole>,
}

/// Owned store of identity → profile and identity → role.
///
/// Guarded by a single lock, separate from the lead collection.
pub struct IdentityStore {
    table: RwLock<IdentityTable>,
    backend: Arc<dyn Backend>,
}

impl IdentityStore {
    /// Load persisted identities and grant admin to every bootstrap identity.
    pub async fn open(backend: Arc<dyn Backend>, bootstrap_admins: &[Identity]) -> Result<Self> {
        let snapshot = backend.load_identities().await?;

        let mut table = IdentityTable {
            profiles: snapshot.profiles.into_iter().collect(),
            roles: snapshot.roles.into_iter().collect(),
        };

        for admin in bootstrap_admins {
            if admin.is_anonymous() {
                continue;
            }
            if table.roles.get(admin) != Some(&UserRole::Admin) {
                backend.save_role(admin, UserRole::Admin).await?;
                table.roles.insert(admin.clone(), UserRole::Admin);
                info!("Granted bootstrap admin role to {}", admin);
            }
        }

        info!(
            "Identity store opened: {} profiles, {} roles",
            table.profiles.len(),
            table.roles.len()
        );

        Ok(Self {
            table: RwLock::new(table),
            backend,
        })
    }

    /// Role of `identity`; guest when never assigned
    pub async fn role_of(&self, identity: &Identity) -> UserRole {
        let table = self.table.read().await;
        table.roles.get(identity).copied().unwrap_or_default()
    }

    pub async fn profile_of(&self, identity: &Identity) -> Option<UserProfile> {
        let table = self.table.read().await;
        table.profiles.get(identity).cloned()
    }

    /// Upsert the profile of `identity`. The first save records an explicit
    /// guest role for identities that have none yet.
    pub async fn save_profile(&self, identity: &Identity, profile: UserProfile) -> Result<()> {
        let mut table = self.table.write().await;

        let needs_role = !table.roles.contains_key(identity);
        if needs_role {
            self.backend.save_role(identity, UserRole::Guest).await?;
        }
        self.backend.save_profile(identity, &profile).await?;

        if needs_role {
            table.roles.insert(identity.clone(), UserRole::Guest);
        }
        table.profiles.insert(identity.clone(), profile);

        debug!("Saved profile for {}", identity);
        Ok(())
    }

    /// Idempotent role upsert
    pub async fn assign_role(&self, identity: &Identity, role: UserRole) -> Result<()> {
        let mut table = self.table.write().await;

        self.backend.save_role(identity, role).await?;
        table.roles.insert(identity.clone(), role);

        info!("Assigned role {} to {}", role, identity);
        Ok(())
    }

    /// Release the store. Every write is already persisted, so this only
    /// reports what is being left behind.
    pub async fn shutdown(&self) {
        let table = self.table.read().await;
        info!(
            "Identity store closed: {} profiles, {} roles on {} backend",
            table.profiles.len(),
            table.roles.len(),
            self.backend.name()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            company: None,
        }
    }

    async fn open_empty() -> (IdentityStore, MemoryBackend) {
        let backend = MemoryBackend::new();
        let store = IdentityStore::open(Arc::new(backend.clone()), &[])
            .await
            .unwrap();
        (store, backend)
    }

    #[tokio::test]
    async fn test_unknown_identity_is_guest_without_profile() {
        let (store, _) = open_empty().await;
        let who = Identity::from("nobody");
        assert_eq!(store.role_of(&who).await, UserRole::Guest);
        assert_eq!(store.profile_of(&who).await, None);
    }

    #[tokio::test]
    async fn test_first_save_records_guest_role() {
        let (store, backend) = open_empty().await;
        let who = Identity::from("ana");

        store.save_profile(&who, profile("Ana")).await.unwrap();

        assert_eq!(store.profile_of(&who).await, Some(profile("Ana")));
        let snapshot = backend.load_identities().await.unwrap();
        assert_eq!(snapshot.roles, vec![(who, UserRole::Guest)]);
    }

    #[tokio::test]
    async fn test_save_keeps_existing_role() {
        let (store, _) = open_empty().await;
        let who = Identity::from("ana");

        store.assign_role(&who, UserRole::User).await.unwrap();
        store.save_profile(&who, profile("Ana")).await.unwrap();
        store.save_profile(&who, profile("Ana Maria")).await.unwrap();

        assert_eq!(store.role_of(&who).await, UserRole::User);
        assert_eq!(store.profile_of(&who).await, Some(profile("Ana Maria")));
    }

    #[tokio::test]
    async fn test_bootstrap_admins_and_reopen() {
        let backend = MemoryBackend::new();
        let root = Identity::from("root");
        let store = IdentityStore::open(Arc::new(backend.clone()), &[root.clone(), Identity::anonymous()])
            .await
            .unwrap();
        assert_eq!(store.role_of(&root).await, UserRole::Admin);
        assert_eq!(store.role_of(&Identity::anonymous()).await, UserRole::Guest);

        store.save_profile(&root, profile("Root")).await.unwrap();
        store.shutdown().await;

        let reopened = IdentityStore::open(Arc::new(backend), &[]).await.unwrap();
        assert_eq!(reopened.role_of(&root).await, UserRole::Admin);
        assert_eq!(reopened.profile_of(&root).await, Some(profile("Root")));
    }
}
