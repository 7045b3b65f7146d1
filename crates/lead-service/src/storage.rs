//! Persistence backends for leads, profiles and roles
//!
//! Redis data model:
//! - lead:{id} → JSON lead
//! - leads:all → Sorted set (score=creation sequence, member=lead id)
//! - profile:{identity} → JSON profile
//! - profiles:all → Set of identities with a profile
//! - role:{identity} → Role name
//! - roles:all → Set of identities with a role

use async_trait::async_trait;
use leads_common::{Error, Identity, Lead, Result, UserProfile, UserRole};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Everything the identity store needs to rebuild itself
#[derive(Debug, Default, Clone)]
pub struct IdentitySnapshot {
    pub profiles: Vec<(Identity, UserProfile)>,
    pub roles: Vec<(Identity, UserRole)>,
}

/// Durable home for service state.
///
/// Writes are issued before the in-memory commit, so a failing backend
/// leaves the service state untouched.
#[async_trait]
pub trait Backend: Send + Sync {
    /// All persisted leads, in no particular order
    async fn load_leads(&self) -> Result<Vec<Lead>>;

    /// Insert or overwrite a lead
    async fn save_lead(&self, lead: &Lead) -> Result<()>;

    async fn load_identities(&self) -> Result<IdentitySnapshot>;

    async fn save_profile(&self, identity: &Identity, profile: &UserProfile) -> Result<()>;

    async fn save_role(&self, identity: &Identity, role: UserRole) -> Result<()>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Process-local backend. Clones share the same records, so a service can
/// be reopened over the state a previous instance left behind.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    leads: HashMap<String, Lead>,
    profiles: HashMap<Identity, UserProfile>,
    roles: HashMap<Identity, UserRole>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn load_leads(&self) -> Result<Vec<Lead>> {
        let state = self.state.lock().await;
        Ok(state.leads.values().cloned().collect())
    }

    async fn save_lead(&self, lead: &Lead) -> Result<()> {
        let mut state = self.state.lock().await;
        state.leads.insert(lead.id.as_str().to_string(), lead.clone());
        Ok(())
    }

    async fn load_identities(&self) -> Result<IdentitySnapshot> {
        let state = self.state.lock().await;
        Ok(IdentitySnapshot {
            profiles: state
                .profiles
                .iter()
                .map(|(id, profile)| (id.clone(), profile.clone()))
                .collect(),
            roles: state.roles.iter().map(|(id, role)| (id.clone(), *role)).collect(),
        })
    }

    async fn save_profile(&self, identity: &Identity, profile: &UserProfile) -> Result<()> {
        let mut state = self.state.lock().await;
        state.profiles.insert(identity.clone(), profile.clone());
        Ok(())
    }

    async fn save_role(&self, identity: &Identity, role: UserRole) -> Result<()> {
        let mut state = self.state.lock().await;
        state.roles.insert(identity.clone(), role);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Redis-backed storage
pub struct RedisStorage {
    conn: ConnectionManager,
}

impl RedisStorage {
    /// Create a new storage instance
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(unavailable)?;

        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self { conn })
    }
}

fn unavailable(err: redis::RedisError) -> Error {
    Error::Unavailable(err.to_string())
}

// Each write is one MULTI/EXEC so a record and its index entry land together.

fn lead_write(lead: &Lead) -> Result<redis::Pipeline> {
    let json = serde_json::to_string(lead)?;
    // Score only orders the index; foreign ids sort first
    let score = lead.id.sequence().unwrap_or(0);

    let mut pipe = redis::pipe();
    pipe.atomic()
        .set(format!("lead:{}", lead.id), json)
        .ignore()
        .zadd("leads:all", lead.id.as_str(), score)
        .ignore();
    Ok(pipe)
}

fn profile_write(identity: &Identity, profile: &UserProfile) -> Result<redis::Pipeline> {
    let json = serde_json::to_string(profile)?;

    let mut pipe = redis::pipe();
    pipe.atomic()
        .set(format!("profile:{}", identity), json)
        .ignore()
        .sadd("profiles:all", identity.as_str())
        .ignore();
    Ok(pipe)
}

fn role_write(identity: &Identity, role: UserRole) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .set(format!("role:{}", identity), role.as_str())
        .ignore()
        .sadd("roles:all", identity.as_str())
        .ignore();
    pipe
}

#[async_trait]
impl Backend for RedisStorage {
    async fn load_leads(&self) -> Result<Vec<Lead>> {
        let mut conn = self.conn.clone();

        let ids: Vec<String> = conn.zrange("leads:all", 0, -1).await.map_err(unavailable)?;

        let mut leads = Vec::with_capacity(ids.len());
        for id in &ids {
            let json: Option<String> = conn
                .get(format!("lead:{}", id))
                .await
                .map_err(unavailable)?;
            match json {
                Some(data) => leads.push(serde_json::from_str(&data)?),
                None => debug!("Lead {} indexed but missing", id),
            }
        }

        Ok(leads)
    }

    async fn save_lead(&self, lead: &Lead) -> Result<()> {
        let mut conn = self.conn.clone();

        let _: () = lead_write(lead)?
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        debug!("Saved lead {}", lead.id);
        Ok(())
    }

    async fn load_identities(&self) -> Result<IdentitySnapshot> {
        let mut conn = self.conn.clone();
        let mut snapshot = IdentitySnapshot::default();

        let with_profile: Vec<String> = conn.smembers("profiles:all").await.map_err(unavailable)?;
        for id in with_profile {
            let json: Option<String> = conn
                .get(format!("profile:{}", id))
                .await
                .map_err(unavailable)?;
            if let Some(data) = json {
                snapshot
                    .profiles
                    .push((Identity::new(id), serde_json::from_str(&data)?));
            }
        }

        let with_role: Vec<String> = conn.smembers("roles:all").await.map_err(unavailable)?;
        for id in with_role {
            let role: Option<String> = conn
                .get(format!("role:{}", id))
                .await
                .map_err(unavailable)?;
            if let Some(role) = role {
                snapshot.roles.push((Identity::new(id), role.parse()?));
            }
        }

        Ok(snapshot)
    }

    async fn save_profile(&self, identity: &Identity, profile: &UserProfile) -> Result<()> {
        let mut conn = self.conn.clone();

        let _: () = profile_write(identity, profile)?
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        debug!("Saved profile for {}", identity);
        Ok(())
    }

    async fn save_role(&self, identity: &Identity, role: UserRole) -> Result<()> {
        let mut conn = self.conn.clone();

        let _: () = role_write(identity, role)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        debug!("Saved role {} for {}", role, identity);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
