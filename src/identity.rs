//! Identity/role resolution boundary.
//!
//! Who is a clinician is decided outside this crate. The gate only needs a
//! resolver that turns a credential into an [`Actor`]; any resolution
//! failure is treated as a hard rejection before the record is loaded.

use crate::{models::ActorRole, Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Actor {
    pub email: String,
    pub role: ActorRole,
}

#[async_trait]
pub trait ActorResolver: Send + Sync {
    async fn resolve(&self, credential: &str) -> Result<Actor>;
}

/// Fixed-table resolver for tests and embedded deployments.
#[derive(Default)]
pub struct StaticActorResolver {
    actors: HashMap<String, Actor>,
}

impl StaticActorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, credential: impl Into<String>, actor: Actor) {
        self.actors.insert(credential.into(), actor);
    }
}

#[async_trait]
impl ActorResolver for StaticActorResolver {
    async fn resolve(&self, credential: &str) -> Result<Actor> {
        self.actors
            .get(credential)
            .cloned()
            .ok_or_else(|| Error::NotAuthorized("unknown credential".to_string()))
    }
}
