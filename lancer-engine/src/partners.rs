//! Partner projection sync.

use crate::error::{EngineError, EngineResult};
use crate::Engine;
use lancer_domain::{Actor, Partner, PartnerId};
use lancer_store::Store;
use tracing::debug;

impl<S: Store> Engine<S> {
    /// Create or refresh a partner projection. Upserts keep `created_at`
    /// from the first sighting.
    pub async fn upsert_partner(
        &self,
        id: PartnerId,
        display_name: String,
        available: bool,
        actor: Actor,
    ) -> EngineResult<Partner> {
        self.ensure_privileged(actor, "sync a partner")?;

        let partner = match self.store().partners().find_by_id(&id).await? {
            Some(mut existing) => {
                existing.display_name = display_name;
                existing.set_available(available);
                existing
            }
            None => Partner::new(id, display_name, available),
        };
        self.store().partners().save(&partner).await?;

        debug!(partner = %partner.id, available = partner.available, "partner synced");
        Ok(partner)
    }

    /// Fetch one partner projection.
    pub async fn get_partner(&self, id: &PartnerId) -> EngineResult<Partner> {
        self.store()
            .partners()
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("partner", id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lancer_store::MemoryStore;
    use std::sync::Arc;
    use uuid::Uuid;

    fn engine() -> Engine<MemoryStore> {
        Engine::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let engine = engine();
        let id = Uuid::now_v7();

        let created = engine
            .upsert_partner(id, "Ada".to_string(), true, Actor::system())
            .await
            .unwrap();
        assert!(created.available);

        let updated = engine
            .upsert_partner(id, "Ada Lovelace".to_string(), false, Actor::system())
            .await
            .unwrap();
        assert_eq!(updated.display_name, "Ada Lovelace");
        assert!(!updated.available);
        assert_eq!(updated.created_at, created.created_at);

        let fetched = engine.get_partner(&id).await.unwrap();
        assert_eq!(fetched.display_name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_upsert_requires_operator() {
        let engine = engine();
        let caller = Actor::freelancer(Uuid::now_v7());
        let err = engine
            .upsert_partner(caller.id, "Me".to_string(), true, caller)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_get_partner_not_found() {
        let engine = engine();
        let err = engine.get_partner(&Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
