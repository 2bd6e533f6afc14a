//! Earning ledger operations: accrual, the approval gate, release,
//! cancellation.
//!
//! Earnings reach `paid` only through [`Engine::complete_payout`]; this
//! module stops at `available`.

use crate::error::{EngineError, EngineResult};
use crate::Engine;
use lancer_domain::{
    Actor, Amount, DomainError, Earning, EarningId, EarningSource, EarningStatus, OrderId,
    PartnerId,
};
use lancer_store::Store;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Parameters for recording an earning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEarning {
    /// Partner the money is owed to
    pub partner: PartnerId,
    /// Amount owed, strictly positive
    pub amount: Decimal,
    /// Origin of the earning
    pub source: EarningSource,
    /// Order the earning accrued from, if any
    #[serde(default)]
    pub order_id: Option<OrderId>,
    /// Requested initial status; defaults to `pending_approval`, and
    /// approval-gated sources are held there regardless
    #[serde(default)]
    pub initial_status: Option<EarningStatus>,
}

impl<S: Store> Engine<S> {
    /// Record an earning for a partner.
    pub async fn create_earning(&self, new: NewEarning, actor: Actor) -> EngineResult<Earning> {
        self.ensure_privileged(actor, "record an earning")?;

        self.get_partner(&new.partner).await?;
        let amount = Amount::new(new.amount)?;
        let earning = Earning::new(
            new.partner,
            amount,
            new.source,
            new.order_id,
            new.initial_status,
        )?;
        self.store().earnings().save(&earning).await?;

        info!(
            earning_id = %earning.id,
            partner = %earning.partner,
            amount = %earning.amount,
            source = earning.source.name(),
            status = earning.status.name(),
            "earning recorded"
        );
        Ok(earning)
    }

    /// Fetch one earning.
    pub async fn get_earning(&self, id: &EarningId) -> EngineResult<Earning> {
        self.store()
            .earnings()
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("earning", id.to_string()))
    }

    /// Pass an earning through the approval gate
    /// (`pending_approval -> available`).
    pub async fn approve_earning(&self, id: &EarningId, actor: Actor) -> EngineResult<Earning> {
        self.ensure_privileged(actor, "approve an earning")?;
        let _guard = self.lock_txn().await?;

        let mut earning = self.get_earning(id).await?;
        if !earning.approve(actor) {
            return Err(invalid_earning_move(&earning, EarningStatus::Available));
        }
        self.store().earnings().save(&earning).await?;

        info!(earning_id = %earning.id, partner = %earning.partner, "earning approved");
        Ok(earning)
    }

    /// Refuse an earning at the approval gate.
    pub async fn reject_earning(
        &self,
        id: &EarningId,
        reason: String,
        actor: Actor,
    ) -> EngineResult<Earning> {
        self.ensure_privileged(actor, "reject an earning")?;
        let _guard = self.lock_txn().await?;

        let mut earning = self.get_earning(id).await?;
        if !earning.reject(actor, reason) {
            return Err(invalid_earning_move(&earning, EarningStatus::Rejected));
        }
        self.store().earnings().save(&earning).await?;

        info!(earning_id = %earning.id, partner = %earning.partner, "earning rejected");
        Ok(earning)
    }

    /// Release an ungated earning to `available`. Approval-gated sources
    /// only release through [`Engine::approve_earning`].
    pub async fn release_earning(&self, id: &EarningId, actor: Actor) -> EngineResult<Earning> {
        self.ensure_privileged(actor, "release an earning")?;
        let _guard = self.lock_txn().await?;

        let mut earning = self.get_earning(id).await?;
        if !earning.mark_available() {
            return Err(invalid_earning_move(&earning, EarningStatus::Available));
        }
        self.store().earnings().save(&earning).await?;

        info!(earning_id = %earning.id, partner = %earning.partner, "earning released");
        Ok(earning)
    }

    /// Void an earning. Legal from any non-`paid`, non-`cancelled` status.
    pub async fn cancel_earning(
        &self,
        id: &EarningId,
        reason: String,
        actor: Actor,
    ) -> EngineResult<Earning> {
        self.ensure_privileged(actor, "cancel an earning")?;
        let _guard = self.lock_txn().await?;

        let mut earning = self.get_earning(id).await?;
        if !earning.cancel(reason) {
            return Err(invalid_earning_move(&earning, EarningStatus::Cancelled));
        }
        self.store().earnings().save(&earning).await?;

        info!(earning_id = %earning.id, partner = %earning.partner, "earning cancelled");
        Ok(earning)
    }

    /// A partner's full ledger, oldest first. Partners read their own;
    /// operators read anyone's.
    pub async fn earnings_for_partner(
        &self,
        partner: &PartnerId,
        actor: Actor,
    ) -> EngineResult<Vec<Earning>> {
        self.ensure_self_or_privileged(actor, *partner, "read this partner's earnings")?;
        Ok(self.store().earnings().find_by_partner(partner).await?)
    }

    /// A partner's claimable earnings: `available` and not linked to any
    /// payout.
    pub async fn available_earnings(
        &self,
        partner: &PartnerId,
        actor: Actor,
    ) -> EngineResult<Vec<Earning>> {
        self.ensure_self_or_privileged(actor, *partner, "read this partner's earnings")?;
        Ok(self
            .store()
            .earnings()
            .find_available_by_partner(partner)
            .await?)
    }
}

fn invalid_earning_move(earning: &Earning, to: EarningStatus) -> EngineError {
    DomainError::invalid_transition("earning", earning.status.name(), to.name()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lancer_store::MemoryStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use uuid::Uuid;

    fn engine() -> Engine<MemoryStore> {
        Engine::new(Arc::new(MemoryStore::new()))
    }

    async fn seed_partner(engine: &Engine<MemoryStore>) -> PartnerId {
        let id = Uuid::now_v7();
        engine
            .upsert_partner(id, "Partner".to_string(), true, Actor::system())
            .await
            .unwrap();
        id
    }

    fn new_earning(partner: PartnerId, source: EarningSource) -> NewEarning {
        NewEarning {
            partner,
            amount: dec!(120),
            source,
            order_id: None,
            initial_status: None,
        }
    }

    #[tokio::test]
    async fn test_create_earning_defaults_to_approval_gate() {
        let engine = engine();
        let partner = seed_partner(&engine).await;

        let earning = engine
            .create_earning(new_earning(partner, EarningSource::Bonus), Actor::system())
            .await
            .unwrap();
        assert_eq!(earning.status, EarningStatus::PendingApproval);
        assert_eq!(earning.amount.as_decimal(), dec!(120));
    }

    #[tokio::test]
    async fn test_create_earning_honors_requested_status_unless_gated() {
        let engine = engine();
        let partner = seed_partner(&engine).await;

        let mut new = new_earning(partner, EarningSource::Bonus);
        new.initial_status = Some(EarningStatus::Available);
        let bonus = engine.create_earning(new, Actor::system()).await.unwrap();
        assert_eq!(bonus.status, EarningStatus::Available);

        let mut new = new_earning(partner, EarningSource::Referral);
        new.initial_status = Some(EarningStatus::Available);
        let referral = engine.create_earning(new, Actor::system()).await.unwrap();
        assert_eq!(referral.status, EarningStatus::PendingApproval);
    }

    #[tokio::test]
    async fn test_create_earning_validations() {
        let engine = engine();
        let partner = seed_partner(&engine).await;

        // Only operators record earnings.
        let err = engine
            .create_earning(
                new_earning(partner, EarningSource::Other),
                Actor::freelancer(partner),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied { .. }));

        // Unknown partner.
        let err = engine
            .create_earning(
                new_earning(Uuid::now_v7(), EarningSource::Other),
                Actor::system(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "partner", .. }));

        // Non-positive amount.
        let mut new = new_earning(partner, EarningSource::Other);
        new.amount = dec!(0);
        let err = engine.create_earning(new, Actor::system()).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_approve_earning_releases_gated_source() {
        let engine = engine();
        let partner = seed_partner(&engine).await;
        let admin = Actor::admin(Uuid::now_v7());
        let earning = engine
            .create_earning(new_earning(partner, EarningSource::Referral), Actor::system())
            .await
            .unwrap();

        let approved = engine.approve_earning(&earning.id, admin).await.unwrap();
        assert_eq!(approved.status, EarningStatus::Available);
        assert_eq!(approved.approved_by, Some(admin));

        // A second approval is a hard failure, not a silent no-op.
        let err = engine.approve_earning(&earning.id, admin).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(DomainError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_reject_earning_records_reason() {
        let engine = engine();
        let partner = seed_partner(&engine).await;
        let admin = Actor::admin(Uuid::now_v7());
        let earning = engine
            .create_earning(
                new_earning(partner, EarningSource::Promotion),
                Actor::system(),
            )
            .await
            .unwrap();

        let rejected = engine
            .reject_earning(&earning.id, "No matching campaign".to_string(), admin)
            .await
            .unwrap();
        assert_eq!(rejected.status, EarningStatus::Rejected);
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some("No matching campaign")
        );
        assert_eq!(rejected.rejected_by, Some(admin));
    }

    #[tokio::test]
    async fn test_release_respects_approval_gate() {
        let engine = engine();
        let partner = seed_partner(&engine).await;
        let admin = Actor::admin(Uuid::now_v7());

        // Ungated earning parked at the gate releases directly.
        let bonus = engine
            .create_earning(new_earning(partner, EarningSource::Bonus), Actor::system())
            .await
            .unwrap();
        let released = engine.release_earning(&bonus.id, admin).await.unwrap();
        assert_eq!(released.status, EarningStatus::Available);

        // Gated earning does not.
        let referral = engine
            .create_earning(new_earning(partner, EarningSource::Referral), Actor::system())
            .await
            .unwrap();
        let err = engine.release_earning(&referral.id, admin).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(DomainError::InvalidTransition { .. })
        ));
        let reread = engine.get_earning(&referral.id).await.unwrap();
        assert_eq!(reread.status, EarningStatus::PendingApproval);
    }

    #[tokio::test]
    async fn test_cancel_earning() {
        let engine = engine();
        let partner = seed_partner(&engine).await;
        let admin = Actor::admin(Uuid::now_v7());
        let earning = engine
            .create_earning(new_earning(partner, EarningSource::Other), Actor::system())
            .await
            .unwrap();

        let cancelled = engine
            .cancel_earning(&earning.id, "duplicate entry".to_string(), admin)
            .await
            .unwrap();
        assert_eq!(cancelled.status, EarningStatus::Cancelled);
        assert_eq!(cancelled.cancel_reason.as_deref(), Some("duplicate entry"));

        // Cancelling again fails.
        let err = engine
            .cancel_earning(&earning.id, "again".to_string(), admin)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(DomainError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_partner_reads_own_ledger_only() {
        let engine = engine();
        let partner = seed_partner(&engine).await;
        engine
            .create_earning(new_earning(partner, EarningSource::Other), Actor::system())
            .await
            .unwrap();
        let mut released = new_earning(partner, EarningSource::Other);
        released.initial_status = Some(EarningStatus::Available);
        engine.create_earning(released, Actor::system()).await.unwrap();

        let me = Actor::freelancer(partner);
        assert_eq!(
            engine.earnings_for_partner(&partner, me).await.unwrap().len(),
            2
        );
        assert_eq!(
            engine.available_earnings(&partner, me).await.unwrap().len(),
            1
        );

        let stranger = Actor::freelancer(Uuid::now_v7());
        let err = engine
            .earnings_for_partner(&partner, stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied { .. }));
    }
}
