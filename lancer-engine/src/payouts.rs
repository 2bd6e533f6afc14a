//! Payout operations: creation with conditional earning claims, the
//! single settlement path, cancel/fail reversal.
//!
//! Earnings reach `paid` in exactly one place, [`Engine::complete_payout`].
//! Completion is re-entrant: a payment webhook may deliver twice, and the
//! second run settles anything the first one missed without rewriting the
//! original settlement record.

use crate::error::{EngineError, EngineResult, ValidationReason};
use crate::Engine;
use lancer_domain::{
    Actor, Amount, Earning, EarningId, PartnerId, Payout, PayoutId, PayoutStatus, PayoutTimeline,
};
use lancer_store::Store;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Parameters for requesting a payout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayout {
    /// Partner to pay
    pub partner: PartnerId,
    /// How the money travels ("bank_transfer", "paypal", ...)
    pub payment_method: String,
    /// Method-specific routing details
    #[serde(default)]
    pub payment_details: Option<String>,
    /// Explicit total; ignored when earnings are claimed
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Earnings to claim; each must be claimable by this partner
    #[serde(default)]
    pub earning_ids: Vec<EarningId>,
}

/// Result of one settlement run.
#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    /// The payout after completion
    pub payout: Payout,
    /// Earnings settled by this run
    pub paid: Vec<Earning>,
    /// Whether this run moved the payout; `false` on a webhook retry
    pub changed: bool,
}

impl<S: Store> Engine<S> {
    /// Request a payout, optionally claiming specific earnings.
    ///
    /// With earning ids the payout amount is their sum and any explicit
    /// amount is ignored; the claimed earnings move to `processing` and
    /// link to the new payout. Without ids the caller must supply a
    /// positive amount.
    pub async fn create_payout(&self, new: NewPayout, actor: Actor) -> EngineResult<Payout> {
        self.ensure_self_or_privileged(actor, new.partner, "request a payout for this partner")?;
        let _guard = self.lock_txn().await?;

        self.get_partner(&new.partner).await?;

        let mut claims = Vec::with_capacity(new.earning_ids.len());
        for id in &new.earning_ids {
            let earning = self.get_earning(id).await?;
            if earning.partner != new.partner {
                return Err(EngineError::consistency(format!(
                    "earning {} belongs to partner {}, not {}",
                    earning.id, earning.partner, new.partner
                )));
            }
            if let Some(other) = &earning.payout_id {
                return Err(EngineError::consistency(format!(
                    "earning {} is already claimed by payout {}",
                    earning.id, other
                )));
            }
            if !earning.is_claimable() {
                return Err(EngineError::validation(
                    ValidationReason::EarningNotClaimable,
                    format!(
                        "earning {} is {}, not available",
                        earning.id, earning.status
                    ),
                ));
            }
            claims.push(earning);
        }

        let amount = if claims.is_empty() {
            match new.amount {
                Some(amount) if amount > Decimal::ZERO => Amount::new(amount)?,
                _ => {
                    return Err(EngineError::validation(
                        ValidationReason::AmountRequired,
                        "a payout without claimed earnings needs a positive amount",
                    ));
                }
            }
        } else {
            let total: Decimal = claims.iter().map(|e| e.amount.as_decimal()).sum();
            Amount::new(total)?
        };

        let seq = self.store().sequence().next_id().await?;
        let payout = Payout::new(
            PayoutId::from_seq(seq),
            new.partner,
            amount,
            new.payment_method,
            new.payment_details.unwrap_or_default(),
            actor,
        )?;
        for earning in &mut claims {
            earning.mark_processing(payout.id.clone());
        }
        let row = PayoutTimeline::new(payout.id.clone(), None, PayoutStatus::Pending, actor, None);

        let applied: EngineResult<()> = async {
            self.store().begin_transaction().await?;
            self.store().payouts().save(&payout).await?;
            for earning in &claims {
                self.store().earnings().save(earning).await?;
            }
            self.store().audit().append_payout_timeline(&row).await?;
            self.store().commit().await?;
            Ok(())
        }
        .await;
        if let Err(err) = applied {
            let _ = self.store().rollback().await;
            return Err(err);
        }

        info!(
            payout_id = %payout.id,
            partner = %payout.partner,
            amount = %payout.amount,
            claimed = claims.len(),
            "payout requested"
        );
        Ok(payout)
    }

    /// Fetch one payout.
    pub async fn get_payout(&self, id: &PayoutId) -> EngineResult<Payout> {
        self.store()
            .payouts()
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("payout", id.as_str()))
    }

    /// A partner's payouts, oldest first. Partners read their own;
    /// operators read anyone's.
    pub async fn payouts_for_partner(
        &self,
        partner: &PartnerId,
        actor: Actor,
    ) -> EngineResult<Vec<Payout>> {
        self.ensure_self_or_privileged(actor, *partner, "read this partner's payouts")?;
        Ok(self.store().payouts().find_by_partner(partner).await?)
    }

    /// A payout's timeline, oldest first.
    pub async fn payout_timeline(&self, id: &PayoutId) -> EngineResult<Vec<PayoutTimeline>> {
        self.get_payout(id).await?;
        Ok(self.store().audit().payout_timeline(id).await?)
    }

    /// Hand a payout to the payment rail: `pending -> processing`.
    pub async fn process_payout(&self, id: &PayoutId, actor: Actor) -> EngineResult<Payout> {
        self.ensure_privileged(actor, "process a payout")?;
        let _guard = self.lock_txn().await?;

        let mut payout = self.get_payout(id).await?;
        payout.mark_processing()?;
        let row = PayoutTimeline::new(
            payout.id.clone(),
            Some(PayoutStatus::Pending),
            PayoutStatus::Processing,
            actor,
            None,
        );

        self.store().begin_transaction().await?;
        self.store().payouts().save(&payout).await?;
        self.store().audit().append_payout_timeline(&row).await?;
        self.store().commit().await?;

        info!(payout_id = %payout.id, "payout processing");
        Ok(payout)
    }

    /// Settle a payout against the ledger.
    ///
    /// Three steps in one atomic operation: the payout completes with the
    /// external reference, its claimed earnings are marked paid, and any
    /// claimable earnings the partner accrued since the claim are swept
    /// into the payout and paid with it. On re-entry (the payout already
    /// completed) the first step is a no-op that keeps the original
    /// settlement record, the sweep still runs, and no timeline row is
    /// written.
    pub async fn complete_payout(
        &self,
        id: &PayoutId,
        transaction_id: String,
        actor: Actor,
    ) -> EngineResult<Settlement> {
        self.ensure_privileged(actor, "complete a payout")?;
        let _guard = self.lock_txn().await?;

        let mut payout = self.get_payout(id).await?;
        let previous = payout.status;
        let note = format!("transaction {}", &transaction_id);
        let changed = payout.complete(transaction_id, actor)?;

        let mut paid = Vec::new();
        for mut earning in self.store().earnings().find_by_payout(&payout.id).await? {
            if earning.mark_paid() {
                paid.push(earning);
            }
        }
        for mut earning in self
            .store()
            .earnings()
            .find_available_by_partner(&payout.partner)
            .await?
        {
            if earning.mark_processing(payout.id.clone()) && earning.mark_paid() {
                paid.push(earning);
            }
        }

        let row = changed.then(|| {
            PayoutTimeline::new(
                payout.id.clone(),
                Some(previous),
                PayoutStatus::Completed,
                actor,
                Some(note),
            )
        });

        let applied: EngineResult<()> = async {
            self.store().begin_transaction().await?;
            self.store().payouts().save(&payout).await?;
            for earning in &paid {
                self.store().earnings().save(earning).await?;
            }
            if let Some(row) = &row {
                self.store().audit().append_payout_timeline(row).await?;
            }
            self.store().commit().await?;
            Ok(())
        }
        .await;
        if let Err(err) = applied {
            let _ = self.store().rollback().await;
            return Err(err);
        }

        info!(
            payout_id = %payout.id,
            partner = %payout.partner,
            settled = paid.len(),
            changed,
            "payout completed"
        );
        Ok(Settlement {
            payout,
            paid,
            changed,
        })
    }

    /// Call a payout off before settlement, releasing its claims.
    ///
    /// Operators cancel any `pending` or `processing` payout; the payout's
    /// partner may cancel their own while it is still `pending`.
    pub async fn cancel_payout(
        &self,
        id: &PayoutId,
        reason: Option<String>,
        actor: Actor,
    ) -> EngineResult<Payout> {
        let _guard = self.lock_txn().await?;

        let mut payout = self.get_payout(id).await?;
        let may_cancel = actor.is_privileged()
            || (payout.partner == actor.id && payout.status == PayoutStatus::Pending);
        if !may_cancel {
            return Err(EngineError::permission_denied(
                actor,
                format!("cancel payout {}", payout.id),
            ));
        }

        let previous = payout.status;
        let reason = reason.unwrap_or_else(|| "cancelled before settlement".to_string());
        payout.cancel(reason.clone())?;
        let released = self.release_claims(&payout.id).await?;
        let row = PayoutTimeline::new(
            payout.id.clone(),
            Some(previous),
            PayoutStatus::Cancelled,
            actor,
            Some(reason),
        );

        let applied: EngineResult<()> = async {
            self.store().begin_transaction().await?;
            self.store().payouts().save(&payout).await?;
            for earning in &released {
                self.store().earnings().save(earning).await?;
            }
            self.store().audit().append_payout_timeline(&row).await?;
            self.store().commit().await?;
            Ok(())
        }
        .await;
        if let Err(err) = applied {
            let _ = self.store().rollback().await;
            return Err(err);
        }

        info!(
            payout_id = %payout.id,
            released = released.len(),
            "payout cancelled"
        );
        Ok(payout)
    }

    /// Record a rail failure, releasing the payout's claims.
    pub async fn fail_payout(
        &self,
        id: &PayoutId,
        message: String,
        actor: Actor,
    ) -> EngineResult<Payout> {
        self.ensure_privileged(actor, "fail a payout")?;
        let _guard = self.lock_txn().await?;

        let mut payout = self.get_payout(id).await?;
        let previous = payout.status;
        payout.fail(message.clone())?;
        let released = self.release_claims(&payout.id).await?;
        let row = PayoutTimeline::new(
            payout.id.clone(),
            Some(previous),
            PayoutStatus::Failed,
            actor,
            Some(message),
        );

        let applied: EngineResult<()> = async {
            self.store().begin_transaction().await?;
            self.store().payouts().save(&payout).await?;
            for earning in &released {
                self.store().earnings().save(earning).await?;
            }
            self.store().audit().append_payout_timeline(&row).await?;
            self.store().commit().await?;
            Ok(())
        }
        .await;
        if let Err(err) = applied {
            let _ = self.store().rollback().await;
            return Err(err);
        }

        info!(
            payout_id = %payout.id,
            released = released.len(),
            "payout failed"
        );
        Ok(payout)
    }

    /// Undo a dead payout's claims: `processing` earnings go back to
    /// `available`, any other non-paid link is dropped, settled earnings
    /// are never touched.
    async fn release_claims(&self, payout_id: &PayoutId) -> EngineResult<Vec<Earning>> {
        let mut released = Vec::new();
        for mut earning in self.store().earnings().find_by_payout(payout_id).await? {
            let reverted = earning.revert_to_available() || earning.clear_payout_link();
            if reverted {
                released.push(earning);
            }
        }
        Ok(released)
    }
}
