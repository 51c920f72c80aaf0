//! Optional credit metering of gateway calls.
//!
//! When enabled, each paid call is charged before it starts and refunded if
//! it fails. Accounting is best-effort: a refund that cannot be written is
//! logged and dropped.

use std::sync::Arc;

use kroma_models::{CreditCost, GenerationKind};
use kroma_store::CreditsService;
use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::metrics;

/// A successful deduction that may need refunding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charge {
    pub uid: String,
    pub amount: u32,
    pub kind: GenerationKind,
}

/// Charges gateway calls against the credits service.
#[derive(Clone)]
pub struct Meter {
    credits: Option<Arc<dyn CreditsService>>,
    costs: CreditCost,
}

impl Meter {
    /// A meter that never charges.
    pub fn disabled() -> Self {
        Self {
            credits: None,
            costs: CreditCost::default(),
        }
    }

    pub fn new(credits: Arc<dyn CreditsService>, costs: CreditCost) -> Self {
        Self {
            credits: Some(credits),
            costs,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.credits.is_some()
    }

    /// Deduct the price of `kind` from `user`.
    ///
    /// Returns `None` when metering is off or the call is free.
    pub async fn charge(
        &self,
        user: Option<&str>,
        kind: GenerationKind,
    ) -> PipelineResult<Option<Charge>> {
        let Some(credits) = &self.credits else {
            return Ok(None);
        };
        let amount = self.costs.for_kind(kind);
        if amount == 0 {
            return Ok(None);
        }

        let uid = user
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| PipelineError::validation("A user id is required for metered generation"))?;

        if !credits.deduct(uid, amount).await? {
            let available = credits.balance(uid).await?;
            return Err(PipelineError::InsufficientCredits {
                needed: amount,
                available,
            });
        }

        metrics::record_credits_charged(kind, amount);
        Ok(Some(Charge {
            uid: uid.to_string(),
            amount,
            kind,
        }))
    }

    /// Give a charge back after a failed call.
    pub async fn refund(&self, charge: Option<Charge>) {
        let (Some(credits), Some(charge)) = (&self.credits, charge) else {
            return;
        };

        match credits.credit(&charge.uid, charge.amount).await {
            Ok(profile) => {
                metrics::record_credits_refunded(charge.kind, charge.amount);
                info!(
                    user_id = %charge.uid,
                    credits = charge.amount,
                    kind = %charge.kind,
                    balance = profile.credits,
                    "Refunded credits"
                );
            }
            Err(e) => warn!(
                user_id = %charge.uid,
                credits = charge.amount,
                "Failed to refund credits: {}", e
            ),
        }
    }
}
