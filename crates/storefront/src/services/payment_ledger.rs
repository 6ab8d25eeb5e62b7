//! Payment confirmations tracked outside the session.
//!
//! Every request that modifies a session writes the whole record back, so a
//! processing flag stored there can be overwritten by a concurrent request
//! holding an older copy. The ledger keeps, per user, either the marker of a
//! confirmation still running or the wizard produced by the gateway's
//! answer, and the booking routes overlay it on whatever the session holds.
//!
//! Entries expire, so a confirmation that never reports back stops blocking
//! the wizard once the TTL passes.

use std::time::Duration;

use moka::Entry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};

use rotharc_core::{BookingWizard, UserId};

/// How long an entry outlives the gateway delay.
const SLOT_MARGIN: Duration = Duration::from_secs(600);

/// State of one user's payment.
#[derive(Debug, Clone)]
pub enum PaymentSlot {
    /// The gateway has not answered yet.
    InFlight,
    /// The gateway answered. `before` is the step 4 wizard the payment
    /// started from, `after` the wizard with the outcome applied.
    Settled {
        before: BookingWizard,
        after: BookingWizard,
    },
}

/// Per-user payment slots.
#[derive(Clone)]
pub struct PaymentLedger {
    slots: Cache<UserId, PaymentSlot>,
}

impl PaymentLedger {
    /// Create a ledger for a gateway that answers within `gateway_delay`.
    #[must_use]
    pub fn new(gateway_delay: Duration) -> Self {
        Self {
            slots: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(gateway_delay.saturating_add(SLOT_MARGIN))
                .build(),
        }
    }

    /// Claim the slot for a new confirmation.
    ///
    /// Returns `false` when a confirmation is already running for this user.
    pub async fn try_start(&self, user_id: UserId) -> bool {
        let result = self
            .slots
            .entry(user_id)
            .and_compute_with(|current| async move {
                match current.map(Entry::into_value) {
                    Some(PaymentSlot::InFlight) => Op::Nop,
                    _ => Op::Put(PaymentSlot::InFlight),
                }
            })
            .await;
        matches!(
            result,
            CompResult::Inserted(_) | CompResult::ReplacedWith(_)
        )
    }

    /// Record the gateway's answer.
    pub async fn settle(&self, user_id: UserId, before: BookingWizard, after: BookingWizard) {
        self.slots
            .insert(user_id, PaymentSlot::Settled { before, after })
            .await;
    }

    /// Forget the user's slot.
    pub async fn clear(&self, user_id: UserId) {
        self.slots.invalidate(&user_id).await;
    }

    /// Apply the user's slot to a wizard read from the session.
    ///
    /// While a confirmation runs the wizard is put in its processing state.
    /// A settled outcome replaces the wizard only if the session still holds
    /// the wizard the payment started from. Returns `true` when the wizard
    /// was replaced and should be written back.
    pub async fn reconcile(&self, user_id: UserId, wizard: &mut BookingWizard) -> bool {
        match self.slots.get(&user_id).await {
            Some(PaymentSlot::InFlight) => {
                if !wizard.is_processing_payment() {
                    let _ = wizard.begin_payment();
                }
                false
            }
            Some(PaymentSlot::Settled { before, after }) if *wizard == before => {
                *wizard = after;
                true
            }
            _ => false,
        }
    }
}
