//! Payment confirmation.
//!
//! No real payment provider is wired in: [`SimulatedPayment`] waits a fixed
//! delay and always succeeds.

use std::time::Duration;

use rotharc_core::{BookingSubmission, PaymentError, PaymentGateway, PaymentReceipt};

/// Fixed-delay gateway that accepts every booking.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedPayment {
    delay: Duration,
}

impl SimulatedPayment {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

impl PaymentGateway for SimulatedPayment {
    fn confirm(
        &self,
        submission: &BookingSubmission,
    ) -> impl Future<Output = Result<PaymentReceipt, PaymentError>> + Send {
        let delay = self.delay;
        let product_id = submission.product_id.clone();
        async move {
            tokio::time::sleep(delay).await;
            let reference = format!("SIM-{}", uuid::Uuid::new_v4().simple());
            tracing::info!(%product_id, %reference, "Simulated payment confirmed");
            Ok(PaymentReceipt { reference })
        }
    }
}
