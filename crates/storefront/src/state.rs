//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::config::StorefrontConfig;
use crate::models::Testimonial;
use crate::services::{AdminPanels, AuthEvents, PaymentLedger, SimulatedPayment};
use crate::supabase::{SupabaseClient, SupabaseError};

/// How long the landing page reuses the testimonial list.
const TESTIMONIALS_TTL: Duration = Duration::from_secs(300);

/// Application state shared across all handlers.
///
/// Cheap to clone; every clone shares the same clients and caches.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    supabase: SupabaseClient,
    payment: SimulatedPayment,
    payments: PaymentLedger,
    auth_events: AuthEvents,
    admin_panels: AdminPanels<SupabaseClient>,
    testimonials: Cache<(), Arc<Vec<Testimonial>>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Spawns the task that closes admin panels on sign-out, so this must be
    /// called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the Supabase client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, SupabaseError> {
        let supabase = SupabaseClient::new(&config.supabase)?;
        let payment = SimulatedPayment::new(config.payment_delay);
        let payments = PaymentLedger::new(config.payment_delay);
        let auth_events = AuthEvents::new();
        let admin_panels = AdminPanels::new(supabase.clone(), config.admin_panel_idle);
        admin_panels.watch(&auth_events);

        let testimonials = Cache::builder()
            .max_capacity(1)
            .time_to_live(TESTIMONIALS_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                supabase,
                payment,
                payments,
                auth_events,
                admin_panels,
                testimonials,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Backend client.
    #[must_use]
    pub fn supabase(&self) -> &SupabaseClient {
        &self.inner.supabase
    }

    /// Gateway the booking wizard confirms payment with.
    #[must_use]
    pub fn payment(&self) -> &SimulatedPayment {
        &self.inner.payment
    }

    /// Payments in flight and their outcomes, per user.
    #[must_use]
    pub fn payments(&self) -> &PaymentLedger {
        &self.inner.payments
    }

    #[must_use]
    pub fn auth_events(&self) -> &AuthEvents {
        &self.inner.auth_events
    }

    #[must_use]
    pub fn admin_panels(&self) -> &AdminPanels<SupabaseClient> {
        &self.inner.admin_panels
    }

    /// Testimonials for the landing page, cached for five minutes.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the cache is cold and the fetch fails.
    /// Failures are not cached.
    pub async fn testimonials(&self) -> Result<Arc<Vec<Testimonial>>, Arc<SupabaseError>> {
        let supabase = self.inner.supabase.clone();
        self.inner
            .testimonials
            .try_get_with((), async move { supabase.get_testimonials().await.map(Arc::new) })
            .await
    }
}
