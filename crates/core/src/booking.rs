//! Booking draft and the five-step installation booking wizard.
//!
//! The wizard is a linear state machine:
//!
//! ```text
//! ProductSelection -> Scheduling -> ContactDetails -> PaymentConfirmation -> Summary
//!                                                          |        ^
//!                                                          v        |
//!                                                    (processing payment)
//! ```
//!
//! Moving forward is gated by the draft's contents; moving backward is always
//! allowed except from the first step. Leaving `PaymentConfirmation` goes
//! through a processing sub-state while a [`PaymentGateway`] confirms the
//! booking. A declined or failed confirmation returns the wizard to
//! `PaymentConfirmation` with the failure recorded on the wizard.
//!
//! The wizard never persists anything. Once it reaches `Summary`,
//! [`BookingWizard::submission`] hands the assembled booking to whoever owns
//! persistence.

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ProductId;

/// Number of steps in the wizard.
pub const TOTAL_STEPS: u8 = 5;

// =============================================================================
// Steps
// =============================================================================

/// A position in the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    /// Step 1: pick an enhancement.
    #[default]
    ProductSelection,
    /// Step 2: pick an installation date and time slot.
    Scheduling,
    /// Step 3: contact and installation details.
    ContactDetails,
    /// Step 4: review and pay.
    PaymentConfirmation,
    /// Step 5: confirmation summary.
    Summary,
}

impl WizardStep {
    /// All steps in order.
    pub const ALL: [Self; TOTAL_STEPS as usize] = [
        Self::ProductSelection,
        Self::Scheduling,
        Self::ContactDetails,
        Self::PaymentConfirmation,
        Self::Summary,
    ];

    /// 1-based step number.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::ProductSelection => 1,
            Self::Scheduling => 2,
            Self::ContactDetails => 3,
            Self::PaymentConfirmation => 4,
            Self::Summary => 5,
        }
    }

    /// Step for a 1-based number, if in range.
    #[must_use]
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::ProductSelection),
            2 => Some(Self::Scheduling),
            3 => Some(Self::ContactDetails),
            4 => Some(Self::PaymentConfirmation),
            5 => Some(Self::Summary),
            _ => None,
        }
    }

    /// The following step, or `None` at the last one.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    /// The preceding step, or `None` at the first one.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        Self::from_number(self.number() - 1)
    }

    /// Heading shown above the step.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::ProductSelection => "Choisissez votre amélioration",
            Self::Scheduling => "Date et heure d'installation",
            Self::ContactDetails => "Vos informations",
            Self::PaymentConfirmation => "Paiement",
            Self::Summary => "Réservation confirmée",
        }
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "step {}", self.number())
    }
}

// =============================================================================
// Draft
// =============================================================================

/// Where the installation takes place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationLocation {
    pub name: String,
    pub address: String,
}

/// Contact and installation details collected in step 3.
///
/// Every field is free text. Nothing here is required by the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub installation_notes: String,
    pub installation_location: InstallationLocation,
}

/// A single editable contact field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    FirstName,
    LastName,
    Email,
    Phone,
    Address,
    City,
    PostalCode,
    InstallationNotes,
}

impl std::str::FromStr for ContactField {
    type Err = StepError;

    /// Accepts both the form names (`first_name`) and the camelCase names
    /// used by the JSON API (`firstName`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_name" | "firstName" => Ok(Self::FirstName),
            "last_name" | "lastName" => Ok(Self::LastName),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "address" => Ok(Self::Address),
            "city" => Ok(Self::City),
            "postal_code" | "postalCode" => Ok(Self::PostalCode),
            "installation_notes" | "installationNotes" => Ok(Self::InstallationNotes),
            other => Err(StepError::UnknownField(other.to_string())),
        }
    }
}

/// A single editable installation location field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationField {
    Name,
    Address,
}

impl std::str::FromStr for LocationField {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "address" => Ok(Self::Address),
            other => Err(StepError::UnknownField(other.to_string())),
        }
    }
}

impl ContactInfo {
    /// Overwrite one field.
    pub fn set(&mut self, field: ContactField, value: impl Into<String>) {
        let slot = match field {
            ContactField::FirstName => &mut self.first_name,
            ContactField::LastName => &mut self.last_name,
            ContactField::Email => &mut self.email,
            ContactField::Phone => &mut self.phone,
            ContactField::Address => &mut self.address,
            ContactField::City => &mut self.city,
            ContactField::PostalCode => &mut self.postal_code,
            ContactField::InstallationNotes => &mut self.installation_notes,
        };
        *slot = value.into();
    }

    /// Overwrite one installation location field.
    pub fn set_location(&mut self, field: LocationField, value: impl Into<String>) {
        let slot = match field {
            LocationField::Name => &mut self.installation_location.name,
            LocationField::Address => &mut self.installation_location.address,
        };
        *slot = value.into();
    }

    /// Display name assembled from first and last name.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// The in-progress booking accumulated across steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub step: WizardStep,
    pub selected_product_id: Option<ProductId>,
    pub selected_date: Option<NaiveDate>,
    pub selected_time: Option<String>,
    pub contact_info: ContactInfo,
}

impl BookingDraft {
    /// Whether both date and a non-blank time slot are chosen.
    #[must_use]
    pub fn has_schedule(&self) -> bool {
        self.selected_date.is_some()
            && self
                .selected_time
                .as_deref()
                .is_some_and(|t| !t.trim().is_empty())
    }
}

/// Everything needed to create a booking once the wizard reaches the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSubmission {
    pub product_id: ProductId,
    pub booking_date: NaiveDate,
    pub booking_time: String,
    pub contact_info: ContactInfo,
}

// =============================================================================
// Errors
// =============================================================================

/// Reasons a wizard operation is refused.
///
/// These are validation outcomes shown inline next to the step, never
/// failures of the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// The operation belongs to another step.
    #[error("only available at {expected} (currently at {actual})")]
    WrongStep {
        expected: WizardStep,
        actual: WizardStep,
    },

    /// No product chosen yet.
    #[error("Veuillez sélectionner une amélioration.")]
    MissingProduct,

    /// Date or time slot missing.
    #[error("Veuillez choisir une date et un créneau horaire.")]
    MissingSchedule,

    /// A payment confirmation is running; nothing else may happen until it ends.
    #[error("Paiement en cours de traitement.")]
    PaymentInProgress,

    /// `finish_payment` without a matching `begin_payment`.
    #[error("no payment is being processed")]
    NotProcessingPayment,

    /// Step 4 can only be left through the payment gateway.
    #[error("payment confirmation required")]
    PaymentRequired,

    /// Already at the summary.
    #[error("booking is already complete")]
    AlreadyComplete,

    /// The gateway refused or failed; the wizard is back at step 4.
    #[error("Le paiement a échoué : {0}")]
    PaymentFailed(String),

    /// A contact field name that does not exist.
    #[error("unknown field: {0}")]
    UnknownField(String),
}

// =============================================================================
// Payment seam
// =============================================================================

/// Proof that a payment went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub reference: String,
}

/// Why a payment did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// The payment was refused.
    #[error("declined: {0}")]
    Declined(String),
    /// The payment service could not be reached or errored.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Confirms payment for a booking before the wizard may show its summary.
pub trait PaymentGateway {
    /// Confirm payment for the given booking.
    fn confirm(
        &self,
        submission: &BookingSubmission,
    ) -> impl Future<Output = Result<PaymentReceipt, PaymentError>> + Send;
}

// =============================================================================
// Wizard
// =============================================================================

/// The booking wizard: a draft plus the payment sub-state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingWizard {
    draft: BookingDraft,
    processing_payment: bool,
    payment_error: Option<String>,
    receipt: Option<PaymentReceipt>,
}

impl BookingWizard {
    /// A fresh wizard at step 1 with an empty draft.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> WizardStep {
        self.draft.step
    }

    /// The accumulated draft.
    #[must_use]
    pub const fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    /// Whether a payment confirmation is in flight.
    #[must_use]
    pub const fn is_processing_payment(&self) -> bool {
        self.processing_payment
    }

    /// Message from the last failed payment attempt, if any.
    #[must_use]
    pub fn payment_error(&self) -> Option<&str> {
        self.payment_error.as_deref()
    }

    /// Receipt of the confirmed payment, once at the summary.
    #[must_use]
    pub const fn receipt(&self) -> Option<&PaymentReceipt> {
        self.receipt.as_ref()
    }

    /// Progress through the wizard as a percentage (20, 40, ... 100).
    #[must_use]
    pub fn progress_percent(&self) -> u16 {
        u16::from(self.draft.step.number()) * 100 / u16::from(TOTAL_STEPS)
    }

    fn require_step(&self, expected: WizardStep) -> Result<(), StepError> {
        if self.processing_payment {
            return Err(StepError::PaymentInProgress);
        }
        if self.draft.step != expected {
            return Err(StepError::WrongStep {
                expected,
                actual: self.draft.step,
            });
        }
        Ok(())
    }

    /// Choose the enhancement to install. Does not advance.
    ///
    /// # Errors
    ///
    /// Only valid at step 1.
    pub fn select_product(&mut self, id: ProductId) -> Result<(), StepError> {
        self.require_step(WizardStep::ProductSelection)?;
        self.draft.selected_product_id = Some(id);
        Ok(())
    }

    /// Choose the installation date.
    ///
    /// # Errors
    ///
    /// Only valid at step 2.
    pub fn select_date(&mut self, date: NaiveDate) -> Result<(), StepError> {
        self.require_step(WizardStep::Scheduling)?;
        self.draft.selected_date = Some(date);
        Ok(())
    }

    /// Choose the installation time slot.
    ///
    /// # Errors
    ///
    /// Only valid at step 2.
    pub fn select_time(&mut self, time: impl Into<String>) -> Result<(), StepError> {
        self.require_step(WizardStep::Scheduling)?;
        self.draft.selected_time = Some(time.into());
        Ok(())
    }

    /// Overwrite one contact field.
    ///
    /// # Errors
    ///
    /// Only valid at step 3.
    pub fn update_contact(
        &mut self,
        field: ContactField,
        value: impl Into<String>,
    ) -> Result<(), StepError> {
        self.require_step(WizardStep::ContactDetails)?;
        self.draft.contact_info.set(field, value);
        Ok(())
    }

    /// Overwrite one installation location field.
    ///
    /// # Errors
    ///
    /// Only valid at step 3.
    pub fn update_installation_location(
        &mut self,
        field: LocationField,
        value: impl Into<String>,
    ) -> Result<(), StepError> {
        self.require_step(WizardStep::ContactDetails)?;
        self.draft.contact_info.set_location(field, value);
        Ok(())
    }

    /// Move forward from steps 1-3.
    ///
    /// Step 1 needs a product and step 2 needs a date and time; step 3 moves
    /// on with whatever contact details were entered.
    ///
    /// # Errors
    ///
    /// - [`StepError::MissingProduct`] / [`StepError::MissingSchedule`] when
    ///   the current step is incomplete
    /// - [`StepError::PaymentRequired`] at step 4 (use [`Self::advance`] or
    ///   [`Self::begin_payment`])
    /// - [`StepError::AlreadyComplete`] at step 5
    pub fn try_advance(&mut self) -> Result<WizardStep, StepError> {
        if self.processing_payment {
            return Err(StepError::PaymentInProgress);
        }
        let next = match self.draft.step {
            WizardStep::ProductSelection => {
                if self.draft.selected_product_id.is_none() {
                    return Err(StepError::MissingProduct);
                }
                WizardStep::Scheduling
            }
            WizardStep::Scheduling => {
                if !self.draft.has_schedule() {
                    return Err(StepError::MissingSchedule);
                }
                WizardStep::ContactDetails
            }
            WizardStep::ContactDetails => WizardStep::PaymentConfirmation,
            WizardStep::PaymentConfirmation => return Err(StepError::PaymentRequired),
            WizardStep::Summary => return Err(StepError::AlreadyComplete),
        };
        self.draft.step = next;
        Ok(next)
    }

    /// Enter the processing sub-state at step 4.
    ///
    /// Returns the submission the gateway should confirm. Until
    /// [`Self::finish_payment`] is called every other operation is refused.
    ///
    /// # Errors
    ///
    /// Only valid at step 4, with a product and schedule present.
    pub fn begin_payment(&mut self) -> Result<BookingSubmission, StepError> {
        self.require_step(WizardStep::PaymentConfirmation)?;
        let submission = self.assemble()?;
        self.processing_payment = true;
        Ok(submission)
    }

    /// Leave the processing sub-state with the gateway's answer.
    ///
    /// Success moves to the summary. Failure stays at step 4 and records the
    /// message so the step can show it.
    ///
    /// # Errors
    ///
    /// - [`StepError::NotProcessingPayment`] without a prior `begin_payment`
    /// - [`StepError::PaymentFailed`] when `outcome` is an error
    pub fn finish_payment(
        &mut self,
        outcome: Result<PaymentReceipt, PaymentError>,
    ) -> Result<WizardStep, StepError> {
        if !self.processing_payment {
            return Err(StepError::NotProcessingPayment);
        }
        self.processing_payment = false;
        match outcome {
            Ok(receipt) => {
                self.payment_error = None;
                self.receipt = Some(receipt);
                self.draft.step = WizardStep::Summary;
                Ok(WizardStep::Summary)
            }
            Err(err) => {
                let message = err.to_string();
                self.payment_error = Some(message.clone());
                Err(StepError::PaymentFailed(message))
            }
        }
    }

    /// Move forward one step, confirming payment when leaving step 4.
    ///
    /// Does not resolve until the gateway has answered.
    ///
    /// # Errors
    ///
    /// See [`Self::try_advance`], [`Self::begin_payment`] and
    /// [`Self::finish_payment`].
    pub async fn advance<G: PaymentGateway>(&mut self, gateway: &G) -> Result<WizardStep, StepError> {
        if self.draft.step != WizardStep::PaymentConfirmation || self.processing_payment {
            return self.try_advance();
        }
        let submission = self.begin_payment()?;
        let outcome = gateway.confirm(&submission).await;
        self.finish_payment(outcome)
    }

    /// Move back one step. A no-op at step 1.
    ///
    /// Returns whether the step changed.
    ///
    /// # Errors
    ///
    /// Refused while a payment is processing.
    pub fn retreat(&mut self) -> Result<bool, StepError> {
        if self.processing_payment {
            return Err(StepError::PaymentInProgress);
        }
        match self.draft.step.previous() {
            Some(previous) => {
                self.draft.step = previous;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Return to step 1 and clear the whole draft.
    ///
    /// # Errors
    ///
    /// Refused while a payment is processing.
    pub fn reset(&mut self) -> Result<(), StepError> {
        if self.processing_payment {
            return Err(StepError::PaymentInProgress);
        }
        *self = Self::default();
        Ok(())
    }

    /// The finished booking, available only at the summary.
    #[must_use]
    pub fn submission(&self) -> Option<BookingSubmission> {
        if self.draft.step != WizardStep::Summary || self.processing_payment {
            return None;
        }
        self.assemble().ok()
    }

    fn assemble(&self) -> Result<BookingSubmission, StepError> {
        let product_id = self
            .draft
            .selected_product_id
            .clone()
            .ok_or(StepError::MissingProduct)?;
        let (Some(booking_date), Some(booking_time)) =
            (self.draft.selected_date, self.draft.selected_time.clone())
        else {
            return Err(StepError::MissingSchedule);
        };
        if booking_time.trim().is_empty() {
            return Err(StepError::MissingSchedule);
        }
        Ok(BookingSubmission {
            product_id,
            booking_date,
            booking_time,
            contact_info: self.draft.contact_info.clone(),
        })
    }
}
