//! Rotharc Core - Shared types library.
//!
//! This crate provides the types used by every Rotharc component:
//! - `storefront` - Public site, booking wizard, profile and admin dashboard
//! - `integration-tests` - Live HTTP tests against a running storefront
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure state machines - no
//! HTTP clients, no session storage, no timers. Remote collaborators (the
//! payment confirmation in particular) are reached through traits that the
//! storefront implements.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, prices and statuses
//! - [`booking`] - The booking draft and the five-step wizard

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod booking;
pub mod types;

pub use booking::{
    BookingDraft, BookingSubmission, BookingWizard, ContactField, ContactInfo,
    InstallationLocation, LocationField, PaymentError, PaymentGateway, PaymentReceipt, StepError,
    WizardStep,
};
pub use types::*;
