//! Billing: Stripe-driven subscription state.
//!
//! `events` holds the domain event handler (pure state transitions over the
//! subscription store); `webhook` verifies and maps raw Stripe webhooks into
//! those events; `stripe_client` is the outbound REST client.

pub mod events;
pub mod stripe_client;
pub mod webhook;
