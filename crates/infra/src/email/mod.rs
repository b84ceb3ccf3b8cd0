//! Outbound email
//!
//! The relay service owns SMTP delivery; this crate only speaks HTTP to it.

pub mod relay;

pub use relay::HttpRelayMailer;
