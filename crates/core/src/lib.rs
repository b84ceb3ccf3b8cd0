//! # Cohort Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits)
//! - Use cases and services
//!
//! ## Architecture Principles
//! - Only depends on `cohort-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod meeting;
pub mod otp;
pub mod reminder;

// Re-export specific items to avoid ambiguity
pub use meeting::MeetingService;
pub use otp::ports::OtpStore;
pub use otp::OtpService;
pub use reminder::ports::{
    EmailSender, MeetingRepository, MembershipRepository, NotificationRepository,
};
pub use reminder::{ReminderService, TickReport};
