//! Domain types and models

pub mod batch;
pub mod meeting;
pub mod notification;
pub mod otp;

pub use batch::{Batch, BatchMember};
pub use meeting::{Meeting, MeetingDraft};
pub use notification::Notification;
pub use otp::OtpEntry;
