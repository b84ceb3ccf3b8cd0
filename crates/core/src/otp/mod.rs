//! One-time password (OTP) domain

pub mod ports;
pub mod service;

pub use ports::OtpStore;
pub use service::OtpService;
