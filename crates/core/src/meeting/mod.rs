//! Meeting scheduling domain

pub mod service;

pub use service::MeetingService;
