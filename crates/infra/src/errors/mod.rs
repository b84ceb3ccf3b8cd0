//! Infrastructure error handling
//!
//! External crate errors are converted into [`cohort_domain::CohortError`]
//! at this boundary so the core and domain layers never see rusqlite,
//! reqwest, or pool error types.

mod conversions;

pub use conversions::InfraError;
