//! Batch (intern cohort) types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cohort of interns sharing meetings and membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: i64,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// A member resolved through the batch membership join.
///
/// `email` is nullable: members without a contact address are skipped (with
/// a warning) when reminders are dispatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMember {
    pub member_id: String,
    pub display_name: String,
    pub email: Option<String>,
}
