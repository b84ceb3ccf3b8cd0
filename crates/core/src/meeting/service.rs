//! Meeting scheduling service - core business logic
//!
//! Creating a meeting does three things: persist the row (UTC), seed its
//! reminder so the row exists even if the process restarts before the
//! meeting enters the lookahead window, and announce it to batch members by
//! email on a best-effort basis.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use cohort_domain::constants::{DEFAULT_DISPLAY_TIMEZONE, NOTIFY_LEAD_MINS};
use cohort_domain::{
    format_local, CohortError, Meeting, MeetingDraft, Notification, Result,
};
use tracing::{error, info};

use crate::reminder::ports::{
    EmailSender, MeetingRepository, MembershipRepository, NotificationRepository,
};
use crate::reminder::service::reminder_message;

const ANNOUNCEMENT_SUBJECT: &str = "Meeting Scheduled";

/// Meeting scheduling service
pub struct MeetingService {
    meetings: Arc<dyn MeetingRepository>,
    memberships: Arc<dyn MembershipRepository>,
    notifications: Arc<dyn NotificationRepository>,
    mailer: Arc<dyn EmailSender>,
    lead: Duration,
    display_tz: String,
}

impl MeetingService {
    /// Create a new meeting service with the default 10-minute notify lead.
    pub fn new(
        meetings: Arc<dyn MeetingRepository>,
        memberships: Arc<dyn MembershipRepository>,
        notifications: Arc<dyn NotificationRepository>,
        mailer: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            meetings,
            memberships,
            notifications,
            mailer,
            lead: Duration::minutes(NOTIFY_LEAD_MINS),
            display_tz: DEFAULT_DISPLAY_TIMEZONE.to_string(),
        }
    }

    /// Override the notify lead.
    #[must_use]
    pub fn with_lead(mut self, lead: Duration) -> Self {
        self.lead = lead;
        self
    }

    /// Set the IANA timezone used when rendering meeting times for display.
    #[must_use]
    pub fn with_display_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.display_tz = timezone.into();
        self
    }

    /// Create a meeting, seed its reminder, and announce it to the batch.
    ///
    /// The seeded reminder keeps the raw `scheduled_at - lead` due time even
    /// when that instant is already past; the dispatch pass treats past due
    /// times as immediately due. Announcement failures are logged per
    /// recipient and never fail the call.
    pub async fn schedule_meeting(&self, draft: MeetingDraft) -> Result<Meeting> {
        if draft.title.trim().is_empty() {
            return Err(CohortError::InvalidInput("meeting title must not be empty".to_string()));
        }
        if !self.memberships.batch_exists(draft.batch_id).await? {
            return Err(CohortError::NotFound(format!("batch {}", draft.batch_id)));
        }

        let meeting = self.meetings.insert(draft).await?;
        info!(meeting_id = meeting.id, batch_id = meeting.batch_id, "meeting created");

        self.seed_reminder(&meeting).await?;
        self.announce(&meeting).await;

        Ok(meeting)
    }

    /// Meetings for a batch with `scheduled_at >= now`, soonest first.
    pub async fn upcoming_meetings(&self, batch_id: i64, now: DateTime<Utc>) -> Result<Vec<Meeting>> {
        self.meetings.upcoming_for_batch(batch_id, now).await
    }

    async fn seed_reminder(&self, meeting: &Meeting) -> Result<()> {
        let notify_at = meeting.scheduled_at - self.lead;
        let scheduled_local = format_local(meeting.scheduled_at, &self.display_tz);
        let message = reminder_message(&meeting.title, &scheduled_local);
        let row = Notification::pending(
            meeting.id,
            meeting.batch_id,
            notify_at,
            message,
            Utc::now(),
        );
        self.notifications.upsert_pending(&row).await?;
        Ok(())
    }

    async fn announce(&self, meeting: &Meeting) {
        let members = match self.memberships.members_of_batch(meeting.batch_id).await {
            Ok(members) => members,
            Err(err) => {
                error!(error = %err, batch_id = meeting.batch_id, "failed to resolve batch members for announcement");
                return;
            }
        };

        let scheduled_local = format_local(meeting.scheduled_at, &self.display_tz);
        for member in &members {
            let Some(address) = member.email.as_deref() else { continue };

            let name = if member.display_name.is_empty() {
                "Intern"
            } else {
                member.display_name.as_str()
            };
            let body = format!(
                "Hi {name},<br/>\
                 You have a meeting <b>{title}</b> scheduled at {scheduled_local}.<br/>\
                 Link: <a href=\"{link}\">{link}</a>",
                title = meeting.title,
                link = meeting.meeting_link,
            );

            if let Err(err) = self.mailer.send(address, ANNOUNCEMENT_SUBJECT, &body).await {
                error!(error = %err, to = %address, meeting_id = meeting.id, "failed to send meeting announcement");
            }
        }
    }
}
