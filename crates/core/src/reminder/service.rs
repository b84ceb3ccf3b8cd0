//! Reminder dispatch service - core business logic
//!
//! One call to [`ReminderService::run_tick`] performs the two passes of the
//! reminder loop: materialize rows for meetings entering the lookahead
//! window, then dispatch everything due. All state is re-derived from the
//! stores on every tick, so the loop is resumable after a restart.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use cohort_domain::constants::{
    DEFAULT_DISPLAY_TIMEZONE, LOOKAHEAD_WINDOW_MINS, NOTIFY_LEAD_MINS,
};
use cohort_domain::{format_local, BatchMember, Meeting, Notification, Result};
use tracing::{error, info, warn};

use super::ports::{EmailSender, MeetingRepository, MembershipRepository, NotificationRepository};

const REMINDER_SUBJECT: &str = "Meeting Reminder";

/// Counters describing what one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub materialized: usize,
    pub dispatched: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub skipped_no_address: usize,
}

impl TickReport {
    /// Whether the tick wrote anything to the store.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.materialized > 0 || self.dispatched > 0
    }
}

/// Reminder dispatch service
pub struct ReminderService {
    meetings: Arc<dyn MeetingRepository>,
    memberships: Arc<dyn MembershipRepository>,
    notifications: Arc<dyn NotificationRepository>,
    mailer: Arc<dyn EmailSender>,
    lookahead: Duration,
    lead: Duration,
    display_tz: String,
}

impl ReminderService {
    /// Create a new reminder service with the default 15-minute lookahead
    /// window and 10-minute notify lead.
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
            lookahead: Duration::minutes(LOOKAHEAD_WINDOW_MINS),
            lead: Duration::minutes(NOTIFY_LEAD_MINS),
            display_tz: DEFAULT_DISPLAY_TIMEZONE.to_string(),
        }
    }

    /// Override the lookahead window and notify lead.
    #[must_use]
    pub fn with_window(mut self, lookahead: Duration, lead: Duration) -> Self {
        self.lookahead = lookahead;
        self.lead = lead;
        self
    }

    /// Set the IANA timezone used when rendering meeting times for display.
    #[must_use]
    pub fn with_display_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.display_tz = timezone.into();
        self
    }

    /// Run one tick: materialize reminders, then dispatch everything due.
    ///
    /// Pass 1 completes before Pass 2 queries due rows, so a reminder
    /// clamped to `now` during materialization is dispatched in the same
    /// tick.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let materialized = self.materialize_reminders(now).await?;
        let mut report = TickReport { materialized, ..TickReport::default() };
        self.dispatch_due(now, &mut report).await?;
        Ok(report)
    }

    /// Pass 1: create pending rows for meetings starting within the
    /// lookahead window.
    ///
    /// The due time is `scheduled_at - lead`, clamped forward to `now` so a
    /// reminder is never scheduled in the past. The store's uniqueness
    /// constraint makes re-runs no-ops for already-covered meetings.
    async fn materialize_reminders(&self, now: DateTime<Utc>) -> Result<usize> {
        let upcoming = self.meetings.starting_within(now, self.lookahead).await?;
        let mut created = 0;

        for meeting in upcoming {
            let notify_at = (meeting.scheduled_at - self.lead).max(now);
            let scheduled_local = format_local(meeting.scheduled_at, &self.display_tz);
            let message = reminder_message(&meeting.title, &scheduled_local);
            let row =
                Notification::pending(meeting.id, meeting.batch_id, notify_at, message, now);

            if self.notifications.upsert_pending(&row).await? {
                info!(
                    meeting_id = meeting.id,
                    scheduled_at = %meeting.scheduled_at,
                    notify_at = %notify_at,
                    "reminder scheduled"
                );
                created += 1;
            }
        }

        Ok(created)
    }

    /// Pass 2: email batch members for every due, unsent reminder and mark
    /// each row sent.
    ///
    /// Per-recipient failures are logged and skipped; the row is marked
    /// sent after all attempts regardless. A reminder whose meeting has
    /// been deleted is retired without sending anything.
    async fn dispatch_due(&self, now: DateTime<Utc>, report: &mut TickReport) -> Result<()> {
        let due = self.notifications.due_unsent(now).await?;

        for notification in due {
            match self.meetings.find_by_id(notification.meeting_id).await? {
                Some(meeting) => self.email_batch(&notification, &meeting, report).await?,
                None => {
                    warn!(
                        notification_id = %notification.id,
                        meeting_id = notification.meeting_id,
                        "meeting no longer exists, retiring reminder"
                    );
                }
            }

            self.notifications.mark_sent(notification.id).await?;
            report.dispatched += 1;
            info!(
                notification_id = %notification.id,
                meeting_id = notification.meeting_id,
                "reminder completed"
            );
        }

        Ok(())
    }

    async fn email_batch(
        &self,
        notification: &Notification,
        meeting: &Meeting,
        report: &mut TickReport,
    ) -> Result<()> {
        let members = self.memberships.members_of_batch(notification.batch_id).await?;
        let scheduled_local = format_local(meeting.scheduled_at, &self.display_tz);

        for member in &members {
            let Some(address) = member.email.as_deref() else {
                warn!(member_id = %member.member_id, "skipping member without contact address");
                report.skipped_no_address += 1;
                continue;
            };

            info!(
                meeting_id = meeting.id,
                to = %address,
                notify_at = %notification.notify_at,
                "sending meeting reminder"
            );

            let body = reminder_body(member, meeting, &scheduled_local);
            match self.mailer.send(address, REMINDER_SUBJECT, &body).await {
                Ok(()) => report.emails_sent += 1,
                Err(err) => {
                    error!(
                        error = %err,
                        to = %address,
                        meeting_id = meeting.id,
                        "failed to send reminder"
                    );
                    report.emails_failed += 1;
                }
            }
        }

        Ok(())
    }
}

pub(crate) fn reminder_message(title: &str, scheduled_local: &str) -> String {
    format!("Reminder: Meeting '{title}' starts at {scheduled_local}")
}

fn reminder_body(member: &BatchMember, meeting: &Meeting, scheduled_local: &str) -> String {
    let name =
        if member.display_name.is_empty() { "Intern" } else { member.display_name.as_str() };
    let message = reminder_message(&meeting.title, scheduled_local);
    let link = &meeting.meeting_link;
    format!(
        "<p>Hi {name},</p>\
         <p>{message}.</p>\
         <p><strong>When:</strong> {scheduled_local}</p>\
         <p><strong>Link:</strong> <a href=\"{link}\">{link}</a></p>\
         <p>Cohort Team</p>"
    )
}
