//! End-to-end dispatch coverage over a real SQLite database.
//!
//! These tests run the reminder pipeline against the workspace schema:
//! batches and members seeded directly, meetings created through the
//! repositories and services, and a recording mailer standing in for the
//! HTTP relay. Assertions cover both the tick report and the persisted
//! notification state.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use cohort_core::{EmailSender, MeetingRepository, MeetingService, ReminderService};
use cohort_domain::{MeetingDraft, Result as DomainResult};
use cohort_infra::database::{
    DbManager, SqliteMeetingRepository, SqliteMembershipRepository, SqliteNotificationRepository,
};
use rusqlite::params;
use tempfile::TempDir;

struct DbHarness {
    #[allow(dead_code)]
    temp_dir: TempDir,
    manager: Arc<DbManager>,
}

impl DbHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("temporary directory should be created");
        let db_path = temp_dir.path().join("cohort-integration.db");

        let manager =
            Arc::new(DbManager::new(&db_path, 4).expect("database manager should initialise"));
        manager.run_migrations().expect("schema migrations should apply");

        Self { temp_dir, manager }
    }

    fn seed_batch(&self, batch_id: i64, name: &str) {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.execute(
            "INSERT INTO batches (id, name, start_date, end_date) VALUES (?1, ?2, ?3, ?4)",
            params![batch_id, name, 1_748_736_000_i64, 1_756_684_800_i64],
        )
        .expect("batch should insert");
    }

    fn seed_member(&self, batch_id: i64, member_id: &str, display_name: &str, email: Option<&str>) {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.execute(
            "INSERT INTO batch_members (member_id, batch_id, display_name, email)
             VALUES (?1, ?2, ?3, ?4)",
            params![member_id, batch_id, display_name, email],
        )
        .expect("member should insert");
    }

    fn delete_meeting(&self, meeting_id: i64) {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.execute("DELETE FROM meetings WHERE id = ?1", params![meeting_id])
            .expect("meeting should delete");
    }

    fn sent_flag(&self, meeting_id: i64) -> bool {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.query_row(
            "SELECT is_sent FROM notifications WHERE meeting_id = ?1",
            params![meeting_id],
            |row| row.get::<_, bool>(0),
        )
        .expect("notification row should exist")
    }
}

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    fn deliveries(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("mailer lock").clone()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> DomainResult<()> {
        self.sent.lock().expect("mailer lock").push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

fn build_services(
    harness: &DbHarness,
    mailer: Arc<RecordingMailer>,
) -> (ReminderService, MeetingService) {
    let meetings = Arc::new(SqliteMeetingRepository::new(Arc::clone(&harness.manager)));
    let memberships = Arc::new(SqliteMembershipRepository::new(Arc::clone(&harness.manager)));
    let notifications = Arc::new(SqliteNotificationRepository::new(Arc::clone(&harness.manager)));

    let reminder = ReminderService::new(
        meetings.clone(),
        memberships.clone(),
        notifications.clone(),
        mailer.clone(),
    );
    let meeting = MeetingService::new(meetings, memberships, notifications, mailer);
    (reminder, meeting)
}

fn draft(title: &str, batch_id: i64, scheduled_at: DateTime<Utc>) -> MeetingDraft {
    MeetingDraft {
        title: title.to_string(),
        description: Some("Weekly checkpoint".to_string()),
        scheduled_at,
        meeting_link: "https://meet.example/standup".to_string(),
        batch_id,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn dispatch_tick_sends_reminders_once() {
    let harness = DbHarness::new();
    harness.seed_batch(1, "Summer 2025");
    harness.seed_member(1, "intern-1", "Asha", Some("asha@example.com"));
    harness.seed_member(1, "intern-2", "Ravi", Some("ravi@example.com"));
    harness.seed_member(1, "intern-3", "Lena", None);

    let mailer = Arc::new(RecordingMailer::default());
    let (reminder, _meeting_service) = build_services(&harness, mailer.clone());

    // Closer than the notify lead, so the due time clamps to now and the
    // same tick that materializes the reminder also dispatches it.
    let now = Utc::now();
    let meetings_repo = SqliteMeetingRepository::new(Arc::clone(&harness.manager));
    let meeting = meetings_repo
        .insert(draft("Standup", 1, now + ChronoDuration::minutes(5)))
        .await
        .expect("meeting should insert");

    let report = reminder.run_tick(now).await.expect("tick should succeed");
    assert_eq!(report.materialized, 1, "one reminder row created");
    assert_eq!(report.dispatched, 1, "reminder is due immediately");
    assert_eq!(report.emails_sent, 2, "both members with addresses are emailed");
    assert_eq!(report.skipped_no_address, 1, "member without an address is skipped");
    assert!(harness.sent_flag(meeting.id), "notification row is marked sent");

    let deliveries = mailer.deliveries();
    let recipients: Vec<&str> = deliveries.iter().map(|(to, _)| to.as_str()).collect();
    assert_eq!(recipients, vec!["asha@example.com", "ravi@example.com"]);
    assert!(deliveries.iter().all(|(_, subject)| subject == "Meeting Reminder"));

    // Re-running changes nothing: the row is covered and already sent.
    let repeat =
        reminder.run_tick(now + ChronoDuration::minutes(1)).await.expect("second tick");
    assert_eq!(repeat.materialized, 0, "covered meeting is not re-materialized");
    assert_eq!(repeat.dispatched, 0, "sent reminder is not re-dispatched");
    assert_eq!(mailer.deliveries().len(), 2, "no duplicate emails on repeat ticks");
}

#[tokio::test(flavor = "multi_thread")]
async fn scheduling_announces_and_seeds_the_reminder() {
    let harness = DbHarness::new();
    harness.seed_batch(7, "Winter 2025");
    harness.seed_member(7, "intern-1", "Mona", Some("mona@example.com"));
    harness.seed_member(7, "intern-2", "Theo", Some("theo@example.com"));

    let mailer = Arc::new(RecordingMailer::default());
    let (reminder, meeting_service) = build_services(&harness, mailer.clone());

    let now = Utc::now();
    meeting_service
        .schedule_meeting(draft("Kickoff", 7, now + ChronoDuration::minutes(5)))
        .await
        .expect("meeting should be created");

    let announcements = mailer.deliveries();
    assert_eq!(announcements.len(), 2, "each member with an address gets an announcement");
    assert!(announcements.iter().all(|(_, subject)| subject == "Meeting Scheduled"));

    // The seeded reminder keeps its past due time, so the next tick
    // dispatches it without materializing a second row.
    let report = reminder.run_tick(now).await.expect("tick should succeed");
    assert_eq!(report.materialized, 0, "seeded reminder already covers the meeting");
    assert_eq!(report.dispatched, 1, "seeded reminder is dispatched");
    assert_eq!(report.emails_sent, 2, "reminder goes to both members");
    assert_eq!(mailer.deliveries().len(), 4, "announcements plus reminders");
}

#[tokio::test(flavor = "multi_thread")]
async fn deleted_meeting_reminder_is_retired_silently() {
    let harness = DbHarness::new();
    harness.seed_batch(3, "Monsoon 2025");
    harness.seed_member(3, "intern-1", "Kiran", Some("kiran@example.com"));

    let mailer = Arc::new(RecordingMailer::default());
    let (reminder, _meeting_service) = build_services(&harness, mailer.clone());

    // Far enough out that the first tick materializes without dispatching.
    let now = Utc::now();
    let meetings_repo = SqliteMeetingRepository::new(Arc::clone(&harness.manager));
    let meeting = meetings_repo
        .insert(draft("Retro", 3, now + ChronoDuration::minutes(12)))
        .await
        .expect("meeting should insert");

    let first = reminder.run_tick(now).await.expect("first tick");
    assert_eq!(first.materialized, 1, "reminder row created");
    assert_eq!(first.dispatched, 0, "reminder is not yet due");

    harness.delete_meeting(meeting.id);

    let second =
        reminder.run_tick(now + ChronoDuration::minutes(3)).await.expect("second tick");
    assert_eq!(second.dispatched, 1, "orphaned reminder is retired");
    assert_eq!(second.emails_sent, 0, "no email goes out for a deleted meeting");
    assert!(mailer.deliveries().is_empty());
    assert!(harness.sent_flag(meeting.id), "retired row stays behind, marked sent");
}
