//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use cohort_core::{
    EmailSender, MeetingRepository, MeetingService, MembershipRepository, NotificationRepository,
    OtpService, OtpStore, ReminderService,
};
use cohort_domain::{CohortError, Config, Result};
use cohort_infra::observability::metrics::DispatchMetrics;
use cohort_infra::scheduling::PurgeJob;
use cohort_infra::{
    DbManager, HttpRelayMailer, OtpPurgeJob, PurgeScheduler, PurgeSchedulerConfig,
    ReminderScheduler, ReminderSchedulerConfig, SqliteMeetingRepository,
    SqliteMembershipRepository, SqliteNotificationRepository, SqliteOtpStore,
};

/// Type alias for meeting repository trait object
type DynMeetingRepository = dyn MeetingRepository + Send + Sync + 'static;

/// Type alias for membership repository trait object
type DynMembershipRepository = dyn MembershipRepository + Send + Sync + 'static;

/// Type alias for notification repository trait object
type DynNotificationRepository = dyn NotificationRepository + Send + Sync + 'static;

/// Type alias for OTP store trait object
type DynOtpStore = dyn OtpStore + Send + Sync + 'static;

/// Type alias for email sender trait object
type DynEmailSender = dyn EmailSender + Send + Sync + 'static;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub meetings: Arc<DynMeetingRepository>,
    pub memberships: Arc<DynMembershipRepository>,
    pub notifications: Arc<DynNotificationRepository>,
    pub otp_store: Arc<DynOtpStore>,
    pub mailer: Arc<DynEmailSender>,
    pub reminder_service: Arc<ReminderService>,
    pub meeting_service: Arc<MeetingService>,
    pub otp_service: Arc<OtpService>,
    pub metrics: Arc<DispatchMetrics>,
}

impl AppContext {
    /// Create a new application context from the loaded configuration
    ///
    /// Configuration comes from environment variables with file fallback,
    /// see `cohort_infra::config::load`.
    pub async fn new() -> Result<Self> {
        let config = cohort_infra::config::load()?;
        Self::new_with_config(config).await
    }

    /// Create a new application context with custom configuration
    ///
    /// This method is primarily for testing, allowing tests to specify a
    /// custom database path and avoid conflicts with a live database.
    pub async fn new_with_config(config: Config) -> Result<Self> {
        // Initialize database and bring the schema up to date
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        // Repositories over the shared pool
        let meetings: Arc<DynMeetingRepository> =
            Arc::new(SqliteMeetingRepository::new(db.clone()));
        let memberships: Arc<DynMembershipRepository> =
            Arc::new(SqliteMembershipRepository::new(db.clone()));
        let notifications: Arc<DynNotificationRepository> =
            Arc::new(SqliteNotificationRepository::new(db.clone()));
        let otp_store: Arc<DynOtpStore> = Arc::new(SqliteOtpStore::new(db.clone()));

        // Outbound email goes through the HTTP relay
        let mailer: Arc<DynEmailSender> = Arc::new(HttpRelayMailer::new(&config.relay)?);

        let reminder_service = Arc::new(
            ReminderService::new(
                meetings.clone(),
                memberships.clone(),
                notifications.clone(),
                mailer.clone(),
            )
            .with_window(
                ChronoDuration::minutes(config.scheduler.lookahead_minutes),
                ChronoDuration::minutes(config.scheduler.notify_lead_minutes),
            )
            .with_display_timezone(config.display.timezone.clone()),
        );

        let meeting_service = Arc::new(
            MeetingService::new(
                meetings.clone(),
                memberships.clone(),
                notifications.clone(),
                mailer.clone(),
            )
            .with_lead(ChronoDuration::minutes(config.scheduler.notify_lead_minutes))
            .with_display_timezone(config.display.timezone.clone()),
        );

        let otp_service = Arc::new(
            OtpService::new(otp_store.clone(), mailer.clone())
                .with_ttl(ChronoDuration::seconds(config.otp.ttl_seconds)),
        );

        let metrics = Arc::new(DispatchMetrics::new());

        Ok(Self {
            config,
            db,
            meetings,
            memberships,
            notifications,
            otp_store,
            mailer,
            reminder_service,
            meeting_service,
            otp_service,
            metrics,
        })
    }

    /// Check database health without blocking the async runtime
    pub async fn health_check(&self) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.health_check())
            .await
            .map_err(|e| CohortError::Internal(format!("health check task panicked: {}", e)))?
    }
}

/// Create and start the reminder scheduler (fail-fast initialization)
///
/// The caller owns the returned scheduler and is responsible for calling
/// `stop()` on shutdown; `Drop` cancels the loop as a backstop.
pub async fn create_reminder_scheduler(context: &AppContext) -> Result<ReminderScheduler> {
    let scheduler_config = ReminderSchedulerConfig {
        interval: Duration::from_secs(context.config.scheduler.tick_interval_seconds.max(1)),
        ..Default::default()
    };

    let mut scheduler = ReminderScheduler::new(
        Arc::clone(&context.reminder_service),
        scheduler_config,
        Arc::clone(&context.metrics),
    );

    let start_timeout = Duration::from_secs(10);
    tokio::time::timeout(start_timeout, scheduler.start())
        .await
        .map_err(|_| {
            tracing::error!(timeout_secs = 10, "ReminderScheduler start timed out");
            CohortError::Internal("ReminderScheduler start timed out after 10s".into())
        })?
        .map_err(|err| {
            tracing::error!(error = %err, "failed to start ReminderScheduler");
            CohortError::Internal(format!("failed to start ReminderScheduler: {}", err))
        })?;

    Ok(scheduler)
}

/// Create and start the purge scheduler (fail-fast initialization)
pub async fn create_purge_scheduler(context: &AppContext) -> Result<PurgeScheduler> {
    let job: Arc<dyn PurgeJob> = Arc::new(OtpPurgeJob::new(context.otp_store.clone()));
    let scheduler_config = PurgeSchedulerConfig {
        cron_expression: context.config.otp.purge_cron.clone(),
        ..Default::default()
    };

    let mut scheduler =
        PurgeScheduler::with_config(scheduler_config, job, Arc::clone(&context.metrics))
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "failed to construct PurgeScheduler");
                CohortError::Internal(format!("failed to construct PurgeScheduler: {}", err))
            })?;

    let start_timeout = Duration::from_secs(10);
    tokio::time::timeout(start_timeout, scheduler.start())
        .await
        .map_err(|_| {
            tracing::error!(timeout_secs = 10, "PurgeScheduler start timed out");
            CohortError::Internal("PurgeScheduler start timed out after 10s".into())
        })?
        .map_err(|err| {
            tracing::error!(error = %err, "failed to start PurgeScheduler");
            CohortError::Internal(format!("failed to start PurgeScheduler: {}", err))
        })?;

    Ok(scheduler)
}
