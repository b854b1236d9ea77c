//! Session scheduler
//!
//! A single actor task owns the scheduler state and every timer. Callers
//! talk to it through a cloneable [`SchedulerHandle`]; commands, ticks and
//! timer expiries are handled one at a time, so a slow capture delays the
//! next tick instead of overlapping it.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use suncap_api::{
    CaptureStatus, CaptureWindow, EventType, ManualStartOptions, ManualStartOutcome, PlanOutcome,
    SchedulerEvent, SchedulerStateSnapshot, SessionEndReason,
};
use suncap_config::{Settings, SettingsSource};
use suncap_host_api::ArtifactBuilder;
use suncap_util::{Clock, Result, SessionId, SuncapError, duration_until, format_duration};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};

use crate::{CaptureAgent, CaptureWindowPlanner, PlanAction, SunEventProvider};

const COMMAND_CHANNEL_SIZE: usize = 32;
const EVENT_CHANNEL_SIZE: usize = 256;

enum Command {
    Initialize(oneshot::Sender<()>),
    ManualStart(ManualStartOptions, oneshot::Sender<Result<ManualStartOutcome>>),
    ManualStop(oneshot::Sender<Result<()>>),
    Reschedule(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable front door to the scheduler task
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SchedulerStateSnapshot>,
    events: broadcast::Sender<SchedulerEvent>,
}

impl SchedulerHandle {
    /// Latest published state; never waits on the scheduler
    pub fn get_state(&self) -> SchedulerStateSnapshot {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<SchedulerStateSnapshot> {
        self.state.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.events.subscribe()
    }

    /// Arm the daily refresh, fetch today's sun data and plan. Idempotent.
    pub async fn initialize(&self) -> Result<()> {
        self.request(Command::Initialize).await
    }

    pub async fn manual_start(&self, options: ManualStartOptions) -> Result<ManualStartOutcome> {
        self.request(|reply| Command::ManualStart(options, reply))
            .await?
    }

    pub async fn manual_stop(&self) -> Result<()> {
        self.request(Command::ManualStop).await?
    }

    /// Drop any session without building, then plan again
    pub async fn reschedule(&self) -> Result<()> {
        self.request(Command::Reschedule).await
    }

    /// Cancel every timer and stop the scheduler task.
    ///
    /// Calling this on a scheduler that has already stopped is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        match self.request(Command::Shutdown).await {
            Err(SuncapError::SchedulerStopped) => Ok(()),
            other => other,
        }
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| SuncapError::SchedulerStopped)?;
        rx.await.map_err(|_| SuncapError::SchedulerStopped)
    }
}

/// How a session ends
#[derive(Debug, Clone, Copy)]
enum SessionBound {
    /// Automatic: the window closes
    Until(CaptureWindow),
    /// Manual: after this many captures, or only on stop
    Captures(Option<u32>),
}

#[derive(Debug)]
struct ActiveSession {
    id: SessionId,
    date: NaiveDate,
    event_type: EventType,
    bound: SessionBound,
    camera_url: String,
    timezone: Tz,
    artifact_timeout: Duration,
}

#[derive(Debug, Clone, Copy)]
enum DeadlineKind {
    WindowStart(CaptureWindow),
    SessionEnd,
}

/// The single one-shot slot shared by the waiting and session-end timers
struct Deadline {
    kind: DeadlineKind,
    sleep: Pin<Box<Sleep>>,
}

enum Wake {
    Command(Command),
    Tick,
    Deadline,
    DailyRefresh,
    Closed,
}

/// Owns the scheduler state machine and all of its timers
pub struct SessionController {
    settings: Arc<dyn SettingsSource>,
    provider: Arc<SunEventProvider>,
    planner: CaptureWindowPlanner,
    agent: CaptureAgent,
    builder: Arc<dyn ArtifactBuilder>,
    clock: Arc<dyn Clock>,

    state: SchedulerStateSnapshot,
    session: Option<ActiveSession>,
    initialized: bool,
    replan_pending: bool,
    /// Captures of the most recently ended session
    last_session_captures: u32,
    /// Window whose automatic session ran until it closed
    finished_window: Option<CaptureWindow>,

    tick: Option<Interval>,
    deadline: Option<Deadline>,
    daily_refresh: Option<Pin<Box<Sleep>>>,

    state_tx: watch::Sender<SchedulerStateSnapshot>,
    events: broadcast::Sender<SchedulerEvent>,
}

impl SessionController {
    pub fn new(
        settings: Arc<dyn SettingsSource>,
        provider: Arc<SunEventProvider>,
        agent: CaptureAgent,
        builder: Arc<dyn ArtifactBuilder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SchedulerStateSnapshot::default());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        Self {
            planner: CaptureWindowPlanner::new(provider.clone(), clock.clone()),
            settings,
            provider,
            agent,
            builder,
            clock,
            state: SchedulerStateSnapshot::default(),
            session: None,
            initialized: false,
            replan_pending: false,
            last_session_captures: 0,
            finished_window: None,
            tick: None,
            deadline: None,
            daily_refresh: None,
            state_tx,
            events,
        }
    }

    /// Start the scheduler task. Must be called inside a tokio runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let handle = SchedulerHandle {
            commands: tx,
            state: self.state_tx.subscribe(),
            events: self.events.clone(),
        };

        tokio::spawn(self.run(rx));
        handle
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        debug!("Scheduler task started");

        loop {
            let wake = tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => Wake::Command(cmd),
                    None => Wake::Closed,
                },
                _ = next_tick(&mut self.tick) => Wake::Tick,
                _ = deadline_elapsed(&mut self.deadline) => Wake::Deadline,
                _ = sleep_elapsed(&mut self.daily_refresh) => Wake::DailyRefresh,
            };

            match wake {
                Wake::Command(Command::Shutdown(reply)) => {
                    self.shutdown();
                    let _ = reply.send(());
                    break;
                }
                Wake::Closed => {
                    debug!("All scheduler handles dropped");
                    self.shutdown();
                    break;
                }
                Wake::Command(cmd) => self.handle_command(cmd).await,
                Wake::Tick => self.on_tick().await,
                Wake::Deadline => self.on_deadline().await,
                Wake::DailyRefresh => self.on_daily_refresh().await,
            }

            if std::mem::take(&mut self.replan_pending) {
                self.plan().await;
            }
            self.publish();
        }

        info!("Scheduler stopped");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Initialize(reply) => {
                self.initialize().await;
                let _ = reply.send(());
            }
            Command::ManualStart(options, reply) => {
                let result = self.manual_start(options).await;
                let _ = reply.send(result);
            }
            Command::ManualStop(reply) => {
                let result = self.manual_stop().await;
                let _ = reply.send(result);
            }
            Command::Reschedule(reply) => {
                self.reschedule().await;
                let _ = reply.send(());
            }
            // Handled by the run loop
            Command::Shutdown(reply) => {
                let _ = reply.send(());
            }
        }
    }

    async fn initialize(&mut self) {
        if self.initialized {
            debug!("Scheduler already initialized");
            return;
        }
        self.initialized = true;
        info!("Initializing scheduler");

        let settings = self.load_settings();
        self.arm_daily_refresh(settings.as_ref());

        if let Some(settings) = &settings {
            self.refresh_sun_data(settings).await;
        }

        self.plan().await;
        info!(status = ?self.state.status, "Scheduler initialized");
    }

    /// Plan today's window from fresh settings and act on it
    async fn plan(&mut self) {
        let Some(settings) = self.load_settings() else {
            self.deadline = None;
            self.state.next_capture_window = None;
            self.set_status(CaptureStatus::Idle);
            self.emit(SchedulerEvent::WindowPlanned {
                window: None,
                outcome: PlanOutcome::Idle,
            });
            return;
        };

        let plan = match self.planner.plan_next(&settings).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "Cannot plan capture window");
                self.record_error(&e);
                self.deadline = None;
                self.state.next_capture_window = None;
                self.set_status(CaptureStatus::Idle);
                self.emit(SchedulerEvent::WindowPlanned {
                    window: None,
                    outcome: PlanOutcome::Idle,
                });
                return;
            }
        };

        // The session-end timer fires at `end`, which is still inside the window
        let action = match plan.action {
            PlanAction::StartNow { .. }
                if plan.window.is_some() && plan.window == self.finished_window =>
            {
                PlanAction::DeferToNextCycle
            }
            other => other,
        };

        self.state.next_capture_window = plan.window;
        self.emit(SchedulerEvent::WindowPlanned {
            window: plan.window,
            outcome: action.outcome(),
        });

        match action {
            PlanAction::Idle => {
                info!("Capture is disabled");
                self.deadline = None;
                self.set_status(CaptureStatus::Idle);
            }
            PlanAction::StartNow { end } => {
                if let Some(window) = plan.window {
                    info!(end = %end, "Inside capture window, starting session");
                    self.deadline = None;
                    self.start_session(
                        SessionBound::Until(window),
                        settings.capture.interval,
                        &settings,
                    )
                    .await;
                }
            }
            PlanAction::ScheduleAt { start, end } => {
                if let Some(window) = plan.window {
                    info!(
                        start = %start,
                        end = %end,
                        in_minutes = duration_until(self.clock.now(), start).as_secs() / 60,
                        "Capture window scheduled"
                    );
                    self.arm_deadline(DeadlineKind::WindowStart(window), start);
                    self.set_status(CaptureStatus::Waiting);
                }
            }
            PlanAction::DeferToNextCycle => {
                info!("Today's capture window has passed, waiting for the next daily refresh");
                self.deadline = None;
                self.set_status(CaptureStatus::Idle);
            }
        }
    }

    async fn start_session(&mut self, bound: SessionBound, interval: Duration, settings: &Settings) {
        let id = SessionId::new();
        let timezone = settings.timezone();
        let date = self.clock.today(timezone);
        let max_captures = match bound {
            SessionBound::Captures(limit) => limit,
            SessionBound::Until(_) => None,
        };
        let manual = matches!(bound, SessionBound::Captures(_));

        self.session = Some(ActiveSession {
            id,
            date,
            event_type: settings.capture.event_type,
            bound,
            camera_url: settings.camera.url.clone(),
            timezone,
            artifact_timeout: settings.artifact.timeout,
        });

        self.state.session_id = Some(id);
        self.state.capture_count = 0;
        self.state.max_captures = max_captures;
        self.state.current_session_date = Some(date);
        self.state.last_error = None;
        self.state.last_capture = None;
        self.set_status(CaptureStatus::Capturing);

        match bound {
            SessionBound::Until(window) => self.arm_deadline(DeadlineKind::SessionEnd, window.end),
            SessionBound::Captures(_) => self.deadline = None,
        }

        info!(
            session_id = %id,
            date = %date,
            manual,
            interval_secs = interval.as_secs(),
            max_captures = ?max_captures,
            "Capture session started"
        );
        self.emit(SchedulerEvent::SessionStarted {
            session_id: id,
            date,
            manual,
            max_captures,
        });

        self.capture_once().await;

        // The immediate capture may already have completed a manual session
        if self.session.as_ref().is_some_and(|s| s.id == id) {
            let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            self.tick = Some(tick);
            debug!(interval_secs = interval.as_secs(), "Capture tick armed");
        }
    }

    async fn capture_once(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let id = session.id;
        let bound = session.bound;
        let url = session.camera_url.clone();
        let timezone = session.timezone;

        match self.agent.capture(&url, timezone).await {
            Ok(record) => {
                self.state.capture_count += 1;
                self.state.last_capture = Some(record.clone());
                let count = self.state.capture_count;
                self.emit(SchedulerEvent::CaptureCompleted {
                    session_id: id,
                    capture_count: count,
                    record,
                });

                if let SessionBound::Captures(Some(limit)) = bound
                    && count >= limit
                {
                    info!(session_id = %id, captures = count, "Capture limit reached");
                    self.end_session(SessionEndReason::LimitReached).await;
                }
            }
            Err(e) => {
                warn!(session_id = %id, error = %e, "Capture failed");
                self.record_error(&e);
                self.emit(SchedulerEvent::CaptureFailed {
                    session_id: id,
                    error: e.to_string(),
                });
            }
        }
        self.publish();
    }

    /// Stop the session, build its artifact if anything was captured, go
    /// idle and request a re-plan
    async fn end_session(&mut self, reason: SessionEndReason) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.tick = None;
        self.deadline = None;
        if let SessionBound::Until(window) = session.bound
            && reason == SessionEndReason::WindowClosed
        {
            self.finished_window = Some(window);
        }

        let captures = self.state.capture_count;
        info!(session_id = %session.id, captures, reason = ?reason, "Capture session ended");
        self.emit(SchedulerEvent::SessionEnded {
            session_id: session.id,
            capture_count: captures,
            reason,
        });

        if captures > 0 {
            self.set_status(CaptureStatus::Generating);
            info!(date = %session.date, event = %session.event_type, captures, "Building artifact");

            let build = self.builder.build(session.date, session.event_type);
            let result = match tokio::time::timeout(session.artifact_timeout, build).await {
                Ok(result) => result.map_err(|e| SuncapError::artifact(e.to_string())),
                Err(_) => Err(SuncapError::artifact(format!(
                    "timed out after {}",
                    format_duration(session.artifact_timeout)
                ))),
            };

            match result {
                Ok(path) => {
                    info!(path = %path.display(), "Artifact built");
                    self.emit(SchedulerEvent::ArtifactBuilt {
                        date: session.date,
                        event_type: session.event_type,
                        path,
                    });
                }
                Err(error) => {
                    warn!(error = %error, "Artifact build failed");
                    self.record_error(&error);
                    self.emit(SchedulerEvent::ArtifactFailed {
                        date: session.date,
                        event_type: session.event_type,
                        error: error.to_string(),
                    });
                }
            }
        }

        self.last_session_captures = captures;
        self.clear_session_state();
        self.set_status(CaptureStatus::Idle);
        self.replan_pending = true;
    }

    async fn manual_start(&mut self, options: ManualStartOptions) -> Result<ManualStartOutcome> {
        if self.state.status == CaptureStatus::Capturing {
            return Err(SuncapError::AlreadyCapturing);
        }

        let settings = self
            .settings
            .load()
            .map_err(|e| SuncapError::config(e.to_string()))?;

        if let Some(Deadline {
            kind: DeadlineKind::WindowStart(window),
            ..
        }) = self.deadline.take()
        {
            info!(start = %window.start, "Cancelled scheduled window for manual session");
        }

        let interval = options.interval(settings.capture.interval);
        let limit = options.capture_limit();
        info!(
            interval_secs = interval.as_secs(),
            max_captures = ?limit,
            "Manual capture session requested"
        );

        self.start_session(SessionBound::Captures(limit), interval, &settings)
            .await;

        if self.session.is_some() {
            Ok(ManualStartOutcome::Started)
        } else {
            // Finished on the immediate capture
            Ok(ManualStartOutcome::Completed {
                captures: self.last_session_captures,
            })
        }
    }

    async fn manual_stop(&mut self) -> Result<()> {
        if self.state.status != CaptureStatus::Capturing {
            return Err(SuncapError::NotCapturing);
        }

        info!("Manual stop requested");
        self.end_session(SessionEndReason::Stopped).await;
        Ok(())
    }

    async fn reschedule(&mut self) {
        info!("Rescheduling capture window");
        self.tick = None;
        self.deadline = None;
        self.finished_window = None;

        if let Some(session) = self.session.take() {
            warn!(
                session_id = %session.id,
                captures = self.state.capture_count,
                "Discarding active session without building"
            );
            self.emit(SchedulerEvent::SessionEnded {
                session_id: session.id,
                capture_count: self.state.capture_count,
                reason: SessionEndReason::Rescheduled,
            });
            self.clear_session_state();
        }

        self.set_status(CaptureStatus::Idle);
        self.plan().await;
    }

    fn shutdown(&mut self) {
        info!("Shutting down scheduler");
        self.tick = None;
        self.deadline = None;
        self.daily_refresh = None;

        if let Some(session) = self.session.take() {
            info!(
                session_id = %session.id,
                captures = self.state.capture_count,
                "Abandoning active session"
            );
            self.clear_session_state();
        }
        self.set_status(CaptureStatus::Idle);
    }

    async fn on_tick(&mut self) {
        if self.session.is_none() {
            self.tick = None;
            return;
        }
        self.capture_once().await;
    }

    async fn on_deadline(&mut self) {
        let Some(deadline) = self.deadline.take() else {
            return;
        };

        match deadline.kind {
            DeadlineKind::WindowStart(window) => {
                info!(end = %window.end, "Capture window opened");

                let Some(settings) = self.load_settings() else {
                    self.set_status(CaptureStatus::Idle);
                    return;
                };
                if !settings.capture.enabled {
                    self.plan().await;
                    return;
                }

                self.start_session(
                    SessionBound::Until(window),
                    settings.capture.interval,
                    &settings,
                )
                .await;
            }
            DeadlineKind::SessionEnd => {
                info!("Capture window closed");
                self.end_session(SessionEndReason::WindowClosed).await;
            }
        }
    }

    async fn on_daily_refresh(&mut self) {
        self.daily_refresh = None;
        info!("Daily sun data refresh");

        let settings = self.load_settings();
        if let Some(settings) = &settings {
            self.refresh_sun_data(settings).await;
        }
        self.arm_daily_refresh(settings.as_ref());

        if matches!(
            self.state.status,
            CaptureStatus::Capturing | CaptureStatus::Generating
        ) {
            debug!("Session active, planning deferred until it ends");
            return;
        }
        self.plan().await;
    }

    async fn refresh_sun_data(&mut self, settings: &Settings) {
        let date = self.clock.today(settings.timezone());
        match self.provider.refresh(&settings.location, date).await {
            Ok(record) => self.emit(SchedulerEvent::SunDataRefreshed {
                date: record.date,
                sunrise: record.sunrise,
                sunset: record.sunset,
            }),
            Err(e) => {
                warn!(error = %e, "Sun data refresh failed");
                self.record_error(&e);
            }
        }
    }

    fn arm_daily_refresh(&mut self, settings: Option<&Settings>) {
        let (at, tz) = match settings {
            Some(s) => (s.service.refresh_at, s.timezone()),
            None => {
                let defaults = Settings::default();
                (defaults.service.refresh_at, defaults.timezone())
            }
        };

        let now = self.clock.now();
        let next = at.next_occurrence(now, tz);
        debug!(next = %next, "Daily refresh armed");
        self.daily_refresh = Some(Box::pin(tokio::time::sleep(duration_until(now, next))));
    }

    fn arm_deadline(&mut self, kind: DeadlineKind, at: DateTime<Utc>) {
        let wait = duration_until(self.clock.now(), at);
        debug!(at = %at, wait_secs = wait.as_secs(), kind = ?kind, "Deadline armed");
        self.deadline = Some(Deadline {
            kind,
            sleep: Box::pin(tokio::time::sleep(wait)),
        });
    }

    fn load_settings(&mut self) -> Option<Settings> {
        match self.settings.load() {
            Ok(settings) => Some(settings),
            Err(e) => {
                let error = SuncapError::config(e.to_string());
                warn!(error = %error, "Failed to load settings");
                self.record_error(&error);
                None
            }
        }
    }

    fn clear_session_state(&mut self) {
        self.state.session_id = None;
        self.state.capture_count = 0;
        self.state.max_captures = None;
        self.state.current_session_date = None;
    }

    fn record_error(&mut self, error: &impl Display) {
        self.state.last_error = Some(error.to_string());
    }

    fn set_status(&mut self, status: CaptureStatus) {
        if self.state.status != status {
            debug!(from = ?self.state.status, to = ?status, "Status changed");
            self.state.status = status;
        }
        self.publish();
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }

    fn emit(&self, event: SchedulerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

async fn next_tick(tick: &mut Option<Interval>) {
    match tick {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn deadline_elapsed(deadline: &mut Option<Deadline>) {
    match deadline {
        Some(d) => d.sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn sleep_elapsed(sleep: &mut Option<Pin<Box<Sleep>>>) {
    match sleep {
        Some(s) => s.as_mut().await,
        None => std::future::pending().await,
    }
}
