//! suncapd - The suncap background service
//!
//! This is the main entry point for the suncapd service.
//! It wires together all the components:
//! - Configuration loading
//! - Data directory layout and the sun-event cache
//! - Camera, sun-event service and artifact builder
//! - The session controller

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use suncap_api::{EventType, SchedulerEvent};
use suncap_config::{FileSettings, Settings, load_or_init};
use suncap_core::{
    CaptureAgent, PlanAction, RetryPolicy, SessionController, SunEventProvider, decide, window_for,
};
use suncap_host_api::ArtifactBuilder;
use suncap_host_http::{
    CommandArtifactBuilder, HttpCamera, ManifestArtifactBuilder, SunriseSunsetClient,
};
use suncap_store::{CaptureCatalog, JsonFileCache};
use suncap_util::{
    Clock, DataLayout, SystemClock, data_dir_without_env, default_config_path, duration_until,
    format_duration,
};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// suncapd - Sunrise and sunset timelapse capture service
#[derive(Parser, Debug)]
#[command(name = "suncapd")]
#[command(about = "Sunrise and sunset timelapse capture service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/suncap/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set SUNCAP_DATA_DIR env var)
    #[arg(short, long, env = "SUNCAP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Run the scheduler until signalled (default)
    Run,
    /// Validate the config, probe the camera and show today's window
    Check,
    /// List capture dates, or the frames captured on DATE
    Captures {
        /// Date as YYYY-MM-DD
        date: Option<NaiveDate>,
    },
    /// Build the artifact for the frames captured on DATE
    Build {
        /// Date as YYYY-MM-DD
        date: NaiveDate,
        /// Event the frames belong to (default: the configured event)
        #[arg(long)]
        event: Option<EventType>,
    },
    /// Show today's sun times, from the cache when it is current
    Sun {
        /// Fetch from the sun-event service even on a cache hit
        #[arg(long)]
        refresh: bool,
    },
}

/// Main service state
struct Service {
    config_path: PathBuf,
    settings: Settings,
    layout: DataLayout,
    catalog: CaptureCatalog,
    provider: Arc<SunEventProvider>,
    agent: CaptureAgent,
    builder: Arc<dyn ArtifactBuilder>,
    clock: Arc<dyn Clock>,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        let settings = load_or_init(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            event = %settings.capture.event_type,
            enabled = settings.capture.enabled,
            "Configuration loaded"
        );

        let data_dir = args
            .data_dir
            .clone()
            .or_else(|| settings.service.data_dir.clone())
            .unwrap_or_else(data_dir_without_env);

        let layout = DataLayout::new(&data_dir);
        layout
            .ensure_dirs()
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        info!(data_dir = %data_dir.display(), "Data directory ready");

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let catalog = CaptureCatalog::new(layout.clone());

        let camera = HttpCamera::new(RetryPolicy::default().attempt_timeout)
            .context("Failed to create camera client")?;
        let sun_service = SunriseSunsetClient::new(
            settings.service.sun_api_url.clone(),
            settings.service.sun_api_timeout,
        )
        .context("Failed to create sun-event client")?;

        let provider = Arc::new(SunEventProvider::new(
            Arc::new(sun_service),
            Arc::new(JsonFileCache::new(layout.sun_cache_path())),
            clock.clone(),
        ));

        let builder: Arc<dyn ArtifactBuilder> = match &settings.artifact.command {
            Some(argv) => {
                info!(command = ?argv, "Using external artifact command");
                Arc::new(CommandArtifactBuilder::new(argv.clone()))
            }
            None => Arc::new(ManifestArtifactBuilder::new(catalog.clone())),
        };

        let agent = CaptureAgent::new(Arc::new(camera), catalog.clone(), clock.clone());

        Ok(Self {
            config_path: args.config.clone(),
            settings,
            layout,
            catalog,
            provider,
            agent,
            builder,
            clock,
        })
    }

    async fn run(self) -> Result<()> {
        let controller = SessionController::new(
            Arc::new(FileSettings::new(&self.config_path)),
            self.provider,
            self.agent,
            self.builder,
            self.clock,
        );
        let scheduler = controller.spawn();
        let mut events = scheduler.subscribe();
        let mut state = scheduler.watch_state();
        let mut status = state.borrow().status;

        scheduler
            .initialize()
            .await
            .context("Failed to initialize scheduler")?;

        // Set up signal handlers
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup =
            signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                Ok(()) = state.changed() => {
                    let current = state.borrow_and_update().status;
                    if current != status {
                        debug!(from = ?status, to = ?current, "Status changed");
                        status = current;
                    }
                }

                event = events.recv() => match event {
                    Ok(event) => log_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event log fell behind");
                    }
                    Err(RecvError::Closed) => {
                        warn!("Scheduler stopped unexpectedly");
                        break;
                    }
                },
            }
        }

        info!("Shutting down suncapd");

        scheduler
            .shutdown()
            .await
            .context("Failed to stop scheduler")?;

        info!("Shutdown complete");
        Ok(())
    }

    async fn check(self) -> Result<()> {
        let tz = self.settings.timezone();
        let mut failures = 0;

        println!("Config:    {} (valid)", self.config_path.display());
        println!("Data dir:  {}", self.layout.root().display());

        let url = &self.settings.camera.url;
        match self.agent.probe(url).await {
            Ok(bytes) => println!("Camera:    {} ({} bytes)", url, bytes),
            Err(e) => {
                failures += 1;
                println!("Camera:    {} FAILED: {}", url, e);
            }
        }

        match self.provider.today(&self.settings.location).await {
            Ok(record) => {
                println!(
                    "Sun times: {} sunrise {} sunset {}",
                    record.date,
                    local(record.sunrise, tz),
                    local(record.sunset, tz)
                );

                let window = window_for(&record, &self.settings);
                let now = self.clock.now();
                println!(
                    "Window:    {} {} - {}",
                    window.event_type,
                    local(window.start, tz),
                    local(window.end, tz)
                );

                let decision = match decide(&window, now) {
                    PlanAction::StartNow { end } => {
                        format!("capture now for {}", format_duration(duration_until(now, end)))
                    }
                    PlanAction::ScheduleAt { start, .. } => {
                        format!("start in {}", format_duration(duration_until(now, start)))
                    }
                    PlanAction::DeferToNextCycle => "window elapsed, wait for tomorrow".into(),
                    PlanAction::Idle => "idle".into(),
                };
                if self.settings.capture.enabled {
                    println!("Decision:  {}", decision);
                } else {
                    println!("Decision:  capture disabled ({} if enabled)", decision);
                }
            }
            Err(e) => {
                failures += 1;
                println!("Sun times: FAILED: {}", e);
            }
        }

        if failures > 0 {
            anyhow::bail!("{} check(s) failed", failures);
        }
        Ok(())
    }

    async fn build(&self, date: NaiveDate, event: Option<EventType>) -> Result<()> {
        let event_type = event.unwrap_or(self.settings.capture.event_type);
        let frames = self
            .catalog
            .list_captures(date)
            .with_context(|| format!("Failed to list captures for {}", date))?
            .len();
        info!(date = %date, event = %event_type, frames, "Building artifact");

        let timeout = self.settings.artifact.timeout;
        let path = tokio::time::timeout(timeout, self.builder.build(date, event_type))
            .await
            .map_err(|_| {
                anyhow::anyhow!("Artifact build timed out after {}", format_duration(timeout))
            })?
            .with_context(|| format!("Failed to build {} artifact for {}", event_type, date))?;

        println!("{}", path.display());
        Ok(())
    }

    async fn sun(&self, refresh: bool) -> Result<()> {
        let location = &self.settings.location;
        let tz = location.timezone;
        let record = if refresh {
            self.provider
                .refresh(location, self.clock.today(tz))
                .await
                .context("Failed to refresh sun times")?
        } else {
            self.provider
                .today(location)
                .await
                .context("Failed to get sun times")?
        };

        println!("Date:        {}", record.date);
        println!("Sunrise:     {}", local(record.sunrise, tz));
        println!("Solar noon:  {}", local(record.solar_noon, tz));
        println!("Sunset:      {}", local(record.sunset, tz));
        println!(
            "Day length:  {}",
            format_duration(std::time::Duration::from_secs(record.day_length))
        );
        println!(
            "Fetched at:  {}",
            record.fetched_at.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S")
        );
        Ok(())
    }

    fn captures(&self, date: Option<NaiveDate>) -> Result<()> {
        match date {
            Some(date) => {
                let frames = self
                    .catalog
                    .list_captures(date)
                    .with_context(|| format!("Failed to list captures for {}", date))?;
                if frames.is_empty() {
                    println!("No captures on {}", date);
                }
                for frame in frames {
                    println!(
                        "{}  {:>9} bytes  {}",
                        frame.time,
                        frame.byte_size,
                        frame.file_path.display()
                    );
                }
            }
            None => {
                let dates = self
                    .catalog
                    .capture_dates()
                    .context("Failed to list capture dates")?;
                if dates.is_empty() {
                    println!("No captures in {}", self.layout.captures_dir().display());
                }
                for date in dates {
                    let count = self.catalog.list_captures(date)?.len();
                    println!("{}  {} frames", date, count);
                }
            }
        }
        Ok(())
    }
}

fn local(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%H:%M:%S").to_string()
}

fn log_event(event: &SchedulerEvent) {
    match event {
        SchedulerEvent::SunDataRefreshed {
            date,
            sunrise,
            sunset,
        } => {
            info!(date = %date, sunrise = %sunrise, sunset = %sunset, "Sun data refreshed");
        }
        SchedulerEvent::WindowPlanned { window, outcome } => match window {
            Some(window) => info!(
                event = %window.event_type,
                start = %window.start,
                end = %window.end,
                outcome = ?outcome,
                "Capture window planned"
            ),
            None => info!(outcome = ?outcome, "No capture window"),
        },
        SchedulerEvent::SessionStarted {
            session_id,
            date,
            manual,
            max_captures,
        } => {
            info!(
                session_id = %session_id,
                date = %date,
                manual,
                max_captures = ?max_captures,
                "Session started"
            );
        }
        SchedulerEvent::CaptureCompleted {
            session_id,
            capture_count,
            record,
        } => {
            info!(
                session_id = %session_id,
                capture_count,
                file = %record.file_path.display(),
                "Capture completed"
            );
        }
        SchedulerEvent::CaptureFailed { session_id, error } => {
            warn!(session_id = %session_id, error = %error, "Capture failed");
        }
        SchedulerEvent::SessionEnded {
            session_id,
            capture_count,
            reason,
        } => {
            info!(
                session_id = %session_id,
                capture_count,
                reason = ?reason,
                "Session ended"
            );
        }
        SchedulerEvent::ArtifactBuilt {
            date,
            event_type,
            path,
        } => {
            info!(date = %date, event = %event_type, path = %path.display(), "Artifact built");
        }
        SchedulerEvent::ArtifactFailed {
            date,
            event_type,
            error,
        } => {
            warn!(date = %date, event = %event_type, error = %error, "Artifact build failed");
        }
    }
}

fn init_logging(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // stdout belongs to the check and captures reports
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match args.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    info!(version = env!("CARGO_PKG_VERSION"), "suncapd starting");

    if suncap_util::is_mock_time_active() {
        warn!("Mock time is active, the scheduler clock is offset");
    }

    let service = Service::new(&args)?;

    match args.command.clone().unwrap_or(Command::Run) {
        Command::Run => service.run().await,
        Command::Check => service.check().await,
        Command::Captures { date } => service.captures(date),
        Command::Build { date, event } => service.build(date, event).await,
        Command::Sun { refresh } => service.sun(refresh).await,
    }
}
