//! Daemon orchestration -- configuration, sweeper assembly, and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `catsweep-daemon`.
//! It loads configuration, builds the sweeper, wires its record channel
//! to the output writer, and manages startup/shutdown ordering.
//!
//! # Startup Order
//!
//! 1. PID file
//! 2. Record writer (consumer first, so no record waits on a missing reader)
//! 3. Sweeper periodic task
//!
//! # Shutdown Order
//!
//! 1. Sweeper (finishes the in-progress cycle, then stops producing)
//! 2. Record writer (drains queued records, flushes output)
//! 3. PID file removal

use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::io::AsyncWrite;
use tokio::sync::{broadcast, mpsc};

use catsweep_core::config::CatSweepConfig;
use catsweep_core::error::{CatSweepError, ConfigError};
use catsweep_core::event::RecordEvent;
use catsweep_core::pipeline::{HealthStatus, Pipeline};
use catsweep_sweeper::{CatSweeper, CatSweeperBuilder, SweepConfig, SweepReport};

use crate::cli::DaemonCli;
use crate::health::{ComponentHealth, DaemonHealth, aggregate_status};
use crate::metrics_server;
use crate::pid_file::{remove_pid_file, write_pid_file};
use crate::writer::spawn_record_writer;

/// Record channel capacity between the sweeper and the writer.
const RECORD_CHANNEL_CAPACITY: usize = 1024;

/// Interval between health log lines in the main loop.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Load configuration with the full override chain.
///
/// Order: file -> `CATSWEEP_*` environment variables -> CLI flags -> validation.
pub async fn load_config(cli: &DaemonCli) -> Result<CatSweepConfig> {
    let content = tokio::fs::read_to_string(&cli.config)
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CatSweepError::Config(ConfigError::FileNotFound {
                    path: cli.config.display().to_string(),
                })
            } else {
                CatSweepError::Io(e)
            }
        })
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;

    let mut config = CatSweepConfig::parse(&content)
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    Ok(config)
}

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: CatSweepConfig,
    /// The sweeper module.
    sweeper: CatSweeper,
    /// Record receiver, taken by the writer when it starts.
    record_rx: Option<mpsc::Receiver<RecordEvent>>,
    /// Shutdown broadcast sender (signals background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Running record writer.
    writer_task: Option<tokio::task::JoinHandle<u64>>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration from a file and build the orchestrator.
    ///
    /// Applies environment overrides but no CLI overrides.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = CatSweepConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// Invalid configuration is rejected here, before any file is touched.
    pub async fn build_from_config(config: CatSweepConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        let sweep_config = SweepConfig::from_core(&config.sweep)
            .map_err(|e| anyhow::anyhow!("invalid sweep configuration: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            record_daemon_metrics();
        }

        let (sweeper, record_rx) = CatSweeperBuilder::new()
            .config(sweep_config)
            .record_channel_capacity(RECORD_CHANNEL_CAPACITY)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build sweeper: {}", e))?;

        let (shutdown_tx, _) = broadcast::channel(16);

        tracing::info!(
            glob = %sweeper.config().file_path_with_glob,
            format = %sweeper.config().format,
            cat_mode = %sweeper.config().cat_mode,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            sweeper,
            record_rx,
            shutdown_tx,
            writer_task: None,
            start_time: Instant::now(),
        })
    }

    /// Run until SIGTERM or SIGINT, writing records to stdout.
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(wait_for_shutdown_signal(), tokio::io::stdout())
            .await
    }

    /// Run until `shutdown` resolves, writing records to `out`.
    pub async fn run_until<F, W>(&mut self, shutdown: F, out: W) -> Result<()>
    where
        F: Future<Output = Result<&'static str>>,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let pid_path = self.pid_path().map(Path::to_path_buf);
        if let Some(path) = &pid_path {
            write_pid_file(path)?;
        }

        self.start_writer(out)?;

        if let Err(e) = self.sweeper.start().await {
            tracing::error!(error = %e, "sweeper failed to start");
            self.stop_writer().await;
            if let Some(path) = &pid_path {
                remove_pid_file(path);
            }
            return Err(e.into());
        }

        let uptime_task = self
            .config
            .metrics
            .enabled
            .then(|| spawn_uptime_updater(self.start_time, self.shutdown_tx.subscribe()));

        tracing::info!("entering main loop");
        let mut health_interval = tokio::time::interval(HEALTH_LOG_INTERVAL);
        health_interval.tick().await;
        tokio::pin!(shutdown);

        let signal = loop {
            tokio::select! {
                signal = &mut shutdown => break signal,
                _ = health_interval.tick() => {
                    let health = self.health().await;
                    if health.status.is_healthy() {
                        tracing::debug!(cycles = health.cycles_completed, "daemon healthy");
                    } else {
                        tracing::warn!(status = %health.status, "daemon not healthy");
                    }
                }
            }
        };

        match &signal {
            Ok(name) => tracing::info!(signal = name, "shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "shutdown listener failed"),
        }

        let stop_result = self.shutdown().await;

        if let Some(task) = uptime_task {
            let _ = task.await;
        }
        if let Some(path) = &pid_path {
            remove_pid_file(path);
        }

        signal?;
        stop_result
    }

    /// Run a single sweep cycle, write its records to `out`, and return the report.
    pub async fn run_once<W>(&mut self, out: W) -> Result<SweepReport>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.start_writer(out)?;
        let result = self.sweeper.run_cycle().await;
        self.stop_writer().await;

        let report = result.map_err(|e| anyhow::anyhow!("sweep cycle failed: {}", e))?;
        tracing::info!(
            scanned = report.scanned,
            records = report.records_emitted,
            finalized = report.finalized(),
            quarantined = report.quarantined,
            "single sweep cycle completed"
        );
        Ok(report)
    }

    /// Stop the sweeper, then drain the writer.
    async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("stopping sweeper");
        let result = self.sweeper.stop().await;
        self.stop_writer().await;
        result.map_err(Into::into)
    }

    fn start_writer<W>(&mut self, out: W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let record_rx = self
            .record_rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("record writer already started"))?;
        self.writer_task = Some(spawn_record_writer(
            record_rx,
            self.shutdown_tx.subscribe(),
            out,
        ));
        Ok(())
    }

    async fn stop_writer(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(task) = self.writer_task.take() {
            match task.await {
                Ok(written) => tracing::info!(written, "record writer stopped"),
                Err(e) => tracing::error!(error = %e, "record writer ended abnormally"),
            }
        }
    }

    fn pid_path(&self) -> Option<&Path> {
        let pid_file = self.config.general.pid_file.as_str();
        (!pid_file.is_empty()).then(|| Path::new(pid_file))
    }

    /// Get the current aggregated health status.
    pub async fn health(&self) -> DaemonHealth {
        let writer_status = match &self.writer_task {
            Some(task) if task.is_finished() => HealthStatus::Unhealthy("exited".to_owned()),
            Some(_) => HealthStatus::Healthy,
            None => HealthStatus::Unhealthy("not running".to_owned()),
        };

        let components = vec![
            ComponentHealth::new("sweeper", self.sweeper.health_check().await),
            ComponentHealth::new("record-writer", writer_status),
        ];

        DaemonHealth {
            status: aggregate_status(&components),
            uptime_secs: self.start_time.elapsed().as_secs(),
            cycles_completed: self.sweeper.cycles_completed(),
            components,
        }
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &CatSweepConfig {
        &self.config
    }

    /// Get a reference to the sweeper.
    pub fn sweeper(&self) -> &CatSweeper {
        &self.sweeper
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Record daemon-level metrics (build info).
fn record_daemon_metrics() {
    use catsweep_core::metrics as m;

    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Spawn a background task that periodically updates the uptime metric.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    use catsweep_core::metrics as m;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(start_time.elapsed().as_secs() as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
