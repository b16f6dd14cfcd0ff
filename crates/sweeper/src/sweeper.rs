//! 스윕 오케스트레이션 -- 스캔/게이트/디코딩/방출/종료 처리의 전체 흐름을 관리합니다.
//!
//! [`SweepEngine`]은 한 사이클을 동기적으로 수행하는 순수 엔진이고,
//! [`CatSweeper`]는 core의 [`Pipeline`] trait을 구현하여 엔진을 주기적으로 구동합니다.
//!
//! # 내부 아키텍처
//! ```text
//! PathScanner -> StabilityGate -> InFlightSet claim -> CatModeDriver -> FileEmitter -> RecordSink
//!                                                             |
//!                                                         Finalizer (move | delete | quarantine)
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use metrics::{counter, histogram};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use catsweep_core::error::{CatSweepError, PipelineError};
use catsweep_core::event::RecordEvent;
use catsweep_core::metrics as m;
use catsweep_core::pipeline::{HealthStatus, Pipeline};

use crate::config::SweepConfig;
use crate::driver::CatModeDriver;
use crate::emitter::{ChannelSink, FileEmitter, RecordSink};
use crate::error::SweeperError;
use crate::finalizer::{Disposition, Finalizer};
use crate::gate::{GateDecision, InFlightSet, StabilityGate};
use crate::scanner::PathScanner;

/// 한 사이클의 결과 요약
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// glob에 매칭된 파일 수
    pub scanned: usize,
    /// 처리 대상이 된 파일 수
    pub eligible: usize,
    /// 아직 대기 시간이 지나지 않은 파일 수
    pub skipped_fresh: usize,
    /// 다른 사이클이 처리 중인 파일 수
    pub skipped_in_flight: usize,
    /// 격리 파일 수 (접미어로 제외)
    pub skipped_quarantined: usize,
    /// 방출된 레코드 수
    pub records_emitted: usize,
    /// 디코드 실패로 버려진 단위 수
    pub units_dropped: usize,
    /// 이동된 파일 수
    pub moved: usize,
    /// 삭제된 파일 수
    pub deleted: usize,
    /// 이번 사이클에 격리된 파일 수
    pub quarantined: usize,
    /// 읽기 실패로 다음 사이클로 미룬 파일 수
    pub retried: usize,
    /// 사이클 소요 시간
    pub duration: Duration,
}

impl SweepReport {
    /// 정상 종료(이동 + 삭제)된 파일 수
    pub fn finalized(&self) -> usize {
        self.moved + self.deleted
    }
}

/// 동기 스윕 엔진
///
/// 스케줄러 없이 [`SweepEngine::sweep_once`]로 직접 구동할 수 있습니다.
/// 처리 중 경로 집합([`InFlightSet`])을 소유하므로 같은 엔진에 대한 동시 사이클도 안전합니다.
pub struct SweepEngine {
    config: SweepConfig,
    scanner: PathScanner,
    gate: StabilityGate,
    driver: CatModeDriver,
    finalizer: Finalizer,
    in_flight: InFlightSet,
    sink: Arc<dyn RecordSink>,
}

impl SweepEngine {
    /// 설정을 검증하고 엔진을 생성합니다.
    pub fn new(config: SweepConfig, sink: Arc<dyn RecordSink>) -> Result<Self, SweeperError> {
        config.validate()?;
        Ok(Self {
            scanner: PathScanner::new(config.file_path_with_glob.clone())?,
            gate: StabilityGate::new(config.waiting_seconds, config.error_file_suffix.clone()),
            driver: CatModeDriver::from_config(&config),
            finalizer: Finalizer::from_config(&config),
            in_flight: InFlightSet::new(),
            sink,
            config,
        })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// 처리 중 경로 집합
    pub fn in_flight(&self) -> &InFlightSet {
        &self.in_flight
    }

    /// 한 사이클을 수행합니다.
    ///
    /// 개별 파일의 실패는 사이클을 멈추지 않습니다. 싱크가 닫힌 경우에만
    /// [`SweeperError::SinkClosed`]로 사이클을 중단하며, 처리 중이던 파일은 그대로 남습니다.
    ///
    /// 블로킹 I/O를 수행하므로 async 컨텍스트에서는 `spawn_blocking` 안에서 호출해야 합니다.
    pub fn sweep_once(&self) -> Result<SweepReport, SweeperError> {
        let started = Instant::now();
        let candidates = self.scanner.scan()?;
        let now = SystemTime::now();

        let mut report = SweepReport {
            scanned: candidates.len(),
            ..Default::default()
        };

        for candidate in &candidates {
            match self.gate.evaluate(candidate, now, &self.in_flight) {
                GateDecision::Eligible => {}
                GateDecision::TooFresh { remaining } => {
                    debug!(
                        path = %candidate.path.display(),
                        remaining_ms = remaining.as_millis() as u64,
                        "file not yet stable"
                    );
                    report.skipped_fresh += 1;
                    continue;
                }
                GateDecision::InFlight => {
                    report.skipped_in_flight += 1;
                    continue;
                }
                GateDecision::Quarantined => {
                    report.skipped_quarantined += 1;
                    continue;
                }
            }

            let Some(_claim) = self.in_flight.try_claim(&candidate.path) else {
                report.skipped_in_flight += 1;
                continue;
            };
            report.eligible += 1;

            if let Err(e) = self.process_file(&candidate.path, &mut report) {
                report.duration = started.elapsed();
                warn!(path = %candidate.path.display(), error = %e, "sweep cycle aborted");
                return Err(e);
            }
        }

        report.duration = started.elapsed();
        counter!(m::SWEEPER_CYCLES_TOTAL).increment(1);
        histogram!(m::SWEEPER_CYCLE_DURATION_SECONDS).record(report.duration.as_secs_f64());

        if report.eligible > 0 {
            info!(
                scanned = report.scanned,
                eligible = report.eligible,
                records = report.records_emitted,
                moved = report.moved,
                deleted = report.deleted,
                quarantined = report.quarantined,
                "sweep cycle completed"
            );
        } else {
            debug!(scanned = report.scanned, "sweep cycle found nothing to do");
        }

        Ok(report)
    }

    /// 파일 하나를 소비하고 종료 처리합니다. `Err`는 사이클 중단(싱크 닫힘)만 의미합니다.
    fn process_file(&self, path: &Path, report: &mut SweepReport) -> Result<(), SweeperError> {
        debug!(path = %path.display(), mode = %self.driver.mode(), "processing file");

        let mut out = FileEmitter::new(self.sink.as_ref(), &self.config.tag);
        let result = self.driver.drive(path, &mut out);
        report.records_emitted += out.emitted();
        report.units_dropped += out.dropped();

        match result {
            Ok(()) => match self.finalizer.finalize(path) {
                Ok(disposition) => {
                    counter!(m::SWEEPER_FILES_FINALIZED_TOTAL, m::LABEL_DISPOSITION => disposition.as_label())
                        .increment(1);
                    match disposition {
                        Disposition::Moved(dest) => {
                            report.moved += 1;
                            info!(
                                path = %path.display(),
                                to = %dest.display(),
                                records = out.emitted(),
                                "file consumed and moved"
                            );
                        }
                        Disposition::Deleted => {
                            report.deleted += 1;
                            info!(path = %path.display(), records = out.emitted(), "file consumed and deleted");
                        }
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "finalize failed, quarantining");
                    self.quarantine(path, "finalize", report);
                }
            },
            Err(SweeperError::SinkClosed) => return Err(SweeperError::SinkClosed),
            Err(e @ SweeperError::Io { .. }) => {
                warn!(path = %path.display(), error = %e, "read failed, will retry next cycle");
                report.retried += 1;
            }
            Err(e) => {
                let reason = match e {
                    SweeperError::LineTooLong { .. } => "line_too_long",
                    SweeperError::Decode(_) => "decode",
                    _ => "other",
                };
                warn!(
                    path = %path.display(),
                    error = %e,
                    records = out.emitted(),
                    "aborting file, quarantining"
                );
                self.quarantine(path, reason, report);
            }
        }

        Ok(())
    }

    fn quarantine(&self, path: &Path, reason: &'static str, report: &mut SweepReport) {
        match self.finalizer.quarantine(path) {
            Ok(_) => {
                report.quarantined += 1;
                counter!(m::SWEEPER_FILES_QUARANTINED_TOTAL, m::LABEL_REASON => reason).increment(1);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "quarantine failed, leaving file in place");
            }
        }
    }
}

/// 스위퍼 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum SweeperState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 누적 통계 (주기 태스크와 공유)
#[derive(Debug, Default)]
struct SweepStats {
    cycles: AtomicU64,
    records_emitted: AtomicU64,
    files_finalized: AtomicU64,
    files_quarantined: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl SweepStats {
    fn observe(&self, result: &Result<SweepReport, SweeperError>) {
        let mut last_error = self.last_error.lock().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(report) => {
                self.cycles.fetch_add(1, Ordering::Relaxed);
                self.records_emitted
                    .fetch_add(report.records_emitted as u64, Ordering::Relaxed);
                self.files_finalized
                    .fetch_add(report.finalized() as u64, Ordering::Relaxed);
                self.files_quarantined
                    .fetch_add(report.quarantined as u64, Ordering::Relaxed);
                *last_error = None;
            }
            Err(e) => {
                *last_error = Some(e.to_string());
            }
        }
    }

    fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// 디렉토리 스위퍼 -- 엔진을 주기적으로 구동합니다.
///
/// core의 `Pipeline` trait을 구현하여 `catsweep-daemon`에서
/// 생명주기(start/stop/health_check)로 관리됩니다.
///
/// # 사용 예시
/// ```ignore
/// use catsweep_sweeper::CatSweeperBuilder;
///
/// let (mut sweeper, record_rx) = CatSweeperBuilder::new()
///     .config(config)
///     .build()?;
///
/// sweeper.start().await?;
/// ```
pub struct CatSweeper {
    state: SweeperState,
    engine: Arc<SweepEngine>,
    stats: Arc<SweepStats>,
    cancel: CancellationToken,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl CatSweeper {
    /// 현재 상태명을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            SweeperState::Initialized => "initialized",
            SweeperState::Running => "running",
            SweeperState::Stopped => "stopped",
        }
    }

    pub fn config(&self) -> &SweepConfig {
        self.engine.config()
    }

    /// 내부 엔진
    pub fn engine(&self) -> &Arc<SweepEngine> {
        &self.engine
    }

    /// 완료된 사이클 수
    pub fn cycles_completed(&self) -> u64 {
        self.stats.cycles.load(Ordering::Relaxed)
    }

    /// 방출된 레코드 수
    pub fn records_emitted(&self) -> u64 {
        self.stats.records_emitted.load(Ordering::Relaxed)
    }

    /// 정상 종료된 파일 수
    pub fn files_finalized(&self) -> u64 {
        self.stats.files_finalized.load(Ordering::Relaxed)
    }

    /// 격리된 파일 수
    pub fn files_quarantined(&self) -> u64 {
        self.stats.files_quarantined.load(Ordering::Relaxed)
    }

    /// 한 사이클을 현재 스레드에서 수행합니다 (수동 트리거, 동기).
    ///
    /// 채널 싱크는 `blocking_send`를 쓰므로 async 컨텍스트에서는 [`CatSweeper::run_cycle`]을 사용합니다.
    pub fn sweep_once(&self) -> Result<SweepReport, SweeperError> {
        let result = self.engine.sweep_once();
        self.stats.observe(&result);
        result
    }

    /// 한 사이클을 블로킹 스레드에서 수행합니다 (수동 트리거, 비동기).
    pub async fn run_cycle(&self) -> Result<SweepReport, SweeperError> {
        run_blocking_cycle(Arc::clone(&self.engine), &self.stats).await
    }
}

/// 엔진 사이클을 `spawn_blocking`으로 실행하고 통계를 갱신합니다.
async fn run_blocking_cycle(
    engine: Arc<SweepEngine>,
    stats: &SweepStats,
) -> Result<SweepReport, SweeperError> {
    let result = tokio::task::spawn_blocking(move || engine.sweep_once())
        .await
        .map_err(|e| SweeperError::Channel(format!("spawn_blocking failed: {e}")))
        .and_then(|r| r);
    stats.observe(&result);
    result
}

impl Pipeline for CatSweeper {
    async fn start(&mut self) -> Result<(), CatSweepError> {
        if self.state == SweeperState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        let period = self.engine.config().run_interval()?;
        info!(
            glob = %self.engine.config().file_path_with_glob,
            format = %self.engine.config().format,
            cat_mode = %self.engine.config().cat_mode,
            interval_ms = period.as_millis() as u64,
            "starting cat sweeper"
        );

        self.cancel = CancellationToken::new();
        let cancel = self.cancel.clone();
        let engine = Arc::clone(&self.engine);
        let stats = Arc::clone(&self.stats);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }

                if let Err(e) = run_blocking_cycle(Arc::clone(&engine), &stats).await {
                    warn!(error = %e, "sweep cycle failed");
                }
            }

            debug!("periodic sweep task exited");
        });

        self.tasks.push(task);
        self.state = SweeperState::Running;
        info!("cat sweeper started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), CatSweepError> {
        if self.state != SweeperState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping cat sweeper");
        self.cancel.cancel();

        // 진행 중인 사이클이 끝날 때까지 기다림
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "sweep task ended abnormally");
            }
        }

        self.state = SweeperState::Stopped;
        info!(cycles = self.cycles_completed(), "cat sweeper stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            SweeperState::Running => match self.stats.last_error() {
                Some(reason) => HealthStatus::Degraded(format!("last sweep cycle failed: {reason}")),
                None => HealthStatus::Healthy,
            },
            SweeperState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            SweeperState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 스위퍼 빌더
///
/// 스위퍼를 구성하고 필요한 채널을 생성합니다.
pub struct CatSweeperBuilder {
    config: SweepConfig,
    record_tx: Option<mpsc::Sender<RecordEvent>>,
    sink: Option<Arc<dyn RecordSink>>,
    record_channel_capacity: usize,
}

impl CatSweeperBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: SweepConfig::default(),
            record_tx: None,
            sink: None,
            record_channel_capacity: 1024,
        }
    }

    /// 스위퍼 설정을 지정합니다.
    pub fn config(mut self, config: SweepConfig) -> Self {
        self.config = config;
        self
    }

    /// 외부 레코드 전송 채널을 설정합니다.
    ///
    /// 설정하지 않으면 빌더가 새 채널을 생성합니다.
    pub fn record_sender(mut self, tx: mpsc::Sender<RecordEvent>) -> Self {
        self.record_tx = Some(tx);
        self
    }

    /// 채널 대신 사용할 싱크를 설정합니다. `record_sender`보다 우선합니다.
    pub fn sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 레코드 채널 용량을 설정합니다 (외부 채널 미사용 시).
    pub fn record_channel_capacity(mut self, capacity: usize) -> Self {
        self.record_channel_capacity = capacity;
        self
    }

    /// 스위퍼를 빌드합니다.
    ///
    /// # Returns
    /// - `CatSweeper`: 스위퍼 인스턴스
    /// - `Option<mpsc::Receiver<RecordEvent>>`: 레코드 수신 채널
    ///   (외부 record_sender 또는 sink를 설정한 경우 None)
    pub fn build(
        self,
    ) -> Result<(CatSweeper, Option<mpsc::Receiver<RecordEvent>>), SweeperError> {
        self.config.validate()?;

        if self.record_channel_capacity == 0 {
            return Err(SweeperError::config(
                "record_channel_capacity",
                "must be greater than 0",
            ));
        }

        let (sink, record_rx): (Arc<dyn RecordSink>, _) = match (self.sink, self.record_tx) {
            (Some(sink), _) => (sink, None),
            (None, Some(tx)) => (Arc::new(ChannelSink::new(tx)), None),
            (None, None) => {
                let (tx, rx) = mpsc::channel(self.record_channel_capacity);
                (Arc::new(ChannelSink::new(tx)), Some(rx))
            }
        };

        let engine = SweepEngine::new(self.config, sink)?;

        let sweeper = CatSweeper {
            state: SweeperState::Initialized,
            engine: Arc::new(engine),
            stats: Arc::new(SweepStats::default()),
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        };

        Ok((sweeper, record_rx))
    }
}

impl Default for CatSweeperBuilder {
    fn default() -> Self {
        Self::new()
    }
}
