//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `catsweep_`
//! - 모듈명: `sweeper_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(catsweep_core::metrics::SWEEPER_RECORDS_EMITTED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 디코더 형식 레이블 키 (none, tsv, json)
pub const LABEL_FORMAT: &str = "format";

/// 종료 방식 레이블 키 (moved, deleted)
pub const LABEL_DISPOSITION: &str = "disposition";

/// 격리 사유 레이블 키 (line_too_long, decode, finalize)
pub const LABEL_REASON: &str = "reason";

// ─── Sweeper 메트릭 ────────────────────────────────────────────────

/// Sweeper: 완료된 스윕 사이클 수 (counter)
pub const SWEEPER_CYCLES_TOTAL: &str = "catsweep_sweeper_cycles_total";

/// Sweeper: 스윕 사이클 소요 시간 (histogram, 초)
pub const SWEEPER_CYCLE_DURATION_SECONDS: &str = "catsweep_sweeper_cycle_duration_seconds";

/// Sweeper: 정상 종료(이동/삭제)된 파일 수 (counter, label: disposition)
pub const SWEEPER_FILES_FINALIZED_TOTAL: &str = "catsweep_sweeper_files_finalized_total";

/// Sweeper: 격리된 파일 수 (counter, label: reason)
pub const SWEEPER_FILES_QUARANTINED_TOTAL: &str = "catsweep_sweeper_files_quarantined_total";

/// Sweeper: 방출된 레코드 수 (counter)
pub const SWEEPER_RECORDS_EMITTED_TOTAL: &str = "catsweep_sweeper_records_emitted_total";

/// Sweeper: 단위 디코딩 실패 수 (counter, label: format)
pub const SWEEPER_DECODE_ERRORS_TOTAL: &str = "catsweep_sweeper_decode_errors_total";

// ─── Daemon 메트릭 ─────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "catsweep_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, 항상 1)
pub const DAEMON_BUILD_INFO: &str = "catsweep_daemon_build_info";

// ─── Histogram 버킷 ────────────────────────────────────────────────

/// 스윕 사이클 소요 시간 버킷 (초)
pub const CYCLE_DURATION_BUCKETS: [f64; 9] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0];

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};

    describe_counter!(SWEEPER_CYCLES_TOTAL, "Number of completed sweep cycles");
    describe_histogram!(
        SWEEPER_CYCLE_DURATION_SECONDS,
        Unit::Seconds,
        "Wall-clock duration of a sweep cycle"
    );
    describe_counter!(
        SWEEPER_FILES_FINALIZED_TOTAL,
        "Files fully consumed and then moved or deleted"
    );
    describe_counter!(
        SWEEPER_FILES_QUARANTINED_TOTAL,
        "Files renamed in place with the error suffix"
    );
    describe_counter!(
        SWEEPER_RECORDS_EMITTED_TOTAL,
        "Records handed to the downstream sink"
    );
    describe_counter!(
        SWEEPER_DECODE_ERRORS_TOTAL,
        "Decode units dropped because they failed to decode"
    );
    describe_gauge!(DAEMON_UPTIME_SECONDS, Unit::Seconds, "Daemon uptime");
    describe_gauge!(DAEMON_BUILD_INFO, "Build information (always 1)");
}
