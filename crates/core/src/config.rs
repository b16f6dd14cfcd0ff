//! 설정 관리 — catsweep.toml 파싱 및 런타임 설정
//!
//! [`CatSweepConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`CATSWEEP_SWEEP_FORMAT=json` 형식)
//! 3. 설정 파일 (`catsweep.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), catsweep_core::error::CatSweepError> {
//! use catsweep_core::config::CatSweepConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = CatSweepConfig::load("catsweep.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = CatSweepConfig::parse("[sweep]\nformat = \"none\"")?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CatSweepError, ConfigError};
use crate::types::DEFAULT_MESSAGE_KEY;

/// catsweep 통합 설정
///
/// `catsweep.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatSweepConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 스위퍼 설정
    #[serde(default)]
    pub sweep: SweepSection,
    /// 메트릭 엔드포인트 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl CatSweepConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CatSweepError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CatSweepError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                CatSweepError::Io(e)
            }
        })?;
        let mut config = Self::parse(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다 (검증 없음).
    pub fn parse(toml_str: &str) -> Result<Self, CatSweepError> {
        toml::from_str(toml_str).map_err(|e| {
            CatSweepError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `CATSWEEP_{SECTION}_{FIELD}`
    /// 예: `CATSWEEP_SWEEP_WAITING_SECONDS=30`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "CATSWEEP_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "CATSWEEP_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.pid_file, "CATSWEEP_GENERAL_PID_FILE");

        // Sweep
        override_opt_string(
            &mut self.sweep.file_path_with_glob,
            "CATSWEEP_SWEEP_FILE_PATH_WITH_GLOB",
        );
        override_opt_parsed(&mut self.sweep.format, "CATSWEEP_SWEEP_FORMAT");
        override_opt_string(&mut self.sweep.keys, "CATSWEEP_SWEEP_KEYS");
        override_opt_parsed(
            &mut self.sweep.waiting_seconds,
            "CATSWEEP_SWEEP_WAITING_SECONDS",
        );
        override_parsed(&mut self.sweep.cat_mode, "CATSWEEP_SWEEP_CAT_MODE");
        override_opt_string(&mut self.sweep.move_to, "CATSWEEP_SWEEP_MOVE_TO");
        override_opt_parsed(
            &mut self.sweep.oneline_max_bytes,
            "CATSWEEP_SWEEP_ONELINE_MAX_BYTES",
        );
        override_parsed(&mut self.sweep.run_interval, "CATSWEEP_SWEEP_RUN_INTERVAL");
        override_string(&mut self.sweep.tag, "CATSWEEP_SWEEP_TAG");
        override_string(&mut self.sweep.message_key, "CATSWEEP_SWEEP_MESSAGE_KEY");
        override_string(
            &mut self.sweep.error_file_suffix,
            "CATSWEEP_SWEEP_ERROR_FILE_SUFFIX",
        );
        override_string(
            &mut self.sweep.line_terminated_by,
            "CATSWEEP_SWEEP_LINE_TERMINATED_BY",
        );

        // Metrics
        override_parsed(&mut self.metrics.enabled, "CATSWEEP_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "CATSWEEP_METRICS_LISTEN_ADDR");
        override_parsed(&mut self.metrics.port, "CATSWEEP_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 스위퍼 시작 전에 호출되어야 하며, 실패 시 어떤 파일도 건드리지 않습니다.
    pub fn validate(&self) -> Result<(), CatSweepError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "metrics.port".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }
            if self.metrics.endpoint != "/metrics" {
                return Err(ConfigError::InvalidValue {
                    field: "metrics.endpoint".to_owned(),
                    reason: "only '/metrics' is supported".to_owned(),
                }
                .into());
            }
        }

        self.sweep.validate()?;
        Ok(())
    }
}

// --- 형식 / 모드 열거형 ---

/// 디코더 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// 입력 단위를 그대로 `message` 필드에 담음
    None,
    /// 탭 구분 값을 키 스키마와 위치 기반으로 매핑
    Tsv,
    /// JSON 객체 한 개
    Json,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Tsv => "tsv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "tsv" => Ok(Self::Tsv),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                field: "sweep.format".to_owned(),
                reason: format!("unknown format '{other}', expected one of: none, tsv, json"),
            }),
        }
    }
}

/// 파일 소비 방식 (cat mode)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatMode {
    /// 파일 전체를 읽은 뒤 줄 단위로 방출
    #[default]
    Line,
    /// 한 줄씩 점진적으로 읽으며 방출 (메모리 상한 = 한 줄)
    Stream,
    /// 파일 전체를 하나의 레코드로 방출
    All,
}

impl CatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Stream => "stream",
            Self::All => "all",
        }
    }
}

impl fmt::Display for CatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line" => Ok(Self::Line),
            "stream" => Ok(Self::Stream),
            "all" => Ok(Self::All),
            other => Err(ConfigError::InvalidValue {
                field: "sweep.cat_mode".to_owned(),
                reason: format!("unknown cat_mode '{other}', expected one of: line, stream, all"),
            }),
        }
    }
}

// --- 섹션 ---

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// PID 파일 경로 (빈 문자열이면 사용 안 함)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            pid_file: String::new(),
        }
    }
}

/// 스위퍼 설정 섹션 (`[sweep]`)
///
/// 필수 항목은 `Option`으로 두고 [`SweepSection::validate`]에서 누락을 검출합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSection {
    /// 감시 대상 glob 패턴 (필수)
    pub file_path_with_glob: Option<String>,
    /// 디코더 형식 (필수)
    pub format: Option<Format>,
    /// 쉼표로 구분된 필드명 목록 (format = tsv일 때 필수)
    pub keys: Option<String>,
    /// 마지막 수정 후 처리까지 대기할 최소 시간 (초, 필수)
    pub waiting_seconds: Option<u64>,
    /// 파일 소비 방식
    pub cat_mode: CatMode,
    /// 처리 완료 파일을 옮길 루트 디렉토리 (없으면 삭제)
    pub move_to: Option<String>,
    /// 줄(디코드 단위)당 최대 바이트 수 (line/stream 전용)
    pub oneline_max_bytes: Option<usize>,
    /// 스윕 주기 (초)
    pub run_interval: f64,
    /// 방출 레코드 태그
    pub tag: String,
    /// 메시지 필드명
    pub message_key: String,
    /// 격리 파일 접미어
    pub error_file_suffix: String,
    /// 줄 종결자
    pub line_terminated_by: String,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            file_path_with_glob: None,
            format: None,
            keys: None,
            waiting_seconds: None,
            cat_mode: CatMode::default(),
            move_to: None,
            oneline_max_bytes: None,
            run_interval: 5.0,
            tag: "cat_sweep".to_owned(),
            message_key: DEFAULT_MESSAGE_KEY.to_owned(),
            error_file_suffix: ".error".to_owned(),
            line_terminated_by: "\n".to_owned(),
        }
    }
}

impl SweepSection {
    /// `keys`를 쉼표로 분리한 필드명 목록을 반환합니다.
    ///
    /// 앞뒤 공백은 제거하며 빈 항목은 버립니다.
    pub fn key_list(&self) -> Vec<String> {
        self.keys
            .as_deref()
            .map(|keys| {
                keys.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 스위퍼 섹션의 필수 항목과 조합 규칙을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.file_path_with_glob.is_none() {
            return Err(ConfigError::MissingField {
                field: "sweep.file_path_with_glob".to_owned(),
            });
        }

        let Some(format) = self.format else {
            return Err(ConfigError::MissingField {
                field: "sweep.format".to_owned(),
            });
        };

        if self.waiting_seconds.is_none() {
            return Err(ConfigError::MissingField {
                field: "sweep.waiting_seconds".to_owned(),
            });
        }

        SweepRules {
            file_path_with_glob: self.file_path_with_glob.as_deref().unwrap_or_default(),
            format,
            keys: &self.key_list(),
            message_key: &self.message_key,
            run_interval: self.run_interval,
            oneline_max_bytes: self.oneline_max_bytes,
            error_file_suffix: &self.error_file_suffix,
            line_terminated_by: &self.line_terminated_by,
        }
        .check()?;

        if let Some(move_to) = self.move_to.as_deref()
            && move_to.trim().is_empty()
        {
            return Err(ConfigError::InvalidValue {
                field: "sweep.move_to".to_owned(),
                reason: "must not be empty when set".to_owned(),
            });
        }

        Ok(())
    }
}

/// `run_interval`의 상한 (365일)
pub const MAX_RUN_INTERVAL_SECS: f64 = 365.0 * 24.0 * 60.0 * 60.0;

/// `run_interval`(초)을 [`Duration`]으로 변환합니다.
///
/// 유한하지 않은 값, 0 이하, 나노초 단위에서 0이 되는 값, 상한을 넘는 값은 거부합니다.
pub fn run_interval_duration(secs: f64) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        field: "sweep.run_interval".to_owned(),
        reason: reason.to_owned(),
    };
    if secs > MAX_RUN_INTERVAL_SECS {
        return Err(invalid("must not exceed 365 days"));
    }
    match Duration::try_from_secs_f64(secs) {
        Ok(period) if !period.is_zero() => Ok(period),
        _ => Err(invalid("must be a positive number of seconds")),
    }
}

/// 스윕 설정 값 규칙
///
/// [`SweepSection`]과 스위퍼의 타입 설정이 같은 규칙으로 검증되도록 한 곳에 모읍니다.
/// 필수 항목 존재 여부는 호출자가 먼저 확인합니다.
#[derive(Debug, Clone, Copy)]
pub struct SweepRules<'a> {
    pub file_path_with_glob: &'a str,
    pub format: Format,
    pub keys: &'a [String],
    pub message_key: &'a str,
    pub run_interval: f64,
    pub oneline_max_bytes: Option<usize>,
    pub error_file_suffix: &'a str,
    pub line_terminated_by: &'a str,
}

impl SweepRules<'_> {
    /// 값 규칙을 검사합니다.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.file_path_with_glob.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sweep.file_path_with_glob".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.message_key.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sweep.message_key".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.format == Format::Tsv {
            if self.keys.is_empty() {
                return Err(ConfigError::MissingField {
                    field: "sweep.keys".to_owned(),
                });
            }
            if !self.keys.iter().any(|k| k == self.message_key) {
                return Err(ConfigError::InvalidValue {
                    field: "sweep.keys".to_owned(),
                    reason: format!("must include the message field '{}'", self.message_key),
                });
            }
        }

        run_interval_duration(self.run_interval)?;

        if self.oneline_max_bytes == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "sweep.oneline_max_bytes".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.error_file_suffix.is_empty() || self.error_file_suffix.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "sweep.error_file_suffix".to_owned(),
                reason: "must be a non-empty file name suffix".to_owned(),
            });
        }

        if self.line_terminated_by.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sweep.line_terminated_by".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        Ok(())
    }
}

/// 메트릭 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9464,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = Some(val);
    }
}

fn override_parsed<T>(target: &mut T, env_key: &str)
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(e) => warn!(
                env_key,
                value = val.as_str(),
                error = %e,
                "failed to parse env var, ignoring"
            ),
        }
    }
}

fn override_opt_parsed<T>(target: &mut Option<T>, env_key: &str)
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = Some(parsed),
            Err(e) => warn!(
                env_key,
                value = val.as_str(),
                error = %e,
                "failed to parse env var, ignoring"
            ),
        }
    }
}
