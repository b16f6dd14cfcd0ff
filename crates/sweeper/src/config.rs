//! 스위퍼 설정
//!
//! [`SweepConfig`]는 core의 [`SweepSection`](catsweep_core::config::SweepSection)을
//! 검증된 타입 설정으로 변환한 것입니다. 형식/모드는 열거형으로, 키 목록은
//! 분리된 벡터로, 주기는 [`Duration`]으로 보관합니다.
//!
//! # 사용 예시
//! ```ignore
//! use catsweep_core::config::CatSweepConfig;
//! use catsweep_sweeper::config::SweepConfig;
//!
//! let core_config = CatSweepConfig::parse(toml_str)?;
//! let config = SweepConfig::from_core(&core_config.sweep)?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use catsweep_core::config::{CatMode, Format, SweepRules, SweepSection, run_interval_duration};
use catsweep_core::types::DEFAULT_MESSAGE_KEY;

use crate::error::SweeperError;

/// 스윕 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// 감시 대상 glob 패턴
    pub file_path_with_glob: String,
    /// 디코더 형식
    pub format: Format,
    /// tsv 필드 스키마 (순서 유지)
    pub keys: Vec<String>,
    /// 마지막 수정 후 최소 대기 시간 (초)
    pub waiting_seconds: u64,
    /// 파일 소비 방식
    pub cat_mode: CatMode,
    /// 처리 완료 파일 이동 루트 (없으면 삭제)
    pub move_to: Option<PathBuf>,
    /// 줄당 최대 바이트 (line/stream 전용)
    pub oneline_max_bytes: Option<usize>,
    /// 스윕 주기 (초)
    pub run_interval_secs: f64,
    /// 방출 레코드 태그
    pub tag: String,
    /// 메시지 필드명
    pub message_key: String,
    /// 격리 파일 접미어
    pub error_file_suffix: String,
    /// 줄 종결자
    pub line_terminated_by: String,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            file_path_with_glob: String::new(),
            format: Format::None,
            keys: Vec::new(),
            waiting_seconds: 0,
            cat_mode: CatMode::Line,
            move_to: None,
            oneline_max_bytes: None,
            run_interval_secs: 5.0,
            tag: "cat_sweep".to_owned(),
            message_key: DEFAULT_MESSAGE_KEY.to_owned(),
            error_file_suffix: ".error".to_owned(),
            line_terminated_by: "\n".to_owned(),
        }
    }
}

impl SweepConfig {
    /// core의 `SweepSection`에서 스위퍼 설정을 생성합니다.
    ///
    /// 필수 항목 누락, tsv 스키마 오류, glob 문법 오류는 여기서 거부됩니다.
    pub fn from_core(section: &SweepSection) -> Result<Self, SweeperError> {
        section.validate()?;

        let config = Self {
            file_path_with_glob: section.file_path_with_glob.clone().unwrap_or_default(),
            format: section.format.unwrap_or(Format::None),
            keys: section.key_list(),
            waiting_seconds: section.waiting_seconds.unwrap_or_default(),
            cat_mode: section.cat_mode,
            move_to: section.move_to.as_ref().map(PathBuf::from),
            oneline_max_bytes: section.oneline_max_bytes,
            run_interval_secs: section.run_interval,
            tag: section.tag.clone(),
            message_key: section.message_key.clone(),
            error_file_suffix: section.error_file_suffix.clone(),
            line_terminated_by: section.line_terminated_by.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    /// 스윕 주기
    ///
    /// 필드를 직접 채운 설정도 있으므로 변환 실패를 반환합니다.
    pub fn run_interval(&self) -> Result<Duration, SweeperError> {
        Ok(run_interval_duration(self.run_interval_secs)?)
    }

    /// 줄 종결자 바이트열
    pub fn terminator(&self) -> &[u8] {
        self.line_terminated_by.as_bytes()
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 값 규칙은 core의 [`SweepRules`]를 그대로 사용하고, glob 문법만 여기서 확인합니다.
    pub fn validate(&self) -> Result<(), SweeperError> {
        SweepRules {
            file_path_with_glob: &self.file_path_with_glob,
            format: self.format,
            keys: &self.keys,
            message_key: &self.message_key,
            run_interval: self.run_interval_secs,
            oneline_max_bytes: self.oneline_max_bytes,
            error_file_suffix: &self.error_file_suffix,
            line_terminated_by: &self.line_terminated_by,
        }
        .check()?;

        if let Err(e) = glob::Pattern::new(&self.file_path_with_glob) {
            return Err(SweeperError::config(
                "sweep.file_path_with_glob",
                format!("invalid glob pattern: {e}"),
            ));
        }

        Ok(())
    }
}

/// 스위퍼 설정 빌더
///
/// 필드가 많으므로 테스트와 임베딩 용도로 빌더를 제공합니다.
#[derive(Default)]
pub struct SweepConfigBuilder {
    config: SweepConfig,
}

impl SweepConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// glob 패턴을 설정합니다.
    pub fn file_path_with_glob(mut self, pattern: impl Into<String>) -> Self {
        self.config.file_path_with_glob = pattern.into();
        self
    }

    /// 디코더 형식을 설정합니다.
    pub fn format(mut self, format: Format) -> Self {
        self.config.format = format;
        self
    }

    /// tsv 필드 스키마를 설정합니다.
    pub fn keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// 최소 대기 시간(초)을 설정합니다.
    pub fn waiting_seconds(mut self, secs: u64) -> Self {
        self.config.waiting_seconds = secs;
        self
    }

    /// 파일 소비 방식을 설정합니다.
    pub fn cat_mode(mut self, mode: CatMode) -> Self {
        self.config.cat_mode = mode;
        self
    }

    /// 이동 루트를 설정합니다.
    pub fn move_to(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.move_to = Some(root.into());
        self
    }

    /// 줄당 최대 바이트를 설정합니다.
    pub fn oneline_max_bytes(mut self, max: usize) -> Self {
        self.config.oneline_max_bytes = Some(max);
        self
    }

    /// 스윕 주기(초)를 설정합니다.
    pub fn run_interval_secs(mut self, secs: f64) -> Self {
        self.config.run_interval_secs = secs;
        self
    }

    /// 레코드 태그를 설정합니다.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.config.tag = tag.into();
        self
    }

    /// 메시지 필드명을 설정합니다.
    pub fn message_key(mut self, key: impl Into<String>) -> Self {
        self.config.message_key = key.into();
        self
    }

    /// 격리 접미어를 설정합니다.
    pub fn error_file_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.error_file_suffix = suffix.into();
        self
    }

    /// 줄 종결자를 설정합니다.
    pub fn line_terminated_by(mut self, terminator: impl Into<String>) -> Self {
        self.config.line_terminated_by = terminator.into();
        self
    }

    /// 설정을 검증하고 `SweepConfig`를 생성합니다.
    pub fn build(self) -> Result<SweepConfig, SweeperError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
