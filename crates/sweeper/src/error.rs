//! 스위퍼 에러 타입
//!
//! [`SweeperError`]는 스윕 엔진 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<SweeperError> for CatSweepError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use catsweep_core::error::{CatSweepError, ConfigError, DecodeError, PipelineError};

/// 스위퍼 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum SweeperError {
    /// 설정 에러 (시작 시점에 치명적)
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 대상 경로
        path: String,
        /// 원인
        #[source]
        source: std::io::Error,
    },

    /// 한 줄이 `oneline_max_bytes`를 초과
    #[error("line {line} exceeds oneline_max_bytes ({size} > {max})")]
    LineTooLong {
        /// 1부터 시작하는 줄 번호
        line: usize,
        /// 관측된 크기 (스트림 모드에서는 하한값)
        size: usize,
        /// 설정된 상한
        max: usize,
    },

    /// 파일 전체 디코딩 실패 (all 모드)
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// 하류 싱크가 닫힘
    #[error("record sink closed")]
    SinkClosed,

    /// 이동/삭제/격리 실패
    #[error("finalize failed: {path}: {reason}")]
    Finalize {
        /// 대상 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 채널/태스크 에러
    #[error("channel error: {0}")]
    Channel(String),
}

impl SweeperError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn config(field: &str, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for SweeperError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingField { field } => Self::Config {
                field,
                reason: "missing required option".to_owned(),
            },
            ConfigError::InvalidValue { field, reason } => Self::Config { field, reason },
            other => Self::Config {
                field: "sweep".to_owned(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<SweeperError> for CatSweepError {
    fn from(err: SweeperError) -> Self {
        match err {
            SweeperError::Config { field, reason } => {
                CatSweepError::Config(ConfigError::InvalidValue { field, reason })
            }
            SweeperError::Decode(e) => CatSweepError::Decode(e),
            SweeperError::SinkClosed => {
                CatSweepError::Pipeline(PipelineError::ChannelSend("record sink closed".to_owned()))
            }
            other => CatSweepError::Pipeline(PipelineError::CycleFailed(other.to_string())),
        }
    }
}
