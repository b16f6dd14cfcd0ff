//! 에러 타입 — 도메인별 에러 정의

/// catsweep 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum CatSweepError {
    /// 설정 관련 에러 (시작 시점에 치명적)
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 디코딩 에러
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 필수 설정 누락
    #[error("missing required option '{field}'")]
    MissingField { field: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("pipeline is not running")]
    NotRunning,

    /// 스윕 사이클 실패
    #[error("sweep cycle failed: {0}")]
    CycleFailed(String),
}

/// 디코딩 에러
///
/// 디코드 단위(한 줄 또는 파일 전체) 하나에 대한 실패를 표현합니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// UTF-8이 아닌 입력
    #[error("{format}: input is not valid utf-8")]
    InvalidUtf8 { format: String },

    /// 컬럼 수 불일치 (tsv)
    #[error("tsv: expected {expected} columns, got {actual}")]
    ColumnCount { expected: usize, actual: usize },

    /// JSON 파싱 실패
    #[error("json: parse failed at column {column}: {reason}")]
    Json { column: usize, reason: String },

    /// 최상위 값이 객체가 아님
    #[error("json: expected object at top level")]
    NotAnObject,

    /// 메시지 필드 누락
    #[error("{format}: missing message field '{field}'")]
    MissingMessage { format: String, field: String },
}
