//! 이벤트 시스템 — 모듈 간 통신의 기본 단위
//!
//! [`EventMetadata`]는 모든 이벤트에 공통으로 포함되는 메타데이터이며,
//! [`Event`] trait은 모든 이벤트 타입이 구현해야 하는 인터페이스입니다.
//!
//! 스위퍼가 하류(downstream)로 내보내는 단위는 [`RecordEvent`]
//! (tag, timestamp, record) 입니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::types::Record;

// --- 모듈명 상수 ---

/// 스위퍼 모듈명
pub const MODULE_SWEEPER: &str = "sweeper";

// --- 이벤트 타입 상수 ---

/// 레코드 이벤트 타입
pub const EVENT_TYPE_RECORD: &str = "record";

/// 이벤트 메타데이터 — 모든 이벤트에 공통으로 포함되는 추적 정보
///
/// 각 이벤트의 발생 시각, 생성 모듈, 추적 ID를 담습니다.
/// 같은 파일에서 나온 레코드는 같은 trace_id를 공유합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// 이벤트 발생 시각
    pub timestamp: SystemTime,
    /// 이벤트를 생성한 모듈명
    pub source_module: String,
    /// 추적 ID
    pub trace_id: String,
}

impl EventMetadata {
    /// 기존 trace_id를 사용하여 새 메타데이터를 생성합니다.
    pub fn new(source_module: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: trace_id.into(),
        }
    }

    /// 새로운 UUID v4 trace_id를 생성하여 메타데이터를 만듭니다.
    pub fn with_new_trace(source_module: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl fmt::Display for EventMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] source={} trace={}",
            unix_timestamp_str(self.timestamp),
            self.source_module,
            self.trace_id,
        )
    }
}

/// 모든 이벤트가 구현해야 하는 기본 trait
///
/// `Send + Sync + 'static` 바운드로 `tokio::mpsc` 채널을 통한
/// 안전한 전송을 보장합니다.
pub trait Event: Send + Sync + 'static {
    /// 이벤트 고유 ID (UUID v4)
    fn event_id(&self) -> &str;

    /// 이벤트 메타데이터 (timestamp, source_module, trace_id)
    fn metadata(&self) -> &EventMetadata;

    /// 이벤트 타입명 (로깅 및 라우팅에 사용)
    fn event_type(&self) -> &str;
}

/// 하류로 전달되는 레코드 이벤트
///
/// 레코드 한 건에 태그와 타임스탬프(`metadata.timestamp`)를 붙인 것입니다.
#[derive(Debug, Clone)]
pub struct RecordEvent {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터 (timestamp = 방출 시각)
    pub metadata: EventMetadata,
    /// 레코드 태그
    pub tag: String,
    /// 디코딩된 레코드
    pub record: Record,
}

impl RecordEvent {
    /// 새로운 trace를 시작하는 레코드 이벤트를 생성합니다.
    pub fn new(tag: impl Into<String>, record: Record) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::with_new_trace(MODULE_SWEEPER),
            tag: tag.into(),
            record,
        }
    }

    /// 기존 trace에 연결된 레코드 이벤트를 생성합니다.
    pub fn with_trace(tag: impl Into<String>, record: Record, trace_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::new(MODULE_SWEEPER, trace_id),
            tag: tag.into(),
            record,
        }
    }

    /// 방출 시각
    pub fn timestamp(&self) -> SystemTime {
        self.metadata.timestamp
    }
}

impl Event for RecordEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_RECORD
    }
}

impl fmt::Display for RecordEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RecordEvent[{}] tag={} fields={}",
            &self.id[..8.min(self.id.len())],
            self.tag,
            self.record.len(),
        )
    }
}

/// SystemTime을 사람이 읽을 수 있는 형태로 변환합니다.
fn unix_timestamp_str(time: SystemTime) -> String {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => {
            let secs = duration.as_secs();
            format!("{secs}")
        }
        Err(_) => "unknown".to_owned(),
    }
}
