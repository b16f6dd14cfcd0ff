//! 방출 어댑터 -- 레코드에 태그와 타임스탬프를 붙여 하류 싱크로 전달합니다.
//!
//! 엔진은 [`RecordSink`] trait만 알고, 실제 하류(채널, 메모리 등)는 교체 가능합니다.
//! 같은 파일에서 나온 레코드는 하나의 trace_id를 공유합니다.

use std::sync::{Mutex, PoisonError};

use metrics::counter;
use tokio::sync::mpsc;

use catsweep_core::event::RecordEvent;
use catsweep_core::metrics as m;
use catsweep_core::types::Record;

use crate::error::SweeperError;

/// 하류 레코드 싱크
///
/// 동기 컨텍스트(`spawn_blocking` 내부)에서 호출됩니다. 싱크가 가득 차면
/// 호출이 블록되며, 닫혔으면 [`SweeperError::SinkClosed`]를 반환합니다.
pub trait RecordSink: Send + Sync {
    fn emit(&self, event: RecordEvent) -> Result<(), SweeperError>;
}

/// tokio mpsc 채널 싱크
///
/// `blocking_send`를 사용하므로 async 컨텍스트에서 직접 호출하면 안 됩니다.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<RecordEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<RecordEvent>) -> Self {
        Self { tx }
    }

    /// 수신측이 닫혔는지 확인합니다.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl RecordSink for ChannelSink {
    fn emit(&self, event: RecordEvent) -> Result<(), SweeperError> {
        self.tx
            .blocking_send(event)
            .map_err(|_| SweeperError::SinkClosed)
    }
}

/// 메모리 싱크 (테스트/임베딩용)
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RecordEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지 받은 이벤트를 모두 꺼냅니다.
    pub fn take(&self) -> Vec<RecordEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordSink for MemorySink {
    fn emit(&self, event: RecordEvent) -> Result<(), SweeperError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}

/// 파일 하나에 대한 방출 어댑터
///
/// 방출/드롭 건수를 집계합니다.
pub struct FileEmitter<'a> {
    sink: &'a dyn RecordSink,
    tag: &'a str,
    trace_id: String,
    emitted: usize,
    dropped: usize,
}

impl<'a> FileEmitter<'a> {
    pub fn new(sink: &'a dyn RecordSink, tag: &'a str) -> Self {
        Self {
            sink,
            tag,
            trace_id: uuid::Uuid::new_v4().to_string(),
            emitted: 0,
            dropped: 0,
        }
    }

    /// 레코드를 방출합니다. 타임스탬프는 방출 시각입니다.
    pub fn emit(&mut self, record: Record) -> Result<(), SweeperError> {
        let event = RecordEvent::with_trace(self.tag, record, self.trace_id.as_str());
        self.sink.emit(event)?;
        self.emitted += 1;
        counter!(m::SWEEPER_RECORDS_EMITTED_TOTAL).increment(1);
        Ok(())
    }

    /// 디코드 실패로 버려진 단위를 기록합니다.
    pub fn record_drop(&mut self) {
        self.dropped += 1;
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }
}
