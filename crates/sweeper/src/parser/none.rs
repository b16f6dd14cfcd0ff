//! `none` 형식 -- 입력 단위를 그대로 메시지 필드에 담습니다.
//!
//! 인코딩 검사는 하지 않습니다. UTF-8이 아닌 바이트는 U+FFFD로 바꿔 담으므로
//! 어떤 입력 단위도 디코드 실패로 버려지지 않습니다.

use catsweep_core::error::DecodeError;
use catsweep_core::types::Record;

use super::UnitDecoder;

/// 원문 디코더
#[derive(Debug, Clone)]
pub struct NoneDecoder {
    message_key: String,
}

impl NoneDecoder {
    pub fn new(message_key: impl Into<String>) -> Self {
        Self {
            message_key: message_key.into(),
        }
    }
}

impl UnitDecoder for NoneDecoder {
    fn format_name(&self) -> &str {
        "none"
    }

    fn decode(&self, unit: &[u8]) -> Result<Record, DecodeError> {
        let text = String::from_utf8_lossy(unit);
        let mut record = Record::new();
        record.insert(self.message_key.as_str(), text.as_ref());
        Ok(record)
    }
}
