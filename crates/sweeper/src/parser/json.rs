//! `json` 형식 -- 디코드 단위를 JSON 객체 하나로 파싱합니다.
//!
//! 최상위 값은 객체여야 하며 메시지 필드를 포함해야 합니다.
//! 메시지 필드의 값은 타입을 그대로 보존합니다 (숫자는 숫자로).

use serde_json::Value;

use catsweep_core::error::DecodeError;
use catsweep_core::types::Record;

use super::UnitDecoder;

/// JSON 객체 디코더
#[derive(Debug, Clone)]
pub struct JsonDecoder {
    message_key: String,
}

impl JsonDecoder {
    pub fn new(message_key: impl Into<String>) -> Self {
        Self {
            message_key: message_key.into(),
        }
    }
}

impl UnitDecoder for JsonDecoder {
    fn format_name(&self) -> &str {
        "json"
    }

    fn decode(&self, unit: &[u8]) -> Result<Record, DecodeError> {
        let value: Value = serde_json::from_slice(unit).map_err(|e| DecodeError::Json {
            column: e.column(),
            reason: e.to_string(),
        })?;

        let Value::Object(fields) = value else {
            return Err(DecodeError::NotAnObject);
        };

        if !fields.contains_key(&self.message_key) {
            return Err(DecodeError::MissingMessage {
                format: self.format_name().to_owned(),
                field: self.message_key.clone(),
            });
        }

        Ok(Record::from_fields(fields))
    }
}
