//! `tsv` 형식 -- 탭으로 분리한 값을 키 스키마와 위치 기반으로 매핑합니다.
//!
//! 값 개수가 키 개수와 다르면 그 단위는 디코드 에러입니다.
//! 값은 항상 문자열로 보존되며 추가 해석(JSON 등)은 하지 않습니다.

use catsweep_core::error::DecodeError;
use catsweep_core::types::Record;

use super::{UnitDecoder, as_utf8};

/// 탭 구분 값 디코더
#[derive(Debug, Clone)]
pub struct TsvDecoder {
    keys: Vec<String>,
}

impl TsvDecoder {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }

    /// 필드 스키마
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl UnitDecoder for TsvDecoder {
    fn format_name(&self) -> &str {
        "tsv"
    }

    fn decode(&self, unit: &[u8]) -> Result<Record, DecodeError> {
        let text = as_utf8(unit, self.format_name())?;
        let values: Vec<&str> = text.split('\t').collect();

        if values.len() != self.keys.len() {
            return Err(DecodeError::ColumnCount {
                expected: self.keys.len(),
                actual: values.len(),
            });
        }

        let mut record = Record::new();
        for (key, value) in self.keys.iter().zip(values) {
            record.insert(key.as_str(), value);
        }
        Ok(record)
    }
}
