//! 도메인 타입 — 모듈 간 공유되는 데이터 구조

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 기본 메시지 필드명
pub const DEFAULT_MESSAGE_KEY: &str = "message";

/// 디코딩된 레코드
///
/// 필드명 -> 값 매핑입니다. 디코더는 항상 지정된 메시지 필드를 포함한
/// 레코드만 생성합니다. 값은 형식에 따라 문자열(none, tsv)이거나
/// 임의의 JSON 값(json)입니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// 빈 레코드를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 필드 맵에서 레코드를 생성합니다.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// 필드를 추가하거나 덮어씁니다.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// 필드 값을 조회합니다.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// 필드 존재 여부를 확인합니다.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// 필드 수
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 내부 필드 맵에 대한 참조를 반환합니다.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// 필드 맵으로 변환합니다.
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.fields) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "<record: {} fields>", self.fields.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut record = Record::new();
        record.insert("message", "hello");
        record.insert("count", 3);
        assert_eq!(record.get("message"), Some(&Value::from("hello")));
        assert_eq!(record.get("count"), Some(&Value::from(3)));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn serializes_as_plain_object() {
        let mut record = Record::new();
        record.insert("message", "x");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"message":"x"}"#);
    }

    #[test]
    fn display_is_json() {
        let mut record = Record::new();
        record.insert("message", 456);
        assert_eq!(record.to_string(), r#"{"message":456}"#);
    }
}
