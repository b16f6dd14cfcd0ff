//! 형식 디코더 -- 디코드 단위(한 줄 또는 파일 전체)를 레코드로 변환합니다.
//!
//! 형식은 설정 시점에 한 번 선택되는 닫힌 집합이므로 [`RecordDecoder`] 열거형으로
//! 표현합니다. 각 형식별 디코더는 [`UnitDecoder`] trait을 구현합니다.
//!
//! # 지원 형식
//! - `none` ([`NoneDecoder`]): 단위 전체를 메시지 필드 하나로 감쌈
//! - `tsv` ([`TsvDecoder`]): 탭으로 분리해 키 스키마와 위치 기반으로 매핑
//! - `json` ([`JsonDecoder`]): 메시지 필드를 가진 JSON 객체
//!
//! # 사용 예시
//! ```ignore
//! use catsweep_sweeper::parser::{RecordDecoder, UnitDecoder};
//!
//! let decoder = RecordDecoder::from_config(&config);
//! let record = decoder.decode(b"t.e.s.t.1\t12345\ttcptest1\thello")?;
//! ```

pub mod json;
pub mod none;
pub mod tsv;

pub use json::JsonDecoder;
pub use none::NoneDecoder;
pub use tsv::TsvDecoder;

use catsweep_core::config::Format;
use catsweep_core::error::DecodeError;
use catsweep_core::types::Record;

use crate::config::SweepConfig;

/// 디코드 단위 하나를 레코드로 변환하는 trait
pub trait UnitDecoder: Send + Sync {
    /// 형식 이름
    fn format_name(&self) -> &str;

    /// 디코드 단위를 레코드로 변환합니다.
    ///
    /// 성공한 레코드는 항상 메시지 필드를 포함합니다.
    fn decode(&self, unit: &[u8]) -> Result<Record, DecodeError>;
}

/// 설정된 형식의 디코더
#[derive(Debug, Clone)]
pub enum RecordDecoder {
    None(NoneDecoder),
    Tsv(TsvDecoder),
    Json(JsonDecoder),
}

impl RecordDecoder {
    /// 스위퍼 설정으로부터 디코더를 생성합니다.
    pub fn from_config(config: &SweepConfig) -> Self {
        match config.format {
            Format::None => Self::None(NoneDecoder::new(config.message_key.clone())),
            Format::Tsv => Self::Tsv(TsvDecoder::new(config.keys.clone())),
            Format::Json => Self::Json(JsonDecoder::new(config.message_key.clone())),
        }
    }

    /// 형식
    pub fn format(&self) -> Format {
        match self {
            Self::None(_) => Format::None,
            Self::Tsv(_) => Format::Tsv,
            Self::Json(_) => Format::Json,
        }
    }
}

impl UnitDecoder for RecordDecoder {
    fn format_name(&self) -> &str {
        match self {
            Self::None(d) => d.format_name(),
            Self::Tsv(d) => d.format_name(),
            Self::Json(d) => d.format_name(),
        }
    }

    fn decode(&self, unit: &[u8]) -> Result<Record, DecodeError> {
        match self {
            Self::None(d) => d.decode(unit),
            Self::Tsv(d) => d.decode(unit),
            Self::Json(d) => d.decode(unit),
        }
    }
}

/// 디코드 단위를 UTF-8 문자열로 해석합니다.
fn as_utf8<'a>(unit: &'a [u8], format: &str) -> Result<&'a str, DecodeError> {
    std::str::from_utf8(unit).map_err(|_| DecodeError::InvalidUtf8 {
        format: format.to_owned(),
    })
}
