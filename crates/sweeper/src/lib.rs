#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`scanner`]: glob 패턴으로 후보 파일 수집
//! - [`gate`]: 안정화 대기, 격리 파일 제외, 처리 중 경로 집합
//! - [`parser`]: `none` / `tsv` / `json` 단위 디코더
//! - [`driver`]: `line` / `stream` / `all` 모드별 파일 소비
//! - [`emitter`]: 레코드 방출 어댑터와 싱크
//! - [`finalizer`]: 이동, 삭제, 격리
//! - [`sweeper`]: 사이클 엔진과 주기 실행 (Pipeline trait 구현)
//! - [`config`]: 스위퍼 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! PathScanner -> StabilityGate -> CatModeDriver -> RecordDecoder -> FileEmitter -> RecordSink
//!                                       |
//!                                   Finalizer
//!                               move | delete | quarantine
//! ```

pub mod config;
pub mod driver;
pub mod emitter;
pub mod error;
pub mod finalizer;
pub mod gate;
pub mod parser;
pub mod scanner;
pub mod sweeper;

// --- 주요 타입 re-export ---

// 스위퍼
pub use sweeper::{CatSweeper, CatSweeperBuilder, SweepEngine, SweepReport};

// 설정
pub use config::{SweepConfig, SweepConfigBuilder};

// 에러
pub use error::SweeperError;

// 디코더
pub use parser::{JsonDecoder, NoneDecoder, RecordDecoder, TsvDecoder, UnitDecoder};

// 방출
pub use emitter::{ChannelSink, FileEmitter, MemorySink, RecordSink};

// 종료 처리
pub use finalizer::{Disposition, Finalizer};
