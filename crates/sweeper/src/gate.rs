//! 안정성 게이트 -- 어떤 후보 파일을 지금 처리해도 되는지 판정합니다.
//!
//! 규칙:
//! - 격리 접미어가 붙은 파일은 수정 시각과 무관하게 영구 제외
//! - 처리 중(in-flight) 집합에 있는 경로는 항상 제외
//! - `now - mtime >= waiting_seconds` 이면 적격 (미래 mtime은 경과 0으로 취급)
//!
//! [`InFlightSet`]은 스윕 엔진이 소유하는 명시적 값이며, 경로당 동시 처리를
//! 최대 하나로 제한하는 유일한 장치입니다.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use crate::scanner::CandidateFile;

/// 게이트 판정 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// 지금 처리 가능
    Eligible,
    /// 아직 쓰기가 끝나지 않았을 수 있음
    TooFresh {
        /// 적격까지 남은 시간
        remaining: Duration,
    },
    /// 다른 사이클에서 처리 중
    InFlight,
    /// 격리된 파일
    Quarantined,
}

impl GateDecision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// 안정성 게이트
#[derive(Debug, Clone)]
pub struct StabilityGate {
    waiting: Duration,
    error_suffix: String,
}

impl StabilityGate {
    /// 새 게이트를 생성합니다.
    pub fn new(waiting_seconds: u64, error_suffix: impl Into<String>) -> Self {
        Self {
            waiting: Duration::from_secs(waiting_seconds),
            error_suffix: error_suffix.into(),
        }
    }

    /// 경로가 격리 접미어로 끝나는지 확인합니다.
    pub fn is_quarantined(&self, path: &Path) -> bool {
        path.as_os_str()
            .as_encoded_bytes()
            .ends_with(self.error_suffix.as_bytes())
    }

    /// 후보 파일을 판정합니다. 판정 자체는 어떤 상태도 바꾸지 않습니다.
    pub fn evaluate(
        &self,
        candidate: &CandidateFile,
        now: SystemTime,
        in_flight: &InFlightSet,
    ) -> GateDecision {
        if self.is_quarantined(&candidate.path) {
            return GateDecision::Quarantined;
        }
        if in_flight.contains(&candidate.path) {
            return GateDecision::InFlight;
        }

        let elapsed = now
            .duration_since(candidate.modified)
            .unwrap_or(Duration::ZERO);
        if elapsed >= self.waiting {
            GateDecision::Eligible
        } else {
            GateDecision::TooFresh {
                remaining: self.waiting - elapsed,
            }
        }
    }
}

/// 처리 중인 경로 집합
///
/// 복제본은 같은 집합을 공유합니다. 점유는 [`InFlightGuard`]가 drop될 때 해제됩니다.
#[derive(Debug, Clone, Default)]
pub struct InFlightSet {
    inner: Arc<Mutex<HashSet<PathBuf>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 경로가 처리 중인지 확인합니다.
    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    /// 경로를 점유합니다. 이미 점유되어 있으면 `None`.
    pub fn try_claim(&self, path: &Path) -> Option<InFlightGuard> {
        let mut set = self.lock();
        if !set.insert(path.to_path_buf()) {
            return None;
        }
        Some(InFlightGuard {
            set: Arc::clone(&self.inner),
            path: path.to_path_buf(),
        })
    }

    /// 처리 중인 경로 수
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 경로 점유 가드
#[derive(Debug)]
pub struct InFlightGuard {
    set: Arc<Mutex<HashSet<PathBuf>>>,
    path: PathBuf,
}

impl InFlightGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.path);
    }
}
