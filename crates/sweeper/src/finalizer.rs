//! 종료 처리 -- 다 읽은 파일을 이동 또는 삭제하고, 실패한 파일은 격리합니다.
//!
//! 이동 경로는 `<move_to><원본 절대 경로>.<unix 밀리초>` 이며 중간 디렉토리를 만든 뒤
//! 단일 `rename`으로 옮깁니다. 격리는 원본 경로 뒤에 격리 접미어를 붙여 제자리에서
//! 이름을 바꿉니다.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::config::SweepConfig;
use crate::error::SweeperError;

/// 이름 충돌 시 시도할 최대 번호
const MAX_UNIQUE_ATTEMPTS: u32 = 10_000;

/// 정상 종료 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// 이동 완료 (목적지 경로)
    Moved(PathBuf),
    /// 삭제 완료
    Deleted,
}

impl Disposition {
    /// 메트릭 레이블 값
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Moved(_) => "moved",
            Self::Deleted => "deleted",
        }
    }
}

/// 종료 처리기
#[derive(Debug, Clone)]
pub struct Finalizer {
    move_to: Option<PathBuf>,
    error_suffix: String,
}

impl Finalizer {
    pub fn new(move_to: Option<PathBuf>, error_suffix: impl Into<String>) -> Self {
        Self {
            move_to,
            error_suffix: error_suffix.into(),
        }
    }

    pub fn from_config(config: &SweepConfig) -> Self {
        Self::new(config.move_to.clone(), config.error_file_suffix.clone())
    }

    /// 정상 소비된 파일을 이동하거나 삭제합니다.
    pub fn finalize(&self, path: &Path) -> Result<Disposition, SweeperError> {
        match &self.move_to {
            Some(root) => {
                let dest = self.destination(root, path)?;
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| SweeperError::Finalize {
                        path: parent.display().to_string(),
                        reason: format!("failed to create destination directory: {e}"),
                    })?;
                }
                std::fs::rename(path, &dest).map_err(|e| SweeperError::Finalize {
                    path: path.display().to_string(),
                    reason: format!("rename to {} failed: {e}", dest.display()),
                })?;
                debug!(from = %path.display(), to = %dest.display(), "file moved");
                Ok(Disposition::Moved(dest))
            }
            None => {
                match std::fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        warn!(path = %path.display(), "file vanished before delete");
                    }
                    Err(e) => {
                        return Err(SweeperError::Finalize {
                            path: path.display().to_string(),
                            reason: format!("delete failed: {e}"),
                        });
                    }
                }
                debug!(path = %path.display(), "file deleted");
                Ok(Disposition::Deleted)
            }
        }
    }

    /// 파일을 제자리에서 격리 접미어가 붙은 이름으로 바꿉니다.
    ///
    /// 같은 이름이 이미 있으면 `<path>.<n><suffix>`를 사용합니다.
    pub fn quarantine(&self, path: &Path) -> Result<PathBuf, SweeperError> {
        let mut target = with_suffix(path, &self.error_suffix);
        let mut attempt = 0;
        while target.exists() {
            attempt += 1;
            if attempt > MAX_UNIQUE_ATTEMPTS {
                return Err(SweeperError::Finalize {
                    path: path.display().to_string(),
                    reason: "no free quarantine name".to_owned(),
                });
            }
            target = with_suffix(path, &format!(".{attempt}{}", self.error_suffix));
        }

        std::fs::rename(path, &target).map_err(|e| SweeperError::Finalize {
            path: path.display().to_string(),
            reason: format!("quarantine rename failed: {e}"),
        })?;
        info!(from = %path.display(), to = %target.display(), "file quarantined");
        Ok(target)
    }

    /// 이동 목적지 경로를 계산합니다 (파일 시스템은 건드리지 않음, 충돌 회피만 확인).
    pub fn destination(&self, root: &Path, source: &Path) -> Result<PathBuf, SweeperError> {
        let mirrored = mirror_path(root, source).map_err(|e| SweeperError::io(source, e))?;
        let base = with_suffix(&mirrored, &format!(".{}", unix_millis()));
        if !base.exists() {
            return Ok(base);
        }
        for n in 1..=MAX_UNIQUE_ATTEMPTS {
            let candidate = with_suffix(&base, &format!(".{n}"));
            if !candidate.exists() {
                return Ok(candidate);
            }
        }
        Err(SweeperError::Finalize {
            path: source.display().to_string(),
            reason: "no free destination name".to_owned(),
        })
    }
}

/// `<root><source 절대 경로>`를 만듭니다.
///
/// `..`는 문자열 기준으로 정리하므로 결과는 항상 `root` 아래에 있습니다.
pub fn mirror_path(root: &Path, source: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(source)?;
    let mut relative = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::ParentDir => {
                relative.pop();
            }
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
        }
    }
    Ok(root.join(relative))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
