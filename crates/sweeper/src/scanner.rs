//! 경로 스캐너 -- glob 패턴을 매 사이클 후보 파일 목록으로 확장합니다.
//!
//! 캐시 없이 호출 시점의 파일 시스템을 그대로 반영합니다. 디렉토리는
//! 후보가 되지 않으며, 조회 도중 사라진 항목(삭제 경쟁 등)은 조용히 건너뜁니다.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::error::SweeperError;

/// 후보 파일
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// 파일 경로
    pub path: PathBuf,
    /// 마지막 수정 시각
    pub modified: SystemTime,
}

/// glob 기반 경로 스캐너
#[derive(Debug, Clone)]
pub struct PathScanner {
    pattern: String,
}

impl PathScanner {
    /// 새 스캐너를 생성합니다. 패턴 문법은 여기서 검증됩니다.
    pub fn new(pattern: impl Into<String>) -> Result<Self, SweeperError> {
        let pattern = pattern.into();
        glob::Pattern::new(&pattern).map_err(|e| {
            SweeperError::config("file_path_with_glob", format!("invalid glob pattern: {e}"))
        })?;
        Ok(Self { pattern })
    }

    /// glob 패턴
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// 현재 매칭되는 일반 파일을 경로 순서대로 반환합니다.
    pub fn scan(&self) -> Result<Vec<CandidateFile>, SweeperError> {
        let entries = glob::glob(&self.pattern).map_err(|e| {
            SweeperError::config("file_path_with_glob", format!("invalid glob pattern: {e}"))
        })?;

        let mut candidates = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(p) => p,
                Err(e) => {
                    debug!(path = %e.path().display(), error = %e.error(), "glob entry unreadable, skipping");
                    continue;
                }
            };

            if let Some(candidate) = stat_candidate(&path) {
                candidates.push(candidate);
            }
        }

        Ok(candidates)
    }
}

/// 일반 파일이면 수정 시각과 함께 후보로 만듭니다.
fn stat_candidate(path: &Path) -> Option<CandidateFile> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "failed to stat candidate, skipping");
            return None;
        }
    };

    if !metadata.is_file() {
        return None;
    }

    match metadata.modified() {
        Ok(modified) => Some(CandidateFile {
            path: path.to_path_buf(),
            modified,
        }),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "mtime unavailable, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scan_finds_matching_files_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.log"), "a").unwrap();
        fs::write(dir.path().join("b.log"), "b").unwrap();
        fs::write(dir.path().join("c.txt"), "c").unwrap();

        let scanner = PathScanner::new(format!("{}/*.log", dir.path().display())).unwrap();
        let found = scanner.scan().unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|c| c.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.log", "b.log"]);
    }

    #[test]
    fn scan_skips_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("file"), "x").unwrap();

        let scanner = PathScanner::new(format!("{}/*", dir.path().display())).unwrap();
        let found = scanner.scan().unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].path.ends_with("file"));
    }

    #[test]
    fn scan_empty_match_is_ok() {
        let dir = TempDir::new().unwrap();
        let scanner = PathScanner::new(format!("{}/*", dir.path().display())).unwrap();
        assert!(scanner.scan().unwrap().is_empty());
    }

    #[test]
    fn scan_missing_directory_is_empty() {
        let scanner = PathScanner::new("/nonexistent/catsweep/dir/*").unwrap();
        assert!(scanner.scan().unwrap().is_empty());
    }

    #[test]
    fn scan_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let scanner = PathScanner::new(format!("{}/*", dir.path().display())).unwrap();
        assert!(scanner.scan().unwrap().is_empty());

        fs::write(dir.path().join("late"), "x").unwrap();
        assert_eq!(scanner.scan().unwrap().len(), 1);
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let result = PathScanner::new("/tmp/[oops");
        assert!(matches!(result, Err(SweeperError::Config { .. })));
    }
}
