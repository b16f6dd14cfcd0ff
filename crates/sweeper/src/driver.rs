//! Cat 모드 드라이버 -- 파일 바이트를 디코드 단위로 나누어 디코더와 방출기로 흘려보냅니다.
//!
//! # 모드
//! - `line`: 파일 전체를 읽은 뒤 종결자로 분리
//! - `stream`: [`BoundedLineReader`]로 한 단위씩 읽음 (메모리 상한 = 한 단위)
//! - `all`: 파일 전체가 하나의 디코드 단위
//!
//! `line`과 `stream`은 [`CatModeDriver::handle_unit`]을 공유하며 바이트 공급 방식만 다릅니다.
//!
//! # 단위 규칙
//! - 종결자는 단위에 포함되지 않음
//! - 마지막 종결자 뒤의 빈 꼬리는 단위가 아님, 중간의 빈 줄은 단위
//! - 종결자가 `"\n"`이면 단위 끝의 `"\r"`도 제거
//! - 크기 검사는 종결자를 뺀 원본 길이로 하며 `len > oneline_max_bytes`이면 위반

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use metrics::counter;
use tracing::{debug, warn};

use catsweep_core::config::CatMode;
use catsweep_core::metrics as m;

use crate::config::SweepConfig;
use crate::emitter::FileEmitter;
use crate::error::SweeperError;
use crate::parser::{RecordDecoder, UnitDecoder};

/// 파일 소비 드라이버
#[derive(Debug, Clone)]
pub struct CatModeDriver {
    mode: CatMode,
    decoder: RecordDecoder,
    terminator: Vec<u8>,
    oneline_max_bytes: Option<usize>,
}

impl CatModeDriver {
    /// 스위퍼 설정으로부터 드라이버를 생성합니다.
    pub fn from_config(config: &SweepConfig) -> Self {
        Self {
            mode: config.cat_mode,
            decoder: RecordDecoder::from_config(config),
            terminator: config.terminator().to_vec(),
            oneline_max_bytes: config.oneline_max_bytes,
        }
    }

    pub fn mode(&self) -> CatMode {
        self.mode
    }

    pub fn decoder(&self) -> &RecordDecoder {
        &self.decoder
    }

    /// 파일 하나를 끝까지 소비합니다.
    ///
    /// # Errors
    /// - [`SweeperError::LineTooLong`], [`SweeperError::Decode`]: 파일 격리 대상
    /// - [`SweeperError::Io`]: 파일을 그대로 두고 다음 사이클에 재시도
    /// - [`SweeperError::SinkClosed`]: 사이클 중단
    pub fn drive(&self, path: &Path, out: &mut FileEmitter<'_>) -> Result<(), SweeperError> {
        match self.mode {
            CatMode::Line => self.drive_line(path, out),
            CatMode::Stream => self.drive_stream(path, out),
            CatMode::All => self.drive_all(path, out),
        }
    }

    fn drive_line(&self, path: &Path, out: &mut FileEmitter<'_>) -> Result<(), SweeperError> {
        let content = std::fs::read(path).map_err(|e| SweeperError::io(path, e))?;
        for (index, unit) in UnitSplitter::new(&content, &self.terminator).enumerate() {
            self.handle_unit(index + 1, unit, out)?;
        }
        Ok(())
    }

    fn drive_stream(&self, path: &Path, out: &mut FileEmitter<'_>) -> Result<(), SweeperError> {
        let file = File::open(path).map_err(|e| SweeperError::io(path, e))?;
        let mut reader = BoundedLineReader::new(
            BufReader::new(file),
            self.terminator.clone(),
            self.oneline_max_bytes,
        );

        let mut line = 0;
        loop {
            let unit = reader.next_unit().map_err(|e| SweeperError::io(path, e))?;
            line += 1;
            match unit {
                None => return Ok(()),
                Some(StreamUnit::Unit(bytes)) => self.handle_unit(line, bytes, out)?,
                Some(StreamUnit::TooLong { size }) => {
                    return Err(SweeperError::LineTooLong {
                        line,
                        size,
                        max: self.oneline_max_bytes.unwrap_or_default(),
                    });
                }
            }
        }
    }

    fn drive_all(&self, path: &Path, out: &mut FileEmitter<'_>) -> Result<(), SweeperError> {
        let content = std::fs::read(path).map_err(|e| SweeperError::io(path, e))?;
        let body = content
            .strip_suffix(self.terminator.as_slice())
            .unwrap_or(&content);
        let body = self.strip_cr(body);

        let record = self.decoder.decode(body).inspect_err(|_| {
            counter!(m::SWEEPER_DECODE_ERRORS_TOTAL, m::LABEL_FORMAT => self.decoder.format().as_str())
                .increment(1);
        })?;
        out.emit(record)
    }

    /// 디코드 단위 하나를 검사, 디코딩, 방출합니다 (line/stream 공용).
    ///
    /// 디코드 실패는 해당 단위만 버리고 계속합니다.
    fn handle_unit(
        &self,
        line: usize,
        unit: &[u8],
        out: &mut FileEmitter<'_>,
    ) -> Result<(), SweeperError> {
        if let Some(max) = self.oneline_max_bytes
            && unit.len() > max
        {
            return Err(SweeperError::LineTooLong {
                line,
                size: unit.len(),
                max,
            });
        }

        match self.decoder.decode(self.strip_cr(unit)) {
            Ok(record) => out.emit(record),
            Err(e) => {
                warn!(line, error = %e, "dropping undecodable unit");
                counter!(m::SWEEPER_DECODE_ERRORS_TOTAL, m::LABEL_FORMAT => self.decoder.format().as_str())
                    .increment(1);
                out.record_drop();
                Ok(())
            }
        }
    }

    fn strip_cr<'b>(&self, unit: &'b [u8]) -> &'b [u8] {
        if self.terminator == b"\n" {
            unit.strip_suffix(b"\r").unwrap_or(unit)
        } else {
            unit
        }
    }
}

/// 메모리에 올라온 내용을 종결자 기준으로 나누는 반복자
pub struct UnitSplitter<'a> {
    rest: &'a [u8],
    terminator: &'a [u8],
}

impl<'a> UnitSplitter<'a> {
    pub fn new(content: &'a [u8], terminator: &'a [u8]) -> Self {
        Self {
            rest: content,
            terminator,
        }
    }
}

impl<'a> Iterator for UnitSplitter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        match find(self.rest, self.terminator) {
            Some(pos) => {
                let unit = &self.rest[..pos];
                self.rest = &self.rest[pos + self.terminator.len()..];
                Some(unit)
            }
            None => Some(std::mem::take(&mut self.rest)),
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    match needle {
        [] => None,
        [byte] => haystack.iter().position(|b| b == byte),
        _ => haystack
            .windows(needle.len())
            .position(|window| window == needle),
    }
}

/// 스트림 리더가 돌려주는 단위
#[derive(Debug, PartialEq, Eq)]
pub enum StreamUnit<'a> {
    /// 종결자를 제외한 단위 내용
    Unit(&'a [u8]),
    /// 상한 초과. `size`는 종결자를 만나기 전까지 버퍼링한 바이트 수 (하한값)
    TooLong { size: usize },
}

/// 상한이 있는 단위 리더
///
/// 상한이 설정되면 버퍼는 `oneline_max_bytes + 종결자 길이`를 넘지 않습니다.
/// 종결자 없이 `max + term_len - 1`바이트를 넘게 모으면 그 단위는 반드시 `max`를
/// 초과하므로 즉시 [`StreamUnit::TooLong`]을 반환합니다.
pub struct BoundedLineReader<R> {
    reader: R,
    terminator: Vec<u8>,
    limit: Option<usize>,
    buf: Vec<u8>,
}

impl<R: BufRead> BoundedLineReader<R> {
    pub fn new(reader: R, terminator: Vec<u8>, limit: Option<usize>) -> Self {
        Self {
            reader,
            terminator,
            limit,
            buf: Vec::new(),
        }
    }

    /// 다음 단위를 읽습니다. EOF면 `None`.
    pub fn next_unit(&mut self) -> io::Result<Option<StreamUnit<'_>>> {
        self.buf.clear();
        let term_len = self.terminator.len();

        loop {
            let (copied, found) = {
                let available = match self.reader.fill_buf() {
                    Ok(bytes) => bytes,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                };

                if available.is_empty() {
                    if self.buf.is_empty() {
                        return Ok(None);
                    }
                    if let Some(max) = self.limit
                        && self.buf.len() > max
                    {
                        return Ok(Some(StreamUnit::TooLong {
                            size: self.buf.len(),
                        }));
                    }
                    debug!(bytes = self.buf.len(), "unterminated final unit");
                    return Ok(Some(StreamUnit::Unit(&self.buf)));
                }

                let cap = match self.limit {
                    Some(max) => (max + term_len).saturating_sub(self.buf.len()),
                    None => available.len(),
                };
                let take = available.len().min(cap);
                let search_from = self.buf.len().saturating_sub(term_len.saturating_sub(1));
                self.buf.extend_from_slice(&available[..take]);
                let found = find(&self.buf[search_from..], &self.terminator)
                    .map(|pos| search_from + pos);
                (take, found)
            };

            if let Some(pos) = found {
                let unit_end = pos + term_len;
                let over = self.buf.len() - unit_end;
                self.reader.consume(copied - over);
                self.buf.truncate(pos);
                return Ok(Some(StreamUnit::Unit(&self.buf)));
            }

            self.reader.consume(copied);

            if let Some(max) = self.limit
                && self.buf.len() > max + term_len.saturating_sub(1)
            {
                return Ok(Some(StreamUnit::TooLong {
                    size: self.buf.len(),
                }));
            }
        }
    }
}
