//! 통합 테스트 -- 스윕 사이클 전체 흐름 검증
//!
//! 파일 탐색부터 디코딩, 방출, 이동/삭제/격리까지 실제 파일 시스템 위에서 확인합니다.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use proptest::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

use catsweep_core::config::{CatMode, CatSweepConfig, Format};
use catsweep_core::pipeline::Pipeline;
use catsweep_sweeper::{
    CatSweeperBuilder, MemorySink, SweepConfig, SweepConfigBuilder, SweepEngine, SweeperError,
};

const TSV_KEYS: [&str; 4] = ["hdfs_path", "unixtimestamp", "label", "message"];

fn base_config(from: &Path, format: Format, cat_mode: CatMode) -> SweepConfigBuilder {
    SweepConfigBuilder::new()
        .file_path_with_glob(format!("{}/*", from.display()))
        .format(format)
        .cat_mode(cat_mode)
        .keys(TSV_KEYS)
        .waiting_seconds(0)
        .run_interval_secs(0.05)
}

fn run_once(config: SweepConfig) -> (Vec<Value>, catsweep_sweeper::SweepReport) {
    let sink = Arc::new(MemorySink::new());
    let engine = SweepEngine::new(config, sink.clone()).expect("engine");
    let report = engine.sweep_once().expect("sweep");
    let messages = sink
        .take()
        .into_iter()
        .map(|e| e.record.get("message").cloned().unwrap_or(Value::Null))
        .collect();
    (messages, report)
}

fn remaining_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .collect();
    found.sort();
    found
}

fn cases(format: Format) -> (String, Vec<Value>) {
    match format {
        Format::None => (
            "tcptest1\ntcptest2\n".to_owned(),
            vec![Value::from("tcptest1"), Value::from("tcptest2")],
        ),
        Format::Tsv => (
            "t.e.s.t.1\t12345\ttcptest1\t{\"json\":1}\nt.e.s.t.2\t54321\ttcptest2\t{\"json\":\"char\"}\n"
                .to_owned(),
            vec![
                Value::from(r#"{"json":1}"#),
                Value::from(r#"{"json":"char"}"#),
            ],
        ),
        Format::Json => (
            "{\"k\":123,\"message\":\"tcptest1\"}\n{\"k\":\"tcptest2\",\"message\":456}\n".to_owned(),
            vec![Value::from("tcptest1"), Value::from(456)],
        ),
    }
}

/// none/tsv/json x line/stream 메시지 처리 테스트
#[test]
fn test_message_processing_by_format_and_mode() {
    for cat_mode in [CatMode::Line, CatMode::Stream] {
        for format in [Format::None, Format::Tsv, Format::Json] {
            let from = TempDir::new().unwrap();
            let name = format!("test_msg_process_{format}_cat_mode_{cat_mode}");
            let (content, expected) = cases(format);
            fs::write(from.path().join(&name), content).unwrap();

            let config = base_config(from.path(), format, cat_mode).build().unwrap();
            let (messages, report) = run_once(config);

            assert_eq!(messages, expected, "{name}");
            assert_eq!(report.deleted, 1, "{name}");
            assert!(remaining_with_prefix(from.path(), &name).is_empty(), "{name}");
        }
    }
}

/// all 모드: JSON 원문이 그대로 메시지가 됨
#[test]
fn test_all_mode_raw_json() {
    let from = TempDir::new().unwrap();
    let raw = r#"{"k":"tcptest2","message":456}"#;
    fs::write(from.path().join("raw_json"), format!("{raw}\n")).unwrap();

    let config = base_config(from.path(), Format::None, CatMode::All)
        .build()
        .unwrap();
    let (messages, _) = run_once(config);

    assert_eq!(messages, vec![Value::from(raw)]);
    assert!(remaining_with_prefix(from.path(), "raw_json").is_empty());
}

/// all 모드: 여러 줄 텍스트는 마지막 종결자만 제거됨
#[test]
fn test_all_mode_multiline_text() {
    let from = TempDir::new().unwrap();
    let text = "Lorem ipsum dolor sit amet \n\n  ut labore et dolore magna aliqua.\n\n  nisi ut aliquip.";
    fs::write(from.path().join("multiline"), format!("{text}\n")).unwrap();

    let config = base_config(from.path(), Format::None, CatMode::All)
        .build()
        .unwrap();
    let (messages, _) = run_once(config);

    assert_eq!(messages, vec![Value::from(text)]);
}

/// all 모드 디코드 실패 시 파일 격리
#[test]
fn test_all_mode_decode_error_quarantines() {
    let from = TempDir::new().unwrap();
    fs::write(from.path().join("broken"), "{not json\n").unwrap();

    let config = base_config(from.path(), Format::Json, CatMode::All)
        .build()
        .unwrap();
    let (messages, report) = run_once(config);

    assert!(messages.is_empty());
    assert_eq!(report.quarantined, 1);
    assert!(from.path().join("broken.error").exists());
}

/// 처리 완료 파일 이동 테스트
#[test]
fn test_move_file() {
    let from = TempDir::new().unwrap();
    let to = TempDir::new().unwrap();
    let (content, expected) = cases(Format::Tsv);
    let source = from.path().join("test_move_file");
    fs::write(&source, &content).unwrap();

    let config = base_config(from.path(), Format::Tsv, CatMode::Line)
        .move_to(to.path())
        .build()
        .unwrap();
    let (messages, report) = run_once(config);

    assert_eq!(messages, expected);
    assert_eq!(report.moved, 1);
    assert!(remaining_with_prefix(from.path(), "test_move_file").is_empty());

    let mirrored_dir = to
        .path()
        .join(source.parent().unwrap().strip_prefix("/").unwrap());
    let moved = remaining_with_prefix(&mirrored_dir, "test_move_file");
    assert_eq!(moved.len(), 1);
    let moved_name = moved[0].file_name().unwrap().to_str().unwrap();
    let millis = moved_name.strip_prefix("test_move_file.").unwrap();
    assert!(millis.parse::<u128>().is_ok());
    assert_eq!(fs::read_to_string(&moved[0]).unwrap(), content);
}

/// 한 줄 크기 제한 초과 시 방출 없이 격리
#[test]
fn test_oneline_max_bytes() {
    let from = TempDir::new().unwrap();
    let to = TempDir::new().unwrap();
    let (content, _) = cases(Format::Tsv);
    fs::write(from.path().join("test_oneline_max_bytes"), &content).unwrap();

    for cat_mode in [CatMode::Line, CatMode::Stream] {
        let config = base_config(from.path(), Format::Tsv, cat_mode)
            .move_to(to.path())
            .oneline_max_bytes(1)
            .build()
            .unwrap();
        let (messages, report) = run_once(config);

        if cat_mode == CatMode::Line {
            assert!(messages.is_empty());
            assert_eq!(report.quarantined, 1);
        } else {
            // 이미 격리된 파일은 다시 처리하지 않음
            assert!(messages.is_empty());
            assert_eq!(report.skipped_quarantined, 1);
        }
    }

    let remaining = remaining_with_prefix(from.path(), "test_oneline_max_bytes");
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].to_string_lossy().ends_with(".error"));
    assert_eq!(fs::read_to_string(&remaining[0]).unwrap(), content);
}

/// 크기 제한을 넘는 줄 이전의 레코드는 유지되고 이후 줄은 방출되지 않음
#[test]
fn test_oneline_max_bytes_keeps_earlier_records() {
    for cat_mode in [CatMode::Line, CatMode::Stream] {
        let from = TempDir::new().unwrap();
        let content = format!("ok\n{}\nnever\n", "x".repeat(64));
        let name = format!("partial_{cat_mode}");
        fs::write(from.path().join(&name), &content).unwrap();

        let config = base_config(from.path(), Format::None, cat_mode)
            .oneline_max_bytes(8)
            .build()
            .unwrap();
        let (messages, report) = run_once(config);

        assert_eq!(messages, vec![Value::from("ok")], "{cat_mode}");
        assert!(!messages.contains(&Value::from("never")), "{cat_mode}");
        assert_eq!(report.records_emitted, 1, "{cat_mode}");
        assert_eq!(report.quarantined, 1, "{cat_mode}");
        assert_eq!(report.deleted, 0, "{cat_mode}");

        let remaining = remaining_with_prefix(from.path(), &name);
        assert_eq!(remaining, vec![from.path().join(format!("{name}.error"))]);
        assert_eq!(fs::read_to_string(&remaining[0]).unwrap(), content);
    }
}

/// none 형식은 UTF-8이 아닌 줄도 버리지 않음
#[test]
fn test_none_format_keeps_non_utf8_lines() {
    for cat_mode in [CatMode::Line, CatMode::Stream] {
        let from = TempDir::new().unwrap();
        fs::write(from.path().join("latin1"), b"caf\xe9\nok\n").unwrap();

        let config = base_config(from.path(), Format::None, cat_mode)
            .build()
            .unwrap();
        let (messages, report) = run_once(config);

        assert_eq!(
            messages,
            vec![Value::from("caf\u{fffd}"), Value::from("ok")],
            "{cat_mode}"
        );
        assert_eq!(report.units_dropped, 0, "{cat_mode}");
        assert_eq!(report.deleted, 1, "{cat_mode}");
    }
}

/// all 모드 none 형식: UTF-8이 아닌 파일도 격리하지 않고 방출
#[test]
fn test_all_mode_none_accepts_non_utf8() {
    let from = TempDir::new().unwrap();
    fs::write(from.path().join("latin1_all"), b"caf\xe9\nok\n").unwrap();

    let config = base_config(from.path(), Format::None, CatMode::All)
        .build()
        .unwrap();
    let (messages, report) = run_once(config);

    assert_eq!(messages, vec![Value::from("caf\u{fffd}\nok")]);
    assert_eq!(report.quarantined, 0);
    assert_eq!(report.deleted, 1);
    assert!(remaining_with_prefix(from.path(), "latin1_all").is_empty());
}

/// 한도 이내의 줄은 정상 방출
#[test]
fn test_oneline_max_bytes_at_limit_passes() {
    let from = TempDir::new().unwrap();
    fs::write(from.path().join("exact"), "abcd\nab\n").unwrap();

    let config = base_config(from.path(), Format::None, CatMode::Stream)
        .oneline_max_bytes(4)
        .build()
        .unwrap();
    let (messages, report) = run_once(config);

    assert_eq!(messages, vec![Value::from("abcd"), Value::from("ab")]);
    assert_eq!(report.deleted, 1);
}

/// 잘못된 줄은 버리고 나머지는 방출 (line/stream)
#[test]
fn test_bad_units_are_dropped() {
    let from = TempDir::new().unwrap();
    fs::write(
        from.path().join("mixed"),
        "a\tb\tc\tok1\nonly-one-column\nd\te\tf\tok2\n",
    )
    .unwrap();

    let config = base_config(from.path(), Format::Tsv, CatMode::Line)
        .build()
        .unwrap();
    let (messages, report) = run_once(config);

    assert_eq!(messages, vec![Value::from("ok1"), Value::from("ok2")]);
    assert_eq!(report.units_dropped, 1);
    assert_eq!(report.deleted, 1);
}

/// 매칭 파일이 없으면 아무 일도 하지 않음
#[test]
fn test_empty_glob() {
    let from = TempDir::new().unwrap();
    let config = base_config(from.path(), Format::None, CatMode::Line)
        .build()
        .unwrap();
    let (messages, report) = run_once(config);

    assert!(messages.is_empty());
    assert_eq!(report.scanned, 0);
}

/// 빈 파일은 레코드 없이 종료 처리
#[test]
fn test_empty_file_is_finalized() {
    let from = TempDir::new().unwrap();
    fs::write(from.path().join("empty"), "").unwrap();

    let config = base_config(from.path(), Format::None, CatMode::Line)
        .build()
        .unwrap();
    let (messages, report) = run_once(config);

    assert!(messages.is_empty());
    assert_eq!(report.deleted, 1);
}

/// waiting_seconds 안정화 게이트 테스트
#[test]
fn test_waiting_seconds_gate() {
    let from = TempDir::new().unwrap();
    let file = from.path().join("fresh");
    fs::write(&file, "hello\n").unwrap();

    let config = base_config(from.path(), Format::None, CatMode::Line)
        .waiting_seconds(60)
        .build()
        .unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = SweepEngine::new(config, sink.clone()).unwrap();

    let report = engine.sweep_once().unwrap();
    assert_eq!(report.skipped_fresh, 1);
    assert!(file.exists());
    assert!(sink.is_empty());

    let old = SystemTime::now() - Duration::from_secs(120);
    filetime::set_file_mtime(&file, FileTime::from_system_time(old)).unwrap();

    let report = engine.sweep_once().unwrap();
    assert_eq!(report.deleted, 1);
    assert!(!file.exists());
    assert_eq!(sink.len(), 1);
}

/// 격리 접미어 파일은 매칭되어도 처리하지 않음
#[test]
fn test_quarantined_files_are_ignored() {
    let from = TempDir::new().unwrap();
    let file = from.path().join("old.error");
    fs::write(&file, "stale\n").unwrap();

    let config = base_config(from.path(), Format::None, CatMode::Line)
        .build()
        .unwrap();
    let (messages, report) = run_once(config);

    assert!(messages.is_empty());
    assert_eq!(report.skipped_quarantined, 1);
    assert!(file.exists());
}

/// 사용자 지정 종결자
#[test]
fn test_custom_terminator() {
    let from = TempDir::new().unwrap();

    for cat_mode in [CatMode::Line, CatMode::Stream] {
        fs::write(from.path().join("custom"), "a||b||c").unwrap();
        let config = base_config(from.path(), Format::None, cat_mode)
            .line_terminated_by("||")
            .build()
            .unwrap();
        let (messages, _) = run_once(config);
        assert_eq!(
            messages,
            vec![Value::from("a"), Value::from("b"), Value::from("c")]
        );
    }
}

/// 필수 설정 누락/잘못된 설정 테스트
#[test]
fn test_required_configure() {
    let base = "[sweep]\nfile_path_with_glob = \"/tmp/from/*\"\nrun_interval = 0.05\n";

    let empty = CatSweepConfig::parse("").unwrap();
    assert!(SweepConfig::from_core(&empty.sweep).is_err());

    let no_format = CatSweepConfig::parse(base).unwrap();
    assert!(SweepConfig::from_core(&no_format.sweep).is_err());

    let no_waiting = CatSweepConfig::parse(&format!("{base}format = \"tsv\"\n")).unwrap();
    assert!(SweepConfig::from_core(&no_waiting.sweep).is_err());

    let minimum = CatSweepConfig::parse(&format!(
        "{base}format = \"tsv\"\nkeys = \"message\"\nwaiting_seconds = 5\n"
    ))
    .unwrap();
    let config = SweepConfig::from_core(&minimum.sweep).unwrap();
    assert_eq!(config.file_path_with_glob, "/tmp/from/*");
    assert_eq!(config.format, Format::Tsv);
    assert_eq!(config.waiting_seconds, 5);
    assert_eq!(config.cat_mode, CatMode::Line);
}

/// cat_mode 설정 파싱
#[test]
fn test_configure_cat_mode() {
    let base = "[sweep]\nfile_path_with_glob = \"/tmp/from/*\"\nformat = \"none\"\nwaiting_seconds = 5\n";

    for (text, expected) in [
        ("", CatMode::Line),
        ("cat_mode = \"stream\"\n", CatMode::Stream),
        ("cat_mode = \"all\"\n", CatMode::All),
    ] {
        let parsed = CatSweepConfig::parse(&format!("{base}{text}")).unwrap();
        let config = SweepConfig::from_core(&parsed.sweep).unwrap();
        assert_eq!(config.cat_mode, expected);
    }

    let bad = format!("{base}cat_mode = \"chunk\"\n");
    assert!(CatSweepConfig::parse(&bad).is_err());
}

/// 파이프라인 주기 실행으로 채널에 레코드가 도착
#[tokio::test]
async fn test_periodic_sweeper_delivers_records() {
    let from = TempDir::new().unwrap();
    fs::write(from.path().join("periodic"), "one\ntwo\n").unwrap();

    let config = base_config(from.path(), Format::None, CatMode::Stream)
        .build()
        .unwrap();
    let (mut sweeper, record_rx) = CatSweeperBuilder::new().config(config).build().unwrap();
    let mut record_rx = record_rx.unwrap();

    sweeper.start().await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), record_rx.recv())
        .await
        .unwrap()
        .unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), record_rx.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first.tag, "cat_sweep");
    assert_eq!(first.record.get("message"), Some(&Value::from("one")));
    assert_eq!(second.record.get("message"), Some(&Value::from("two")));
    assert_eq!(first.metadata.trace_id, second.metadata.trace_id);

    sweeper.stop().await.unwrap();
    assert!(!from.path().join("periodic").exists());
}

/// 수동 사이클 실행
#[tokio::test]
async fn test_run_cycle_reports() {
    let from = TempDir::new().unwrap();
    fs::write(from.path().join("manual"), "x\n").unwrap();

    let config = base_config(from.path(), Format::None, CatMode::Line)
        .build()
        .unwrap();
    let (sweeper, record_rx) = CatSweeperBuilder::new().config(config).build().unwrap();
    let mut record_rx = record_rx.unwrap();

    let report = sweeper.run_cycle().await.unwrap();
    assert_eq!(report.records_emitted, 1);
    assert_eq!(sweeper.cycles_completed(), 1);
    assert_eq!(sweeper.records_emitted(), 1);
    assert!(record_rx.try_recv().is_ok());
}

/// 싱크가 닫히면 사이클 중단, 파일 유지
#[tokio::test]
async fn test_closed_sink_keeps_file() {
    let from = TempDir::new().unwrap();
    let file = from.path().join("kept");
    fs::write(&file, "x\n").unwrap();

    let config = base_config(from.path(), Format::None, CatMode::Line)
        .build()
        .unwrap();
    let (sweeper, record_rx) = CatSweeperBuilder::new().config(config).build().unwrap();
    drop(record_rx);

    let result = sweeper.run_cycle().await;
    assert!(matches!(result, Err(SweeperError::SinkClosed)));
    assert!(file.exists());
}

fn sweep_messages(content: &[u8], cat_mode: CatMode, terminator: &str) -> (Vec<Value>, usize) {
    let from = TempDir::new().unwrap();
    fs::write(from.path().join("prop"), content).unwrap();
    let config = base_config(from.path(), Format::None, cat_mode)
        .line_terminated_by(terminator)
        .oneline_max_bytes(16)
        .build()
        .unwrap();
    let (messages, report) = run_once(config);
    (messages, report.quarantined)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// line과 stream 모드는 같은 입력에 대해 같은 결과를 냄
    #[test]
    fn line_and_stream_agree(
        content in proptest::collection::vec(
            prop_oneof![Just(b'a'), Just(b'b'), Just(b'\n'), Just(b'\r'), Just(b'|')],
            0..200,
        ),
        terminator in prop_oneof![Just("\n"), Just("||")],
    ) {
        let line = sweep_messages(&content, CatMode::Line, terminator);
        let stream = sweep_messages(&content, CatMode::Stream, terminator);
        prop_assert_eq!(line, stream);
    }
}
