mod common;

use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Write};
use std::process::{Command, Stdio};

use alloctrace::attribute::ustack::{Attributor, Options};
use alloctrace::attribute::{Attribute, Summary, Unattributed};
use assert_cmd::cargo::CommandCargoExt;
use log::Level;
use pretty_assertions::assert_eq;
use testing_logger::CapturedLog;

fn test_attribute_ustack(
    test_file: &str,
    expected_file: &str,
    options: Options,
) -> io::Result<Summary> {
    common::test_attribute(Attributor::from(options), test_file, expected_file)
}

fn test_attribute_ustack_logs<F>(input_file: &str, asserter: F, options: Options)
where
    F: Fn(&Vec<CapturedLog>),
{
    common::test_attribute_logs(Attributor::from(options), input_file, asserter);
}

#[test]
fn attribute_ustack_basic() {
    let test_file = "./tests/data/ustack/basic.txt";
    let result_file = "./tests/data/ustack/results/basic.csv";
    let summary = test_attribute_ustack(test_file, result_file, Options::default()).unwrap();
    assert_eq!(
        summary,
        Summary {
            emitted: 5,
            foreign: 2,
            unattributed: 2,
            malformed: 1,
            unparsed_frames: 0,
            truncated: true,
        }
    );
}

#[test]
fn attribute_ustack_discard_unattributed() {
    let test_file = "./tests/data/ustack/basic.txt";
    let result_file = "./tests/data/ustack/results/basic-discard.csv";
    let summary = test_attribute_ustack(
        test_file,
        result_file,
        Options {
            unattributed: Unattributed::Discard,
            ..Default::default()
        },
    )
    .unwrap();

    // well-formed, attributable blocks only
    assert_eq!(summary.emitted, 3);
    assert_eq!(summary.unattributed, 2);
    assert_eq!(summary.foreign, 2);
}

#[test]
fn attribute_ustack_test_type() {
    let test_file = "./tests/data/ustack/basic.txt";
    let result_file = "./tests/data/ustack/results/basic-test-type.csv";
    test_attribute_ustack(
        test_file,
        result_file,
        Options {
            test_type: Some("basic".to_owned()),
            ..Default::default()
        },
    )
    .unwrap();
}

#[test]
fn attribute_ustack_four_header_lines() {
    let test_file = "./tests/data/ustack/four-header-lines.txt";
    let result_file = "./tests/data/ustack/results/four-header-lines.csv";
    let summary = test_attribute_ustack(
        test_file,
        result_file,
        Options {
            header_lines: 4,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(!summary.truncated);
}

#[test]
fn attribute_ustack_other_target() {
    let test_file = "./tests/data/ustack/python.txt";
    let result_file = "./tests/data/ustack/results/python.csv";
    test_attribute_ustack(
        test_file,
        result_file,
        Options {
            target: "python3.11".to_owned(),
            ..Default::default()
        },
    )
    .unwrap();
}

#[test]
fn attribute_ustack_quotes_fields() {
    let test_file = "./tests/data/ustack/quoting.txt";
    let result_file = "./tests/data/ustack/results/quoting.csv";
    test_attribute_ustack(test_file, result_file, Options::default()).unwrap();
}

#[test]
fn attribute_ustack_foreign_blocks_do_not_leak() {
    // The foreign block sits between two good ones; neither neighbour is affected.
    let input = "\
malloc
1
8
libc`malloc+0x1
ruby`rb_a+0x1

malloc
2
16
libc`malloc+0x1
libffi`ffi_call+0x1
ruby`rb_b+0x1

malloc
3
24
libc`malloc+0x1
ruby`rb_c+0x1

";
    let mut out = Vec::new();
    let summary = Attributor::default()
        .attribute(input.as_bytes(), &mut out)
        .unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "allocator,timestamp,bytes_requested,caller\nmalloc,1,8,rb_a\nmalloc,3,24,rb_c\n"
    );
    assert_eq!(summary.foreign, 1);
}

#[test]
fn attribute_ustack_is_deterministic() {
    let input = fs::read("./tests/data/ustack/basic.txt").unwrap();
    let run = || {
        let mut out = Vec::new();
        Attributor::default()
            .attribute(&input[..], &mut out)
            .unwrap();
        out
    };
    assert_eq!(run(), run());
}

#[test]
fn attribute_ustack_files_are_one_stream() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.dtrace");
    let second = dir.path().join("second.dtrace");
    File::create(&first)
        .unwrap()
        .write_all(b"malloc\n1\n8\nlibc`malloc+0x1\n")
        .unwrap();
    File::create(&second)
        .unwrap()
        .write_all(b"ruby`rb_a+0x1\n\nmalloc\n2\n16\nlibc`malloc\nruby`rb_b\n\n")
        .unwrap();

    let mut out = Vec::new();
    let summary = Attributor::default()
        .attribute_files(&[first, second], &mut out)
        .unwrap();
    assert_eq!(summary.emitted, 2);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "allocator,timestamp,bytes_requested,caller\nmalloc,1,8,rb_a\nmalloc,2,16,rb_b\n"
    );
}

#[test]
fn attribute_ustack_missing_file_is_an_error() {
    let mut out = Vec::new();
    let err = Attributor::default()
        .attribute_files(&["./tests/data/ustack/does-not-exist.txt"], &mut out)
        .unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
}

#[test]
fn attribute_ustack_should_warn_about_truncation_and_malformed_headers() {
    test_attribute_ustack_logs(
        "./tests/data/ustack/basic.txt",
        |captured_logs| {
            let ntruncated = common::count_logs(
                captured_logs,
                Level::Warn,
                "File ended in the middle of an event",
            );
            assert_eq!(
                ntruncated, 1,
                "truncation warning logged {} times, but should be logged exactly once",
                ntruncated
            );
            let nmalformed =
                common::count_logs(captured_logs, Level::Warn, "Dropping event with 2 of 3");
            assert_eq!(nmalformed, 1);
            let nunattributed = common::count_logs(
                captured_logs,
                Level::Warn,
                "2 event(s) had no attributable caller frame",
            );
            assert_eq!(nunattributed, 1);
            // foreign stacks are quiet unless asked for
            let nforeign =
                common::count_logs(captured_logs, Level::Warn, "Skipping foreign stack");
            assert_eq!(nforeign, 0);
        },
        Options::default(),
    );
}

#[test]
fn attribute_ustack_should_report_foreign_stacks() {
    test_attribute_ustack_logs(
        "./tests/data/ustack/basic.txt",
        |captured_logs| {
            let nforeign =
                common::count_logs(captured_logs, Level::Warn, "Skipping foreign stack");
            assert_eq!(nforeign, 2);
        },
        Options {
            report_foreign: true,
            ..Default::default()
        },
    );
}

#[test]
fn attribute_ustack_cli() {
    let input_file = "./tests/data/ustack/basic.txt";
    let expected_file = "./tests/data/ustack/results/basic-test-type.csv";

    // Test with file passed in, writing to a file
    let dir = tempfile::tempdir().unwrap();
    let outfile = dir.path().join("basic.csv");
    let status = Command::cargo_bin("alloctrace-ustack")
        .unwrap()
        .arg("--test-type")
        .arg("basic")
        .arg(&outfile)
        .arg(input_file)
        .status()
        .expect("failed to execute process");
    assert!(status.success());
    let result = BufReader::new(File::open(&outfile).unwrap());
    let expected = BufReader::new(File::open(expected_file).unwrap());
    common::compare_results(result, expected, expected_file);

    // Test with STDIN, writing to STDOUT
    let mut child = Command::cargo_bin("alloctrace-ustack")
        .unwrap()
        .arg("-t")
        .arg("basic")
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to spawn child process");
    let mut input = BufReader::new(File::open(input_file).unwrap());
    let stdin = child.stdin.as_mut().expect("Failed to open stdin");
    io::copy(&mut input, stdin).unwrap();
    let output = child.wait_with_output().expect("Failed to read stdout");
    let expected = BufReader::new(File::open(expected_file).unwrap());
    common::compare_results(Cursor::new(output.stdout), expected, expected_file);
}

#[test]
fn attribute_ustack_cli_rejects_bad_header_lines() {
    let output = Command::cargo_bin("alloctrace-ustack")
        .unwrap()
        .arg("--header-lines")
        .arg("5")
        .arg("-")
        .stdin(Stdio::null())
        .output()
        .expect("failed to execute process");
    assert!(!output.status.success());
}

#[test]
fn attribute_ustack_cli_help_shows_test_type_flag() {
    let output = Command::cargo_bin("alloctrace-ustack")
        .unwrap()
        .arg("--help")
        .output()
        .expect("failed to execute process");
    assert!(output.status.success());
    let help = String::from_utf8(output.stdout).unwrap();
    assert!(
        help.contains("alloctrace-ustack -t basic allocations.csv basic.dtrace"),
        "{}",
        help
    );
}
