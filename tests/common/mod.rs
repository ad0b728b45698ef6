#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Cursor};

use alloctrace::attribute::{Attribute, Summary};
use pretty_assertions::assert_eq;
use testing_logger::CapturedLog;

pub fn compare_results<R, E>(result: R, mut expected: E, expected_file: &str)
where
    R: BufRead,
    E: BufRead,
{
    let mut buf = String::new();
    let mut line_num = 1;
    for line in result.lines() {
        let line = line.unwrap();
        if expected.read_line(&mut buf).unwrap() == 0 {
            panic!(
                "\noutput has more lines than expected result file: {}",
                expected_file
            );
        }
        assert_eq!(line, buf.trim_end(), "\n{}:{}", expected_file, line_num);
        buf.clear();
        line_num += 1;
    }

    if expected.read_line(&mut buf).unwrap() > 0 {
        panic!(
            "\n{} has more lines than output, beginning at line: {}",
            expected_file, line_num
        )
    }
}

pub fn test_attribute<A>(
    mut attributor: A,
    test_filename: &str,
    expected_filename: &str,
) -> io::Result<Summary>
where
    A: Attribute,
{
    if let Err(e) = fs::metadata(test_filename) {
        eprintln!("Failed to open input file '{}'", test_filename);
        return Err(e);
    }

    let mut result = Cursor::new(Vec::new());
    let summary = attributor.attribute_files(&[test_filename], &mut result)?;
    let expected = BufReader::new(File::open(expected_filename)?);
    result.set_position(0);
    compare_results(result, expected, expected_filename);
    Ok(summary)
}

pub fn test_attribute_logs<A, F>(mut attributor: A, input_file: &str, asserter: F)
where
    A: Attribute,
    F: Fn(&Vec<CapturedLog>),
{
    testing_logger::setup();
    let r = BufReader::new(File::open(input_file).unwrap());
    attributor.attribute(r, io::sink()).unwrap();
    testing_logger::validate(asserter);
}

/// Counts the captured logs at `level` whose body starts with `prefix`.
pub fn count_logs(captured_logs: &[CapturedLog], level: log::Level, prefix: &str) -> usize {
    captured_logs
        .iter()
        .filter(|log| log.level == level && log.body.starts_with(prefix))
        .count()
}
