use std::io::{BufReader, Cursor, Read};

use super::parser::{classify_line, AnomalyLogParser, LineKind, UNATTRIBUTED_FOLDER};
use super::types::AnomalyKind;

fn parse_all(log: &str) -> (Vec<super::AnomalyEvent>, super::ParseStats) {
    let mut parser = AnomalyLogParser::new(Cursor::new(log.as_bytes().to_vec()));
    let events: Vec<_> = parser.by_ref().collect();
    (events, parser.stats())
}

#[test]
fn test_event_line_decodes_all_fields() {
    let line = "#nixnan: error [nan, inf] detected in operand 2 of instruction FADD R1, R2, R3 in function [fn1; at::native::add(int, float)] of kernel void kernelA<4>(int)";

    match classify_line(line) {
        LineKind::Event(event) => {
            assert_eq!(event.kernel, "void kernelA<4>(int)");
            assert_eq!(event.instruction, "FADD R1, R2, R3");
            assert_eq!(event.operand, 2);
            assert!(event.kinds.contains(&AnomalyKind::Nan));
            assert!(event.kinds.contains(&AnomalyKind::Inf));
            assert_eq!(event.functions.len(), 2);
            assert!(event.functions.contains("at::native::add(int, float)"));
        }
        other => panic!("Expected event, got {:?}", other),
    }
}

#[test]
fn test_kind_aliases_are_case_insensitive() {
    assert_eq!(AnomalyKind::from_token("NaN"), Some(AnomalyKind::Nan));
    assert_eq!(AnomalyKind::from_token("SUB"), Some(AnomalyKind::Subnormal));
    assert_eq!(AnomalyKind::from_token("-inf"), Some(AnomalyKind::Inf));
    assert_eq!(AnomalyKind::from_token("DIV0"), Some(AnomalyKind::Div0));
    assert_eq!(AnomalyKind::from_token("overflow"), None);
}

#[test]
fn test_context_markers() {
    assert_eq!(classify_line("folder=autoencoder\n"), LineKind::Context("autoencoder".into()));
    assert_eq!(
        classify_line("   Script: /home/user/pytorch_GPU/simple_gan/simple_gan.py"),
        LineKind::Context("simple_gan".into())
    );
    assert_eq!(classify_line("folder="), LineKind::Other);
    assert_eq!(classify_line("Epoch 1/10 loss=0.3"), LineKind::Other);
}

#[test]
fn test_program_output_resembling_folder_marker() {
    assert_eq!(classify_line("folder=/tmp/checkpoints"), LineKind::Other);
    assert_eq!(classify_line("folder=my run"), LineKind::Other);
    assert_eq!(classify_line("folder=C:\\runs"), LineKind::Other);
    assert_eq!(classify_line("  folder=autoencoder"), LineKind::Other);
    assert_eq!(classify_line("folder=simple_gan\r\n"), LineKind::Context("simple_gan".into()));

    let log = "folder=autoencoder\n\
               folder=/tmp/checkpoints\n\
               #nixnan: error [nan] detected in operand 0 of instruction add in function [f] of kernel k\n";
    let (events, stats) = parse_all(log);
    assert_eq!(events[0].folder, "autoencoder");
    assert_eq!(stats.context_markers, 1);
    assert_eq!(stats.other_lines, 1);
}

#[test]
fn test_detector_banner_is_not_malformed() {
    assert_eq!(classify_line("#nixnan: initializing, 12 kernels instrumented"), LineKind::Other);
}

#[test]
fn test_malformed_lines_are_skipped_and_counted() {
    let log = "folder=autoencoder\n\
               #nixnan: error [bogus] detected in operand 0 of instruction add in function [fn1] of kernel k\n\
               #nixnan: error [] detected in operand 0 of instruction add in function [fn1] of kernel k\n\
               #nixnan: error [nan] detected in operand x of instruction add in function [fn1] of kernel k\n\
               #nixnan: error [nan] something went wrong\n\
               #nixnan: error [nan] detected in operand 0 of instruction add in function [fn1] of kernel k\n";

    let (events, stats) = parse_all(log);

    assert_eq!(events.len(), 1);
    assert_eq!(stats.malformed_lines, 4);
    assert_eq!(stats.events, 1);
    assert_eq!(stats.context_markers, 1);
    assert_eq!(stats.lines_read, 6);
}

#[test]
fn test_folder_context_tracks_boundaries() {
    let log = "#nixnan: error [nan] detected in operand 0 of instruction add in function [f] of kernel k0\n\
               folder=autoencoder\n\
               #nixnan: error [nan] detected in operand 0 of instruction add in function [f] of kernel k1\n\
               folder=simple_gan\n\
               some model output\n\
               #nixnan: error [sub] detected in operand 1 of instruction mul in function [g] of kernel k2\n";

    let (events, stats) = parse_all(log);

    let folders: Vec<_> = events.iter().map(|e| e.folder.as_str()).collect();
    assert_eq!(folders, vec![UNATTRIBUTED_FOLDER, "autoencoder", "simple_gan"]);
    assert_eq!(stats.other_lines, 1);
}

#[test]
fn test_truncated_final_line_is_still_read() {
    let log = "folder=m\n#nixnan: error [nan] detected in operand 0 of instruction add in function [f] of kernel k";
    let (events, stats) = parse_all(log);
    assert_eq!(events.len(), 1);
    assert_eq!(stats.malformed_lines, 0);
}

#[test]
fn test_cut_mid_line_counts_as_malformed() {
    let log = "folder=m\n#nixnan: error [nan] detected in operand 0 of instr";
    let (events, stats) = parse_all(log);
    assert!(events.is_empty());
    assert_eq!(stats.malformed_lines, 1);
}

#[test]
fn test_invalid_utf8_detector_line() {
    let mut bytes = b"folder=m\n#nixnan: error [nan] \xff\xfe\n".to_vec();
    bytes.extend_from_slice(b"#nixnan: error [nan] detected in operand 0 of instruction add in function [f] of kernel k\n");

    let mut parser = AnomalyLogParser::new(Cursor::new(bytes));
    let events: Vec<_> = parser.by_ref().collect();

    assert_eq!(events.len(), 1);
    assert_eq!(parser.stats().malformed_lines, 1);
}

#[test]
fn test_invalid_utf8_event_still_decodes() {
    let bytes = b"folder=m\n  #nixnan: error [nan] detected in operand 0 of instruction add in function [f] of kernel k\xff\n".to_vec();

    let mut parser = AnomalyLogParser::new(Cursor::new(bytes));
    let events: Vec<_> = parser.by_ref().collect();
    let stats = parser.stats();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].folder, "m");
    assert_eq!(events[0].kernel, "k\u{FFFD}");
    assert_eq!(stats.malformed_lines, 0);
    assert_eq!(stats.other_lines, 0);
}

#[test]
fn test_indented_invalid_utf8_detector_line_is_malformed() {
    let bytes = b"folder=m\n   #nixnan: error [nan] \xff detected\n".to_vec();

    let stats = AnomalyLogParser::new(Cursor::new(bytes)).into_stats();

    assert_eq!(stats.events, 0);
    assert_eq!(stats.malformed_lines, 1);
    assert_eq!(stats.other_lines, 0);
}

struct FailingReader {
    served: bool,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.served {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "device gone"));
        }
        self.served = true;
        let data = b"folder=m\n#nixnan: error [nan] detected in operand 0 of instruction add in function [f] of kernel k\n";
        buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }
}

#[test]
fn test_read_error_ends_stream() {
    let parser = AnomalyLogParser::new(BufReader::new(FailingReader { served: false }));
    let stats = parser.into_stats();
    assert_eq!(stats.events, 1);
    assert_eq!(stats.read_errors, 1);
}

#[test]
fn test_empty_log() {
    let (events, stats) = parse_all("");
    assert!(events.is_empty());
    assert_eq!(stats.lines_read, 0);
}
