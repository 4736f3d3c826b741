//! Alignment job runner integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use subalign::align::{AlignConfig, AlignOutcome, Aligner, AlignmentRequest, RunOptions};
use subalign::error::AlignError;
use subalign::frame::{FrameSource, VideoFrame};
use subalign::progress::{CancellationToken, ProgressCallback, ProgressInfo};
use subalign::subtitle::{SubtitleDocument, SubtitleLine};
use subalign::timecode::ConstantTimecodes;

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;
const SEED_X: u32 = 20;
const SEED_Y: u32 = 20;
const FPS: f64 = 25.0;

fn frame_from_fn(
    width: u32,
    height: u32,
    color_at: impl Fn(u32, u32) -> (u8, u8, u8),
) -> VideoFrame {
    let pitch = width as usize * 4;
    let mut data = vec![0u8; pitch * height as usize];
    for y in 0..height {
        for x in 0..width {
            let (r, g, b) = color_at(x, y);
            let offset = y as usize * pitch + x as usize * 4;
            data[offset] = b;
            data[offset + 1] = g;
            data[offset + 2] = r;
            data[offset + 3] = 255;
        }
    }
    VideoFrame::from_bgra(width, height, pitch, false, data).unwrap()
}

/// In-memory clip with a red marker square visible on selected frames.
/// Records every fetched frame number.
struct ClipSource {
    frames: Vec<VideoFrame>,
    fetched: Vec<u64>,
}

impl ClipSource {
    fn new(total: u64, visible: impl Fn(u64) -> bool) -> Self {
        let marker = frame_from_fn(WIDTH, HEIGHT, |x, y| {
            if (15..=25).contains(&x) && (15..=25).contains(&y) {
                (255, 0, 0)
            } else {
                (255, 255, 255)
            }
        });
        let blank = frame_from_fn(WIDTH, HEIGHT, |_, _| (255, 255, 255));
        let frames = (0..total)
            .map(|i| {
                if visible(i) {
                    marker.clone()
                } else {
                    blank.clone()
                }
            })
            .collect();
        Self {
            frames,
            fetched: Vec::new(),
        }
    }
}

impl FrameSource for ClipSource {
    fn frame(&mut self, frame_number: u64, _exact_seek: bool) -> Result<VideoFrame, AlignError> {
        self.fetched.push(frame_number);
        self.frames
            .get(frame_number as usize)
            .cloned()
            .ok_or(AlignError::FrameOutOfRange {
                frame_number,
                total_frames: self.frames.len() as u64,
            })
    }

    fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }
}

fn document_with_lines(count: usize) -> SubtitleDocument {
    SubtitleDocument {
        lines: (0..count)
            .map(|i| SubtitleLine {
                start: Duration::from_millis(600 + i as u64 * 1000),
                end: Duration::from_millis(1000 + i as u64 * 1000),
                text: format!("line {i}"),
            })
            .collect(),
    }
}

struct RecordingProgress {
    infos: Mutex<Vec<ProgressInfo>>,
}

impl RecordingProgress {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            infos: Mutex::new(Vec::new()),
        })
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

// ── Pipeline results ───────────────────────────────────────────────

#[test]
fn aligns_a_line_to_the_marker_span() {
    // Marker visible on frames 10..=20; the pick references frame 15.
    let mut source = ClipSource::new(30, |i| (10..=20).contains(&i));
    let timecodes = ConstantTimecodes::new(FPS);
    let mut document = document_with_lines(1);
    let mut queue = vec![AlignmentRequest {
        x: SEED_X,
        y: SEED_Y,
        reference_frame: 15,
        line: 0,
    }];

    let config = AlignConfig::new(0, 0, 0).unwrap();
    let mut aligner = Aligner::new(&mut source, &timecodes, config);
    let report = aligner
        .run(&mut queue, &mut document, &RunOptions::new())
        .unwrap();

    assert_eq!(report.outcome, AlignOutcome::Completed);
    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 0);
    assert!(queue.is_empty());

    // Span [10, 20] at 25 fps: start 10/25 s, exclusive end 21/25 s.
    assert_eq!(document.lines[0].start, Duration::from_millis(400));
    assert_eq!(document.lines[0].end, Duration::from_millis(840));
    assert_eq!(document.lines[0].text, "line 0");
}

#[test]
fn requests_are_processed_most_recent_first() {
    let mut source = ClipSource::new(30, |_| true);
    let timecodes = ConstantTimecodes::new(FPS);
    let mut document = document_with_lines(2);
    let mut queue = vec![
        AlignmentRequest {
            x: SEED_X,
            y: SEED_Y,
            reference_frame: 5,
            line: 0,
        },
        AlignmentRequest {
            x: SEED_X,
            y: SEED_Y,
            reference_frame: 25,
            line: 1,
        },
    ];

    let config = AlignConfig::new(0, 0, 0).unwrap();
    let mut aligner = Aligner::new(&mut source, &timecodes, config);
    aligner
        .run(&mut queue, &mut document, &RunOptions::new())
        .unwrap();

    // The last queued pick (reference frame 25) is fetched first.
    assert_eq!(source.fetched.first(), Some(&25));
}

#[test]
fn rerunning_identical_requests_yields_identical_timestamps() {
    let build_queue = || {
        vec![AlignmentRequest {
            x: SEED_X,
            y: SEED_Y,
            reference_frame: 15,
            line: 0,
        }]
    };
    let timecodes = ConstantTimecodes::new(FPS);
    let config = AlignConfig::new(0, 0, 0).unwrap();

    let mut source = ClipSource::new(30, |i| (10..=20).contains(&i));
    let mut first_pass = document_with_lines(1);
    Aligner::new(&mut source, &timecodes, config)
        .run(&mut build_queue(), &mut first_pass, &RunOptions::new())
        .unwrap();

    let mut second_pass = document_with_lines(1);
    Aligner::new(&mut source, &timecodes, config)
        .run(&mut build_queue(), &mut second_pass, &RunOptions::new())
        .unwrap();

    assert_eq!(first_pass.lines[0].start, second_pass.lines[0].start);
    assert_eq!(first_pass.lines[0].end, second_pass.lines[0].end);
}

// ── Per-request skips and failures ─────────────────────────────────

#[test]
fn unmatched_seed_skips_only_that_request() {
    let mut source = ClipSource::new(30, |_| true);
    let timecodes = ConstantTimecodes::new(FPS);
    let mut document = document_with_lines(2);
    let original_start = document.lines[1].start;
    let mut queue = vec![
        AlignmentRequest {
            x: SEED_X,
            y: SEED_Y,
            reference_frame: 15,
            line: 0,
        },
        // Seed outside the frame: no match at seed.
        AlignmentRequest {
            x: WIDTH + 5,
            y: SEED_Y,
            reference_frame: 15,
            line: 1,
        },
    ];

    let config = AlignConfig::new(0, 0, 0).unwrap();
    let mut aligner = Aligner::new(&mut source, &timecodes, config);
    let report = aligner
        .run(&mut queue, &mut document, &RunOptions::new())
        .unwrap();

    assert_eq!(report.outcome, AlignOutcome::Completed);
    assert_eq!(report.processed, 2);
    assert_eq!(report.skipped, 1);
    // The skipped line keeps its timing; the other was realigned.
    assert_eq!(document.lines[1].start, original_start);
    assert_eq!(document.lines[0].start, Duration::ZERO);
}

#[test]
fn out_of_range_line_index_is_fatal() {
    let mut source = ClipSource::new(30, |_| true);
    let timecodes = ConstantTimecodes::new(FPS);
    let mut document = document_with_lines(1);
    let mut queue = vec![AlignmentRequest {
        x: SEED_X,
        y: SEED_Y,
        reference_frame: 15,
        line: 7,
    }];

    let config = AlignConfig::new(0, 0, 0).unwrap();
    let mut aligner = Aligner::new(&mut source, &timecodes, config);
    let result = aligner.run(&mut queue, &mut document, &RunOptions::new());

    assert!(matches!(
        result,
        Err(AlignError::LineOutOfRange { index: 7, count: 1 })
    ));
}

// ── Queue and cancellation ─────────────────────────────────────────

#[test]
fn empty_queue_completes_immediately() {
    let mut source = ClipSource::new(30, |_| true);
    let timecodes = ConstantTimecodes::new(FPS);
    let mut document = document_with_lines(1);
    let mut queue = Vec::new();

    let config = AlignConfig::new(0, 0, 0).unwrap();
    let mut aligner = Aligner::new(&mut source, &timecodes, config);
    let report = aligner
        .run(&mut queue, &mut document, &RunOptions::new())
        .unwrap();

    assert_eq!(report.outcome, AlignOutcome::Completed);
    assert_eq!(report.processed, 0);
    assert!(source.fetched.is_empty());
}

#[test]
fn cancellation_leaves_unprocessed_requests_queued() {
    let mut source = ClipSource::new(30, |_| true);
    let timecodes = ConstantTimecodes::new(FPS);
    let mut document = document_with_lines(2);
    let original = document.lines.clone();
    let mut queue = vec![
        AlignmentRequest {
            x: SEED_X,
            y: SEED_Y,
            reference_frame: 5,
            line: 0,
        },
        AlignmentRequest {
            x: SEED_X,
            y: SEED_Y,
            reference_frame: 25,
            line: 1,
        },
    ];

    let token = CancellationToken::new();
    token.cancel();
    let options = RunOptions::new().with_cancellation(token);

    let config = AlignConfig::new(0, 0, 0).unwrap();
    let mut aligner = Aligner::new(&mut source, &timecodes, config);
    let report = aligner.run(&mut queue, &mut document, &options).unwrap();

    assert_eq!(report.outcome, AlignOutcome::Cancelled);
    assert_eq!(report.processed, 0);
    assert_eq!(queue.len(), 2);
    assert_eq!(document.lines, original);
    assert!(source.fetched.is_empty());
}

// ── Progress reporting ─────────────────────────────────────────────

#[test]
fn progress_counts_are_monotonic_and_reach_the_total() {
    let mut source = ClipSource::new(30, |_| true);
    let timecodes = ConstantTimecodes::new(FPS);
    let mut document = document_with_lines(3);
    let mut queue: Vec<AlignmentRequest> = (0..3)
        .map(|line| AlignmentRequest {
            x: SEED_X,
            y: SEED_Y,
            reference_frame: 10,
            line,
        })
        .collect();

    let recorder = RecordingProgress::new();
    let options = RunOptions::new().with_progress(recorder.clone());

    let config = AlignConfig::new(0, 0, 0).unwrap();
    let mut aligner = Aligner::new(&mut source, &timecodes, config);
    aligner.run(&mut queue, &mut document, &options).unwrap();

    let infos = recorder.infos.lock().unwrap();
    assert!(!infos.is_empty());
    for window in infos.windows(2) {
        assert!(window[1].current >= window[0].current);
    }
    let last = infos.last().unwrap();
    assert_eq!(last.current, 3);
    assert_eq!(last.total, 3);
}

// ── Configuration validation ───────────────────────────────────────

#[test]
fn out_of_range_tolerance_is_a_configuration_error() {
    let error = AlignConfig::new(300, 0, 0).unwrap_err();
    assert!(error.is_configuration());
    assert!(matches!(
        error,
        AlignError::ToleranceOutOfRange { value: 300 }
    ));
}

#[test]
fn negative_windows_are_configuration_errors() {
    assert!(AlignConfig::new(5, -1, 0).unwrap_err().is_configuration());
    assert!(AlignConfig::new(5, 0, -3).unwrap_err().is_configuration());
}

#[test]
fn textual_configuration_is_parsed_and_validated() {
    let config = AlignConfig::parse(" 12 ", "300", "0").unwrap();
    assert_eq!(config.tolerance, 12);
    assert_eq!(config.window.max_backward, 300);
    assert_eq!(config.window.max_forward, 0);

    assert!(matches!(
        AlignConfig::parse("twelve", "0", "0"),
        Err(AlignError::ConfigurationParse {
            field: "tolerance",
            ..
        })
    ));
    assert!(AlignConfig::parse("256", "0", "0").unwrap_err().is_configuration());
}
