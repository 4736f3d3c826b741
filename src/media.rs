//! FFmpeg-backed frame source.
//!
//! [`MediaFrameSource`] opens a media file, picks the best video stream,
//! and implements [`FrameSource`] by seeking to the nearest keyframe and
//! decoding forward to the exact requested frame, converted to the BGRA
//! layout the core consumes. It can also scan the stream's packet
//! timestamps into a [`VfrTimecodes`] table, which handles constant and
//! variable frame rate clips alike.
//!
//! Only available with the `ffmpeg` feature; the FFmpeg development
//! libraries must be installed on the system.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    format::{Pixel, context::Input},
    frame::Video as DecodedFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::error::AlignError;
use crate::frame::{FrameSource, VideoFrame};
use crate::timecode::VfrTimecodes;

/// A [`FrameSource`] decoding frames from a media file via FFmpeg.
///
/// Stream selection happens once, at open time; every [`FrameSource::frame`]
/// call builds a fresh decoder, seeks, and decodes forward, so lookups are
/// stateless with respect to each other.
///
/// # Example
///
/// ```no_run
/// use subalign::frame::FrameSource;
/// use subalign::media::MediaFrameSource;
///
/// let mut source = MediaFrameSource::open("input.mkv")?;
/// let frame = source.frame(0, true)?;
/// println!("{}x{}", frame.width(), frame.height());
/// # Ok::<(), subalign::AlignError>(())
/// ```
pub struct MediaFrameSource {
    input_context: Input,
    video_stream_index: usize,
    time_base: Rational,
    width: u32,
    height: u32,
    frames_per_second: f64,
    frame_count: u64,
    #[allow(dead_code)]
    file_path: PathBuf,
}

impl MediaFrameSource {
    /// Open a media file and select its best video stream.
    ///
    /// # Errors
    ///
    /// - [`AlignError::NoVideoStream`] if the file has no video.
    /// - [`AlignError::FrameSource`] if FFmpeg cannot open the file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AlignError> {
        let path = path.as_ref();
        log::debug!("Opening media file: {}", path.display());

        // Initialise ffmpeg (safe to call multiple times).
        ffmpeg_next::init()?;

        let input_context = ffmpeg_next::format::input(&path)?;
        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(AlignError::NoVideoStream)?;
        let video_stream_index = stream.index();
        let time_base = stream.time_base();

        // Average frame rate, falling back to the stream's rate field.
        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            let rate = stream.rate();
            if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            }
        };

        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let decoder = decoder_context.decoder().video()?;
        let width = decoder.width();
        let height = decoder.height();

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };
        let frame_count = if frames_per_second > 0.0 {
            (duration.as_secs_f64() * frames_per_second) as u64
        } else {
            0
        };

        Ok(Self {
            input_context,
            video_stream_index,
            time_base,
            width,
            height,
            frames_per_second,
            frame_count,
            file_path: path.to_path_buf(),
        })
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Average frames per second of the selected stream.
    pub fn frames_per_second(&self) -> f64 {
        self.frames_per_second
    }

    /// Scan the stream's packet timestamps into a timecode table.
    ///
    /// Reads every video packet's PTS, which handles variable-frame-rate
    /// clips exactly instead of assuming a constant rate. The scan also
    /// fixes up the frame count with the true number of frames observed.
    ///
    /// # Errors
    ///
    /// - [`AlignError::NoVideoStream`] when the stream contains no frames.
    /// - [`AlignError::FrameSource`] on demuxer errors.
    pub fn scan_timecodes(&mut self) -> Result<VfrTimecodes, AlignError> {
        log::debug!("Scanning timecodes (stream={})", self.video_stream_index);

        let tb_num = self.time_base.numerator() as f64;
        let tb_den = self.time_base.denominator().max(1) as f64;

        let mut pts_list: Vec<Duration> = Vec::new();
        let mut packet = Packet::empty();
        loop {
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    if packet.stream() as usize != self.video_stream_index {
                        continue;
                    }
                    if let Some(pts) = packet.pts() {
                        let secs = pts as f64 * tb_num / tb_den;
                        pts_list.push(Duration::from_secs_f64(secs.max(0.0)));
                    }
                }
                Err(FfmpegError::Eof) => break,
                Err(error) => return Err(AlignError::from(error)),
            }
        }

        let timecodes = VfrTimecodes::from_pts(pts_list)?;
        self.frame_count = timecodes.frame_count();
        Ok(timecodes)
    }

    /// Seek to the nearest keyframe before `frame_number` and decode
    /// forward until the requested frame (or, for inexact lookups, the
    /// first decodable frame) is reached.
    fn decode_frame(
        &mut self,
        frame_number: u64,
        exact_seek: bool,
    ) -> Result<VideoFrame, AlignError> {
        let width = self.width;
        let height = self.height;
        let time_base = self.time_base;
        let frames_per_second = self.frames_per_second;
        let video_stream_index = self.video_stream_index;

        let stream = self
            .input_context
            .stream(video_stream_index)
            .ok_or(AlignError::NoVideoStream)?;
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let mut decoder = decoder_context.decoder().video()?;

        // Source format → packed BGRA at the native resolution.
        let mut scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::BGRA,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        let target_timestamp =
            frame_number_to_stream_timestamp(frame_number, frames_per_second, time_base);
        self.input_context
            .seek(target_timestamp, ..target_timestamp)?;

        let mut decoded = DecodedFrame::empty();
        let mut bgra = DecodedFrame::empty();

        for (stream, packet) in self.input_context.packets() {
            if stream.index() != video_stream_index {
                continue;
            }
            decoder.send_packet(&packet)?;

            while decoder.receive_frame(&mut decoded).is_ok() {
                let pts = decoded.pts().unwrap_or(0);
                let current = pts_to_frame_number(pts, time_base, frames_per_second);
                // Past-target frames stand in for targets the stream skips.
                if !exact_seek || current >= frame_number {
                    scaler.run(&decoded, &mut bgra)?;
                    return pack_frame(width, height, &bgra);
                }
            }
        }

        // Flush the decoder for frames buffered at end of stream.
        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded).is_ok() {
            let pts = decoded.pts().unwrap_or(0);
            if !exact_seek || pts_to_frame_number(pts, time_base, frames_per_second) >= frame_number
            {
                scaler.run(&decoded, &mut bgra)?;
                return pack_frame(width, height, &bgra);
            }
        }

        Err(AlignError::FrameSource(format!(
            "could not locate frame {frame_number} in the video stream"
        )))
    }
}

/// Copy a scaled frame's first plane into an owned [`VideoFrame`].
fn pack_frame(width: u32, height: u32, frame: &DecodedFrame) -> Result<VideoFrame, AlignError> {
    let pitch = frame.stride(0);
    let data = frame.data(0).to_vec();
    // FFmpeg's scaler output is top-down.
    VideoFrame::from_bgra(width, height, pitch, false, data)
}

/// Convert a frame number to a timestamp in the stream's time base.
fn frame_number_to_stream_timestamp(
    frame_number: u64,
    frames_per_second: f64,
    time_base: Rational,
) -> i64 {
    if frames_per_second <= 0.0 {
        return 0;
    }
    let seconds = frame_number as f64 / frames_per_second;
    let numerator = time_base.numerator() as f64;
    let denominator = time_base.denominator() as f64;
    (seconds * denominator / numerator) as i64
}

/// Rescale a PTS value to a frame number.
fn pts_to_frame_number(pts: i64, time_base: Rational, frames_per_second: f64) -> u64 {
    let numerator = time_base.numerator() as f64;
    let denominator = time_base.denominator().max(1) as f64;
    let seconds = pts as f64 * numerator / denominator;
    (seconds * frames_per_second).round().max(0.0) as u64
}

impl FrameSource for MediaFrameSource {
    fn frame(&mut self, frame_number: u64, exact_seek: bool) -> Result<VideoFrame, AlignError> {
        if self.frame_count > 0 && frame_number >= self.frame_count {
            return Err(AlignError::FrameOutOfRange {
                frame_number,
                total_frames: self.frame_count,
            });
        }
        self.decode_frame(frame_number, exact_seek)
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
