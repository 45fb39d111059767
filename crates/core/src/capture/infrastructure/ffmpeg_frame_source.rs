use std::ops::ControlFlow;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::capture::domain::frame_source::{FrameSource, SourceInfo};
use crate::shared::frame::Frame;

/// Decodes a video file or stream URL via ffmpeg-next and pushes RGB frames.
///
/// With `paced` set, frames are released no faster than their presentation
/// timestamps, which makes a recording behave like a live camera. Each
/// frame carries its presentation time as its timestamp.
pub struct FfmpegFrameSource {
    input_ctx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    video_stream_index: usize,
    time_base: ffmpeg_next::Rational,
    info: SourceInfo,
    paced: bool,
}

// Safety: the source is moved onto the capture thread and only used there.
// The raw pointers inside ffmpeg types are never shared across threads.
unsafe impl Send for FfmpegFrameSource {}

impl FfmpegFrameSource {
    pub fn open(path: &Path, paced: bool) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let input_ctx = ffmpeg_next::format::input(path)?;
        let stream = input_ctx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let time_base = stream.time_base();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        let info = SourceInfo {
            width,
            height,
            fps,
            description: path.display().to_string(),
        };
        log::info!("Opened {} ({width}x{height} @ {fps:.1} fps)", info.description);

        Ok(Self {
            input_ctx,
            decoder,
            scaler,
            video_stream_index,
            time_base,
            info,
            paced,
        })
    }

    fn pts_to_duration(&self, pts: i64) -> Duration {
        let num = self.time_base.numerator() as f64;
        let den = self.time_base.denominator() as f64;
        if den == 0.0 || pts < 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(pts as f64 * num / den)
    }

    fn fallback_timestamp(&self, index: usize) -> Duration {
        if self.info.fps > 0.0 {
            Duration::from_secs_f64(index as f64 / self.info.fps)
        } else {
            Duration::ZERO
        }
    }

    /// Drains every frame the decoder has ready. Returns `Break` when the
    /// callback asked to stop.
    fn drain_decoder(
        &mut self,
        next_index: &mut usize,
        started: Instant,
        on_frame: &mut dyn FnMut(Frame) -> ControlFlow<()>,
    ) -> Result<ControlFlow<()>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
            self.scaler.run(&decoded, &mut rgb_frame)?;

            let timestamp = decoded
                .timestamp()
                .map(|pts| self.pts_to_duration(pts))
                .unwrap_or_else(|| self.fallback_timestamp(*next_index));

            if self.paced {
                let due = started + timestamp;
                let now = Instant::now();
                if due > now {
                    std::thread::sleep(due - now);
                }
            }

            let pixels = extract_rgb_pixels(&rgb_frame, self.info.width, self.info.height);
            let frame = Frame::new(pixels, self.info.width, self.info.height, 3, *next_index)
                .with_timestamp(timestamp);
            *next_index += 1;

            if on_frame(frame).is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }
}

impl FrameSource for FfmpegFrameSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn stream(
        &mut self,
        on_frame: &mut dyn FnMut(Frame) -> ControlFlow<()>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let started = Instant::now();
        let mut next_index = 0usize;

        loop {
            let packet = {
                let Some((stream, packet)) = self.input_ctx.packets().next() else {
                    break;
                };
                if stream.index() != self.video_stream_index {
                    continue;
                }
                packet
            };

            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {e}");
                continue;
            }
            if self.drain_decoder(&mut next_index, started, on_frame)?.is_break() {
                return Ok(());
            }
        }

        self.decoder.send_eof()?;
        self.drain_decoder(&mut next_index, started, on_frame)?;
        log::info!("Frame source ended after {next_index} frames");
        Ok(())
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping any per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32, fps: i32) {
        ffmpeg_next::init().unwrap();

        let mut octx = ffmpeg_next::format::output(path).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();
        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }
        let mut encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .unwrap();
        ost.set_parameters(&encoder);
        octx.write_header().unwrap();
        let ost_time_base = octx.stream(0).unwrap().time_base();

        let mut scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .unwrap();

        let write_packets = |encoder: &mut ffmpeg_next::encoder::Video,
                                 octx: &mut ffmpeg_next::format::context::Output| {
            let mut encoded = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut encoded).is_ok() {
                encoded.set_stream(0);
                encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
                encoded.write_interleaved(octx).unwrap();
            }
        };

        for i in 0..num_frames {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
            );
            let stride = rgb_frame.stride(0);
            let data = rgb_frame.data_mut(0);
            let value = ((i * 40) % 256) as u8;
            for row in 0..height as usize {
                for col in 0..width as usize * 3 {
                    data[row * stride + col] = value;
                }
            }
            let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&rgb_frame, &mut yuv_frame).unwrap();
            yuv_frame.set_pts(Some(i as i64));
            encoder.send_frame(&yuv_frame).unwrap();
            write_packets(&mut encoder, &mut octx);
        }
        encoder.send_eof().unwrap();
        write_packets(&mut encoder, &mut octx);
        octx.write_trailer().unwrap();
    }

    #[test]
    fn test_open_reports_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 3, 160, 120, 25);

        let source = FfmpegFrameSource::open(&path, false).unwrap();
        assert_eq!(source.info().width, 160);
        assert_eq!(source.info().height, 120);
        assert!(source.info().fps > 0.0);
    }

    #[test]
    fn test_open_nonexistent_fails() {
        assert!(FfmpegFrameSource::open(Path::new("/nonexistent/clip.mp4"), false).is_err());
    }

    #[test]
    fn test_stream_pushes_all_frames_with_rising_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 5, 160, 120, 25);

        let mut source = FfmpegFrameSource::open(&path, false).unwrap();
        let mut frames = Vec::new();
        source
            .stream(&mut |frame| {
                frames.push(frame);
                ControlFlow::Continue(())
            })
            .unwrap();

        assert_eq!(frames.len(), 5);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index(), i);
            assert_eq!(frame.channels(), 3);
            assert_eq!(frame.data().len(), 160 * 120 * 3);
        }
        for pair in frames.windows(2) {
            assert!(pair[1].timestamp() > pair[0].timestamp());
        }
    }

    #[test]
    fn test_stream_stops_when_callback_breaks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 5, 160, 120, 25);

        let mut source = FfmpegFrameSource::open(&path, false).unwrap();
        let mut seen = 0;
        source
            .stream(&mut |_| {
                seen += 1;
                if seen == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(seen, 2);
    }
}
