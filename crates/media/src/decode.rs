use std::io::Read;
use std::process::{Command, Stdio};

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_audio as gst_audio;
use narrate_state::cancel::CancelToken;
use narrate_state::config::DecoderBackend;

use crate::error::{MediaError, MediaResult};
use crate::fetch::FetchedMedia;
use crate::gst_init::*;

const PULL_TIMEOUT_MS: u64 = 250;
const MAX_IDLE_PULLS: u32 = 40;
/// Both backends decode at this rate; peaks only need the envelope.
pub const PCM_SAMPLE_RATE: u32 = 8000;

#[derive(Debug, Clone, Default)]
pub struct DecodedPcm {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u32,
}

pub trait PcmDecoder: Send {
    fn decode_reference_channel(
        &mut self,
        media: &FetchedMedia,
        cancel: &CancelToken,
    ) -> MediaResult<DecodedPcm>;
}

pub fn decoder_for(backend: DecoderBackend) -> Box<dyn PcmDecoder> {
    match backend {
        DecoderBackend::Gstreamer => Box::new(GstPcmDecoder),
        DecoderBackend::Ffmpeg => Box::new(FfmpegPcmDecoder),
    }
}

impl PcmDecoder for Box<dyn PcmDecoder> {
    fn decode_reference_channel(
        &mut self,
        media: &FetchedMedia,
        cancel: &CancelToken,
    ) -> MediaResult<DecodedPcm> {
        (**self).decode_reference_channel(media, cancel)
    }
}

/// Keeps channel 0 of interleaved little-endian f32 frames. A trailing
/// partial frame is dropped.
pub fn reference_channel_from_le_bytes(data: &[u8], channels: usize) -> Vec<f32> {
    let channels = channels.max(1);
    data.chunks_exact(4 * channels)
        .map(|frame| f32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]))
        .collect()
}

/// `filesrc ! decodebin ! audioconvert ! audioresample ! appsink`, pulled
/// to EOS.
pub struct GstPcmDecoder;

impl PcmDecoder for GstPcmDecoder {
    fn decode_reference_channel(
        &mut self,
        media: &FetchedMedia,
        cancel: &CancelToken,
    ) -> MediaResult<DecodedPcm> {
        let locator = media.locator();
        init_once().map_err(|e| MediaError::decode(locator, e))?;

        let (guard, appsink) =
            build_audio_pipeline(media).map_err(|e| MediaError::decode(locator, e))?;
        let pipeline = &guard.0;

        pipeline
            .set_state(gst::State::Paused)
            .map_err(|e| MediaError::decode(locator, format!("Failed to set Paused: {e}")))?;
        let bus = pipeline
            .bus()
            .ok_or_else(|| MediaError::decode(locator, "No bus"))?;
        wait_for_async_done(&bus, gst::ClockTime::from_seconds(10))
            .map_err(|e| MediaError::decode(locator, format!("Preroll error: {e}")))?;

        if cancel.is_cancelled() {
            return Err(MediaError::Cancelled);
        }
        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| MediaError::decode(locator, format!("Failed to set Playing: {e}")))?;

        let mut pcm = DecodedPcm::default();
        let mut idle_pulls = 0;
        loop {
            if cancel.is_cancelled() {
                log::debug!("audio decode of {locator} cancelled");
                return Err(MediaError::Cancelled);
            }

            let Some(sample) =
                appsink.try_pull_sample(gst::ClockTime::from_mseconds(PULL_TIMEOUT_MS))
            else {
                if appsink.is_eos() {
                    break;
                }
                if let Some(err) = pending_bus_error(&bus) {
                    return Err(MediaError::decode(locator, err));
                }
                idle_pulls += 1;
                if idle_pulls >= MAX_IDLE_PULLS {
                    return Err(MediaError::decode(locator, "decoder stalled"));
                }
                continue;
            };
            idle_pulls = 0;

            if pcm.channels == 0 {
                let info = sample
                    .caps()
                    .and_then(|caps| gst_audio::AudioInfo::from_caps(caps).ok())
                    .ok_or_else(|| MediaError::decode(locator, "unreadable audio caps"))?;
                pcm.channels = info.channels();
                pcm.sample_rate = info.rate();
            }

            let Some(buffer) = sample.buffer() else {
                continue;
            };
            let Ok(map) = buffer.map_readable() else {
                continue;
            };
            pcm.samples.extend(reference_channel_from_le_bytes(
                map.as_slice(),
                pcm.channels as usize,
            ));
        }

        guard.release();

        if pcm.samples.is_empty() {
            return Err(MediaError::decode(locator, "no audio samples"));
        }
        log::debug!(
            "decoded {} samples at {} Hz ({} channels) from {locator}",
            pcm.samples.len(),
            pcm.sample_rate,
            pcm.channels
        );
        Ok(pcm)
    }
}

fn build_audio_pipeline(media: &FetchedMedia) -> Result<(PipelineGuard, gst_app::AppSink), String> {
    let pipeline = gst::Pipeline::new();
    let guard = PipelineGuard(pipeline.clone());

    let filesrc = make_filesrc(media.path())?;
    let decodebin = make_element("decodebin")?;
    let audioconvert = make_element("audioconvert")?;
    let audioresample = make_element("audioresample")?;
    let appsink = gst_app::AppSink::builder()
        .caps(&build_audio_caps(PCM_SAMPLE_RATE))
        .sync(false)
        .build();

    pipeline
        .add_many([
            &filesrc,
            &decodebin,
            &audioconvert,
            &audioresample,
            appsink.upcast_ref::<gst::Element>(),
        ])
        .map_err(|e| format!("Failed to add elements: {e}"))?;
    gst::Element::link_many([&filesrc, &decodebin])
        .map_err(|e| format!("Failed to link: {e}"))?;
    gst::Element::link_many([
        &audioconvert,
        &audioresample,
        appsink.upcast_ref::<gst::Element>(),
    ])
        .map_err(|e| format!("Failed to link audio chain: {e}"))?;

    connect_decodebin_audio_only(&decodebin, &audioconvert);

    Ok((guard, appsink))
}

pub struct FfmpegPcmDecoder;

impl PcmDecoder for FfmpegPcmDecoder {
    fn decode_reference_channel(
        &mut self,
        media: &FetchedMedia,
        cancel: &CancelToken,
    ) -> MediaResult<DecodedPcm> {
        let locator = media.locator();
        let sr_arg = format!("{PCM_SAMPLE_RATE}");

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error"])
            .args(["-i"])
            .arg(media.path())
            .args(["-vn"])
            .args(["-af", "pan=mono|c0=c0"])
            .args(["-ar", &sr_arg])
            .args(["-f", "f32le"])
            .args(["pipe:1"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MediaError::decode(locator, format!("failed to start ffmpeg: {e}")))?;

        let Some(mut stdout) = child.stdout.take() else {
            let _ = child.kill();
            return Err(MediaError::decode(locator, "ffmpeg stdout unavailable"));
        };

        let mut bytes = Vec::new();
        let mut chunk = vec![0u8; 64 * 1024];
        loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(MediaError::Cancelled);
            }
            match stdout.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => bytes.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(MediaError::decode(locator, e.to_string()));
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| MediaError::decode(locator, e.to_string()))?;
        if !status.success() {
            return Err(MediaError::decode(locator, format!("ffmpeg exited with {status}")));
        }

        let samples = reference_channel_from_le_bytes(&bytes, 1);
        if samples.is_empty() {
            return Err(MediaError::decode(locator, "no audio samples"));
        }
        Ok(DecodedPcm {
            samples,
            sample_rate: PCM_SAMPLE_RATE,
            channels: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn keeps_first_channel_of_stereo() {
        let bytes = le(&[0.1, -0.9, 0.2, -0.8, 0.3, -0.7]);
        assert_eq!(reference_channel_from_le_bytes(&bytes, 2), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn drops_partial_trailing_frame() {
        let mut bytes = le(&[0.5, 0.25]);
        bytes.extend_from_slice(&[0, 0]);
        assert_eq!(reference_channel_from_le_bytes(&bytes, 1), vec![0.5, 0.25]);
        assert_eq!(reference_channel_from_le_bytes(&le(&[0.5, 0.25, 0.125]), 2), vec![0.5]);
    }

    #[test]
    fn appsink_caps_pin_the_decode_rate() {
        gst::init().unwrap();
        let caps = build_audio_caps(PCM_SAMPLE_RATE);
        let s = caps.structure(0).unwrap();
        assert_eq!(s.get::<i32>("rate").unwrap(), PCM_SAMPLE_RATE as i32);
        assert_eq!(s.get::<&str>("format").unwrap(), "F32LE");
    }

    #[test]
    fn zero_channels_is_treated_as_mono() {
        assert_eq!(reference_channel_from_le_bytes(&le(&[0.75]), 0), vec![0.75]);
    }
}
