// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Audio adapter backed by `cpal` for device I/O and `symphonia` + `rubato`
//! for decode and resampling (§4.5). A file is decoded to an interleaved
//! `f32` buffer up front, resampled once to the output device's native
//! rate, then streamed out through a `cpal` callback reading from a shared
//! cursor.
//!
//! `cpal::Stream` is not `Send` on every backend, so it is built and driven
//! on a dedicated `std::thread` that never crosses an `.await` — the same
//! split the teacher's own playback thread uses — and the result is handed
//! back to the async world over a `oneshot` channel.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rubato::{FftFixedIn, Resampler};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use xmit_core::audio::{AudioAdapter, AudioDeviceInfo};
use xmit_core::error::AudioError;

/// Interleaved decoded samples and their native sample rate / channel count.
struct DecodedAudio {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

pub struct CpalAudio {
    host: cpal::Host,
    stop_flag: Arc<AtomicBool>,
}

impl Default for CpalAudio {
    fn default() -> Self {
        Self {
            host: cpal::default_host(),
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl CpalAudio {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioAdapter for CpalAudio {
    fn list_devices(&self) -> Result<Vec<AudioDeviceInfo>, AudioError> {
        let host_name = self.host.id().name().to_string();
        let devices = self
            .host
            .output_devices()
            .map_err(|e| AudioError::Enumeration(e.to_string()))?;

        Ok(devices
            .enumerate()
            .filter_map(|(index, d)| {
                d.name().ok().map(|name| AudioDeviceInfo {
                    index,
                    name,
                    host_api: host_name.clone(),
                })
            })
            .collect())
    }

    fn play<'a>(
        &'a self,
        file: &'a Path,
        device: &'a AudioDeviceInfo,
    ) -> Pin<Box<dyn Future<Output = Result<(), AudioError>> + Send + 'a>> {
        Box::pin(async move {
            self.stop_flag.store(false, Ordering::SeqCst);

            let file = file.to_path_buf();
            let device_name = device.name.clone();
            let stop_flag = self.stop_flag.clone();
            let (done_tx, done_rx) = tokio::sync::oneshot::channel();

            std::thread::spawn(move || {
                let result = play_blocking(&file, &device_name, &stop_flag);
                let _ = done_tx.send(result);
            });

            done_rx.await.unwrap_or_else(|_| {
                Err(AudioError::OpenFailed {
                    device: device.name.clone(),
                    source: "playback thread panicked".into(),
                })
            })
        })
    }

    fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

/// Decode, resample, and stream `file` to completion on `device_name`,
/// blocking the calling thread until playback ends or `stop_flag` is set.
/// Never awaits, so the `cpal::Stream` it builds never needs to be `Send`.
fn play_blocking(file: &Path, device_name: &str, stop_flag: &AtomicBool) -> Result<(), AudioError> {
    let host = cpal::default_host();
    let cpal_device = host
        .output_devices()
        .map_err(|e| AudioError::Enumeration(e.to_string()))?
        .find(|d| d.name().map(|n| n == device_name).unwrap_or(false))
        .ok_or_else(|| AudioError::DeviceNotFound(device_name.to_string()))?;

    let config = cpal_device
        .default_output_config()
        .map_err(|e| AudioError::OpenFailed {
            device: device_name.to_string(),
            source: Box::new(e),
        })?;
    let output_rate = config.sample_rate().0;
    let output_channels = config.channels() as usize;

    let decoded = decode_file(file)?;
    let resampled = resample_to_rate(&decoded, output_rate)?;
    let buffer = remix_channels(&resampled, decoded.channels, output_channels);

    let buffer = Arc::new(buffer);
    let cursor = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let stream_buffer = buffer.clone();
    let stream_cursor = cursor.clone();
    let stream_finished = finished.clone();
    let stream_config: cpal::StreamConfig = config.into();

    let stream = cpal_device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let start = stream_cursor.load(Ordering::Relaxed);
                let remaining = stream_buffer.len().saturating_sub(start);
                let take = remaining.min(data.len());
                data[..take].copy_from_slice(&stream_buffer[start..start + take]);
                for sample in &mut data[take..] {
                    *sample = 0.0;
                }
                stream_cursor.store(start + take, Ordering::Relaxed);
                if start + take >= stream_buffer.len() {
                    stream_finished.store(true, Ordering::Relaxed);
                }
            },
            move |err| tracing::warn!("audio stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::OpenFailed {
            device: device_name.to_string(),
            source: Box::new(e),
        })?;

    stream.play().map_err(|e| AudioError::OpenFailed {
        device: device_name.to_string(),
        source: Box::new(e),
    })?;

    loop {
        if finished.load(Ordering::Relaxed) || stop_flag.load(Ordering::SeqCst) {
            break;
        }
        std::thread::sleep(Duration::from_millis(25));
    }

    drop(stream);
    Ok(())
}

fn decode_file(path: &Path) -> Result<DecodedAudio, AudioError> {
    let file = std::fs::File::open(path).map_err(|e| AudioError::Decode {
        file: path.display().to_string(),
        source: Box::new(e),
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::Decode {
            file: path.display().to_string(),
            source: Box::new(e),
        })?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| AudioError::Decode {
            file: path.display().to_string(),
            source: "no default track".into(),
        })?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.ok_or_else(|| AudioError::Decode {
        file: path.display().to_string(),
        source: "unknown sample rate".into(),
    })?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode {
            file: path.display().to_string(),
            source: Box::new(e),
        })?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(_)) => break,
            Err(e) => {
                return Err(AudioError::Decode {
                    file: path.display().to_string(),
                    source: Box::new(e),
                })
            }
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = decoder.decode(&packet).map_err(|e| AudioError::Decode {
            file: path.display().to_string(),
            source: Box::new(e),
        })?;
        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    Ok(DecodedAudio {
        samples,
        channels,
        sample_rate,
    })
}

fn resample_to_rate(decoded: &DecodedAudio, output_rate: u32) -> Result<DecodedAudio, AudioError> {
    if decoded.sample_rate == output_rate || decoded.channels == 0 {
        return Ok(DecodedAudio {
            samples: decoded.samples.clone(),
            channels: decoded.channels,
            sample_rate: output_rate,
        });
    }

    const CHUNK: usize = 1024;
    let mut resampler = FftFixedIn::<f32>::new(
        decoded.sample_rate as usize,
        output_rate as usize,
        CHUNK,
        1,
        decoded.channels,
    )
    .map_err(|e| AudioError::Decode {
        file: "<resampler>".to_string(),
        source: Box::new(e),
    })?;

    let frames = decoded.samples.len() / decoded.channels;
    let mut deinterleaved: Vec<Vec<f32>> = vec![Vec::with_capacity(frames); decoded.channels];
    for frame in decoded.samples.chunks(decoded.channels) {
        for (ch, sample) in frame.iter().enumerate() {
            deinterleaved[ch].push(*sample);
        }
    }

    let mut output: Vec<Vec<f32>> = vec![Vec::new(); decoded.channels];
    let mut offset = 0;
    while offset < frames {
        let take = CHUNK.min(frames - offset);
        let mut chunk: Vec<Vec<f32>> = deinterleaved
            .iter()
            .map(|ch| {
                let mut v = ch[offset..offset + take].to_vec();
                v.resize(CHUNK, 0.0);
                v
            })
            .collect();
        if take < CHUNK {
            for v in &mut chunk {
                v.resize(CHUNK, 0.0);
            }
        }
        let processed = resampler
            .process(&chunk, None)
            .map_err(|e| AudioError::Decode {
                file: "<resampler>".to_string(),
                source: Box::new(e),
            })?;
        for (ch, samples) in output.iter_mut().zip(processed.into_iter()) {
            ch.extend(samples);
        }
        offset += take;
    }

    let out_frames = output.first().map(|c| c.len()).unwrap_or(0);
    let mut interleaved = Vec::with_capacity(out_frames * decoded.channels);
    for frame in 0..out_frames {
        for ch in &output {
            interleaved.push(ch[frame]);
        }
    }

    Ok(DecodedAudio {
        samples: interleaved,
        channels: decoded.channels,
        sample_rate: output_rate,
    })
}

/// Upmix/downmix an interleaved buffer from `in_channels` to `out_channels`
/// by repeating or averaging, whichever direction applies.
fn remix_channels(decoded: &DecodedAudio, in_channels: usize, out_channels: usize) -> Vec<f32> {
    if in_channels == out_channels || in_channels == 0 || out_channels == 0 {
        return decoded.samples.clone();
    }

    let frames = decoded.samples.len() / in_channels;
    let mut out = Vec::with_capacity(frames * out_channels);
    for frame in decoded.samples.chunks(in_channels) {
        if out_channels < in_channels {
            let mixed: f32 = frame.iter().sum::<f32>() / in_channels as f32;
            out.extend(std::iter::repeat(mixed).take(out_channels));
        } else {
            for i in 0..out_channels {
                out.push(frame[i % in_channels]);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remix_mono_to_stereo_duplicates_the_channel() {
        let decoded = DecodedAudio {
            samples: vec![1.0, 2.0, 3.0],
            channels: 1,
            sample_rate: 44_100,
        };
        let out = remix_channels(&decoded, 1, 2);
        assert_eq!(out, vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn remix_stereo_to_mono_averages_channels() {
        let decoded = DecodedAudio {
            samples: vec![0.0, 2.0, 4.0, 6.0],
            channels: 2,
            sample_rate: 44_100,
        };
        let out = remix_channels(&decoded, 2, 1);
        assert_eq!(out, vec![1.0, 5.0]);
    }

    #[test]
    fn matching_rate_skips_resampling() {
        let decoded = DecodedAudio {
            samples: vec![0.1, 0.2, 0.3, 0.4],
            channels: 2,
            sample_rate: 48_000,
        };
        let resampled = resample_to_rate(&decoded, 48_000).unwrap();
        assert_eq!(resampled.samples, decoded.samples);
    }
}
