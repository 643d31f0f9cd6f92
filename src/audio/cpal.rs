// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    error::Error,
    fmt,
    path::Path,
    sync::Arc,
    thread,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{error, info, span, Level};

use crate::{config, sound::clamp_volume, sound::SoundId};

use super::clip::ClipLoader;
use super::mixer::{Mixer, Voice, VoiceControl};
use super::{next_playback_id, AudioError, PlaybackId, SignalSender};

/// Device name that selects the host's default output device.
pub const DEFAULT_DEVICE: &str = "default";

/// A cpal output device with a running output stream. Clips are decoded into memory and
/// mixed on the stream's callback.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The host the device belongs to.
    host_id: cpal::HostId,
    /// Output channel count.
    channels: u16,
    /// Output sample rate.
    sample_rate: u32,
    /// Decoded clips, resampled to the output rate.
    loader: Mutex<ClipLoader>,
    /// Hands new voices to the output callback.
    voices_tx: Sender<Voice>,
    /// Dropping this stops the output thread.
    shutdown_tx: Option<Sender<()>>,
    /// The thread that owns the cpal stream.
    output_thread: Option<thread::JoinHandle<()>>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}, Rate={}) ({})",
            self.name,
            self.channels,
            self.sample_rate,
            self.host_id.name()
        )
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.shutdown_tx.take();
        if let Some(thread) = self.output_thread.take() {
            let _ = thread.join();
        }
    }
}

impl Device {
    /// Lists output devices across all hosts.
    pub fn list() -> Result<Vec<String>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<String> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(output_configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = output_configs
                    .map(|output_config| output_config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    devices.push(format!(
                        "{} (Channels={}) ({})",
                        device.name()?,
                        max_channels,
                        host_id.name()
                    ));
                }
            }
        }

        devices.sort();
        Ok(devices)
    }

    /// Finds the named output device, or the default host's default device.
    fn find(name: &str) -> Result<(cpal::Device, cpal::HostId), Box<dyn Error>> {
        if name == DEFAULT_DEVICE {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or("no default output device")?;
            return Ok((device, host.id()));
        }

        let _shh_stderr = shh::stderr()?;
        for host_id in cpal::available_hosts() {
            let Ok(devices) = cpal::host_from_id(host_id)?.output_devices() else {
                continue;
            };
            for device in devices {
                if device.name().is_ok_and(|device_name| device_name.trim() == name) {
                    return Ok((device, host_id));
                }
            }
        }

        Err(format!("no device found with name {}", name).into())
    }

    /// Gets the configured device and starts its output stream.
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let (device, host_id) = Device::find(config.device())?;
        let name = device.name()?;

        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let mut stream_config: cpal::StreamConfig = supported.into();
        if let Some(sample_rate) = config.sample_rate() {
            stream_config.sample_rate = sample_rate;
        }
        let channels = stream_config.channels;
        let sample_rate = stream_config.sample_rate;

        let (voices_tx, voices_rx) = crossbeam_channel::unbounded();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);

        let output_thread = thread::spawn(move || {
            let span = span!(Level::INFO, "output stream (cpal)");
            let _enter = span.enter();

            let mixer = Mixer::new(channels, voices_rx);
            let stream = match build_stream(&device, &stream_config, sample_format, mixer) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }
            let _ = ready_tx.send(Ok(()));

            // Keep the stream alive until the device is dropped.
            let _ = shutdown_rx.recv();
            info!("Output stream stopped");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(Box::new(AudioError::Stream(e))),
            Err(_) => {
                return Err(Box::new(AudioError::Stream(
                    "output thread exited before the stream started".to_string(),
                )))
            }
        }

        info!(
            device = name,
            host = host_id.name(),
            channels,
            sample_rate,
            "Output stream started"
        );

        Ok(Device {
            name,
            host_id,
            channels,
            sample_rate,
            loader: Mutex::new(ClipLoader::new(sample_rate)),
            voices_tx,
            shutdown_tx: Some(shutdown_tx),
            output_thread: Some(output_thread),
        })
    }
}

/// Builds an output stream for the device's native sample type, converting from the f32 mix.
fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    mixer: Mixer,
) -> Result<cpal::Stream, AudioError> {
    match sample_format {
        cpal::SampleFormat::F32 => build_typed_stream::<f32>(device, config, mixer),
        cpal::SampleFormat::I16 => build_typed_stream::<i16>(device, config, mixer),
        cpal::SampleFormat::I32 => build_typed_stream::<i32>(device, config, mixer),
        cpal::SampleFormat::U16 => build_typed_stream::<u16>(device, config, mixer),
        other => Err(AudioError::Device(format!(
            "unsupported sample format {:?}",
            other
        ))),
    }
}

fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: Mixer,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let live = mixer.live_voices();
    let mut scratch: Vec<f32> = Vec::new();
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                mixer.mix_into(&mut scratch);
                for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                    *dst = T::from_sample(src);
                }
            },
            move |err| {
                let failed = live.fail_all(&err.to_string());
                error!(err = %err, failed, "CPAL output stream error");
            },
            None,
        )
        .map_err(|e| AudioError::Stream(e.to_string()))
}

impl super::Backend for Device {
    fn load(
        &self,
        path: &Path,
        sound: &SoundId,
        signals: SignalSender,
    ) -> Result<Box<dyn super::Handle>, AudioError> {
        let clip = self.loader.lock().load(path)?;
        let playback = next_playback_id();
        let control = Arc::new(VoiceControl::new(1.0));

        Ok(Box::new(Handle {
            playback,
            pending: Some(Voice::new(
                playback,
                sound.clone(),
                clip,
                control.clone(),
                signals,
            )),
            control,
            voices_tx: self.voices_tx.clone(),
        }))
    }
}

/// Controls one voice on a cpal device.
pub struct Handle {
    playback: PlaybackId,
    /// The voice, until it's handed to the output stream.
    pending: Option<Voice>,
    control: Arc<VoiceControl>,
    voices_tx: Sender<Voice>,
}

impl super::Handle for Handle {
    fn playback_id(&self) -> PlaybackId {
        self.playback
    }

    fn start(&mut self) -> Result<(), AudioError> {
        match self.pending.take() {
            Some(voice) => self
                .voices_tx
                .send(voice)
                .map_err(|_| AudioError::Stream("output stream is not running".to_string())),
            None => Ok(()),
        }
    }

    fn stop(&mut self) {
        self.pending = None;
        self.control.stop();
    }

    fn set_volume(&mut self, volume: f32) {
        self.control.set_volume(clamp_volume(volume));
    }
}
