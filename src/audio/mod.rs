use std::path::{Path, PathBuf};
use std::process::Stdio;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, debug};

use crate::error::BackendError;

/// Sample rate expected by the recognizers.
pub const SAMPLE_RATE: u32 = 16000;

/// Decode any media ffmpeg understands into 16 kHz mono samples in `[-1, 1]`.
///
/// ffmpeg writes raw `s16le` to a pipe, which is read in full and then
/// converted. `source` may be a local path or a URL.
pub async fn decode_to_pcm(source: &str) -> Result<Vec<f32>, BackendError> {
    info!("Decoding {} to {} Hz mono", source, SAMPLE_RATE);

    let rate = SAMPLE_RATE.to_string();
    let output = Command::new("ffmpeg")
        .args(["-loglevel", "quiet", "-nostdin", "-i", source])
        .args(["-ar", rate.as_str(), "-ac", "1", "-f", "s16le", "-"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| BackendError::Spawn { program: "ffmpeg".to_string(), source: e })?;

    if !output.status.success() {
        return Err(BackendError::ToolFailed {
            program: "ffmpeg".to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let samples = pcm_s16le_to_f32(&output.stdout);
    debug!("Decoded {} samples ({:.1}s)", samples.len(), samples.len() as f32 / SAMPLE_RATE as f32);
    Ok(samples)
}

/// Little-endian 16-bit PCM to normalized floats. A trailing odd byte is dropped.
pub fn pcm_s16le_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}

/// Writes audio artifacts for a media source into a directory.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, source: &str, destination: &Path) -> Result<(), BackendError>;
}

/// Audio-only HLS: 8 second AAC segments in MPEG-TS plus a VOD playlist
/// named after the source file.
#[derive(Debug, Clone)]
pub struct HlsAudioExtractor {
    program: String,
    segment_seconds: u32,
}

impl Default for HlsAudioExtractor {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            segment_seconds: 8,
        }
    }
}

impl HlsAudioExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn playlist_path(source: &str, destination: &Path) -> PathBuf {
        let stem = Path::new(source.split('?').next().unwrap_or(source))
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        destination.join(format!("{}.m3u8", stem))
    }

    fn build_args(&self, source: &str, destination: &Path) -> Vec<String> {
        let playlist = Self::playlist_path(source, destination);
        let segments = destination.join("segment%04d.ts");
        vec![
            "-y".to_string(),
            "-loglevel".to_string(), "warning".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(), source.to_string(),
            "-c:a".to_string(), "aac".to_string(),
            "-f".to_string(), "hls".to_string(),
            "-hls_time".to_string(), self.segment_seconds.to_string(),
            "-hls_playlist_type".to_string(), "vod".to_string(),
            "-hls_flags".to_string(), "independent_segments".to_string(),
            "-hls_segment_type".to_string(), "mpegts".to_string(),
            "-hls_segment_filename".to_string(), segments.to_string_lossy().into_owned(),
            "-vn".to_string(),
            playlist.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl AudioExtractor for HlsAudioExtractor {
    async fn extract(&self, source: &str, destination: &Path) -> Result<(), BackendError> {
        let args = self.build_args(source, destination);
        info!("Extracting audio of {} into {}", source, destination.display());

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BackendError::Spawn { program: self.program.clone(), source: e })?;

        if !output.status.success() {
            return Err(BackendError::ToolFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!("Audio playlist written to {}", Self::playlist_path(source, destination).display());
        Ok(())
    }
}
