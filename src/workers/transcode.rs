use crate::workers::presets::{HLS_SEGMENT_SECONDS, QualityPreset};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Wall-clock limit for a single per-tier encode.
const TIER_TIMEOUT: Duration = Duration::from_secs(3600);

/// Limit for the `-version` self-check when validating a candidate binary.
const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

const ENGINE_NAME: &str = "ffmpeg";

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("encoder exited with {status}: {stderr}")]
    EngineFailed {
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("encoder timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Encoding strategy, resolved once at startup. The stub variant is an
/// explicit degraded/test mode whose output tree has the same shape as real
/// ffmpeg output, so everything downstream of Transcode stays unaware of
/// which variant ran.
#[derive(Clone, Debug)]
pub enum Transcoder {
    Ffmpeg(PathBuf),
    Stub,
}

impl Transcoder {
    /// Resolve the encoding engine with a fixed priority order: explicit
    /// configured path (or directory), then a PATH lookup, then the bare
    /// command name. Each candidate must pass a `-version` self-check; if
    /// none does, fall back to the stub pipeline.
    pub async fn resolve(configured: Option<&Path>) -> Self {
        for candidate in candidates(configured) {
            if version_check(&candidate).await {
                info!("Using encoding engine at {}", candidate.display());
                return Transcoder::Ffmpeg(candidate);
            }
            debug!("Engine candidate {} failed validation", candidate.display());
        }

        warn!("No working {ENGINE_NAME} found; falling back to stub pipeline");
        Transcoder::Stub
    }

    pub fn is_stub(&self) -> bool {
        matches!(self, Transcoder::Stub)
    }

    /// Produce one tier's playlist and segments under `tier_dir`.
    pub async fn encode_tier(
        &self,
        input: &Path,
        tier_dir: &Path,
        preset: &QualityPreset,
    ) -> Result<(), TranscodeError> {
        tokio::fs::create_dir_all(tier_dir).await?;
        match self {
            Transcoder::Ffmpeg(program) => {
                encode_tier_ffmpeg(program, input, tier_dir, preset).await
            }
            Transcoder::Stub => write_stub_tier(tier_dir).await,
        }
    }
}

fn candidates(configured: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = configured {
        if path.is_dir() {
            candidates.push(path.join(ENGINE_NAME));
        } else {
            candidates.push(path.to_path_buf());
        }
    }

    if let Ok(found) = which::which(ENGINE_NAME) {
        candidates.push(found);
    }

    candidates.push(PathBuf::from(ENGINE_NAME));
    candidates
}

async fn version_check(program: &Path) -> bool {
    let mut cmd = Command::new(program);
    cmd.arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    matches!(
        tokio::time::timeout(VERSION_CHECK_TIMEOUT, cmd.status()).await,
        Ok(Ok(status)) if status.success()
    )
}

async fn encode_tier_ffmpeg(
    program: &Path,
    input: &Path,
    tier_dir: &Path,
    preset: &QualityPreset,
) -> Result<(), TranscodeError> {
    let segment_pattern = tier_dir.join("segment_%03d.ts");
    let playlist = tier_dir.join("playlist.m3u8");
    let hls_time = HLS_SEGMENT_SECONDS.to_string();

    let mut child = Command::new(program)
        .arg("-i")
        .arg(input)
        .args(["-c:v", "h264", "-c:a", "aac"])
        .args(["-b:v", preset.bitrate])
        .args(["-s", preset.resolution])
        .args(["-r", preset.fps])
        .args(["-f", "hls"])
        .args(["-hls_time", hls_time.as_str()])
        .args(["-hls_list_size", "0"])
        .arg("-hls_segment_filename")
        .arg(&segment_pattern)
        .arg(&playlist)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| TranscodeError::Spawn {
            program: program.display().to_string(),
            source,
        })?;

    // Drain stderr concurrently so a chatty encoder cannot fill the pipe and
    // deadlock against our wait().
    let mut stderr_pipe = child.stderr.take();
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            let _ = pipe.read_to_string(&mut buf).await;
        }
        buf
    });

    let status = match tokio::time::timeout(TIER_TIMEOUT, child.wait()).await {
        Ok(status) => status?,
        Err(_) => {
            let _ = child.start_kill();
            return Err(TranscodeError::Timeout(TIER_TIMEOUT));
        }
    };

    if !status.success() {
        let stderr = stderr_task.await.unwrap_or_default();
        return Err(TranscodeError::EngineFailed {
            status,
            stderr: tail(&stderr, 512),
        });
    }

    Ok(())
}

/// Synthesize one placeholder segment and a minimal valid sub-playlist for a
/// tier, matching the file names ffmpeg would have produced.
async fn write_stub_tier(tier_dir: &Path) -> Result<(), TranscodeError> {
    // A single zeroed MPEG-TS packet: 188 bytes starting with the 0x47 sync
    // byte.
    let mut segment = vec![0u8; 188];
    segment[0] = 0x47;
    tokio::fs::write(tier_dir.join("segment_000.ts"), segment).await?;

    let playlist = format!(
        "#EXTM3U\n\
         #EXT-X-VERSION:3\n\
         #EXT-X-TARGETDURATION:{HLS_SEGMENT_SECONDS}\n\
         #EXT-X-MEDIA-SEQUENCE:0\n\
         #EXTINF:{HLS_SEGMENT_SECONDS}.000000,\n\
         segment_000.ts\n\
         #EXT-X-ENDLIST\n"
    );
    tokio::fs::write(tier_dir.join("playlist.m3u8"), playlist).await?;

    Ok(())
}

fn tail(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= max {
        return trimmed.to_string();
    }
    let start = trimmed.len() - max;
    let start = trimmed
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| i >= start)
        .unwrap_or(0);
    trimmed[start..].to_string()
}
