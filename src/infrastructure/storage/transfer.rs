use crate::infrastructure::storage::ObjectStore;
use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Fetch one object to a local file, retrying a fixed number of times with a
/// fixed sleep between attempts. No backoff, no jitter; the final failure is
/// propagated after exhaustion. Returns the number of bytes written.
pub async fn download_with_retries(
    store: &dyn ObjectStore,
    key: &str,
    local_path: &Path,
    attempts: u32,
    delay: Duration,
) -> Result<u64> {
    if let Some(parent) = local_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let attempts = attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        info!("Downloading {} -> {} (attempt {})", key, local_path.display(), attempt);
        match store.get_object(key).await {
            Ok(body) => {
                let size = body.len() as u64;
                tokio::fs::write(local_path, body)
                    .await
                    .with_context(|| format!("Failed to write {}", local_path.display()))?;
                return Ok(size);
            }
            Err(e) => {
                warn!("Download attempt {} failed: {:#}", attempt, e);
                last_err = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| anyhow!("no attempts made"))
        .context(format!("Download of {key} failed after {attempts} attempts")))
}

/// Upload every file under `local_dir`, preserving relative paths beneath
/// `prefix` (separators normalized to `/`). Aborts on the first per-file
/// failure, without retrying individual files. Returns the keys written.
pub async fn upload_tree(
    store: &dyn ObjectStore,
    local_dir: &Path,
    prefix: &str,
) -> Result<Vec<String>> {
    let prefix = prefix.trim_end_matches('/');
    let mut files = Vec::new();
    for entry in WalkDir::new(local_dir) {
        let entry = entry.with_context(|| format!("Failed to walk {}", local_dir.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    // Deterministic upload order
    files.sort();

    let mut uploaded = Vec::with_capacity(files.len());
    for path in files {
        let relative = path
            .strip_prefix(local_dir)
            .with_context(|| format!("{} escapes {}", path.display(), local_dir.display()))?;
        let key = format!(
            "{}/{}",
            prefix,
            relative.to_string_lossy().replace('\\', "/")
        );
        let content_type = content_type_for(&path);

        let body = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        store
            .put_object(&key, Bytes::from(body), content_type)
            .await
            .with_context(|| format!("Failed to upload {} as {}", path.display(), key))?;

        uploaded.push(key);
    }

    Ok(uploaded)
}

/// Content type from file extension. HLS manifests and segments need
/// explicit overrides; everything else falls back to a guess by extension,
/// then to a generic binary type.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/MP2T",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::memory::MemoryObjectStore;
    use std::path::PathBuf;

    const FAST: Duration = Duration::from_millis(5);

    #[test]
    fn content_types_cover_hls_and_fallback() {
        assert_eq!(
            content_type_for(Path::new("master.m3u8")),
            "application/vnd.apple.mpegurl"
        );
        assert_eq!(content_type_for(Path::new("segment_000.ts")), "video/MP2T");
        assert_eq!(content_type_for(Path::new("thumb.jpg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("notes.txt")), "text/plain");
        assert_eq!(
            content_type_for(Path::new("blob.weird")),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn download_succeeds_after_transient_failures() {
        let store = MemoryObjectStore::new();
        store.insert("videos/v/original.mp4", &b"abcdef"[..]);
        store.fail_next_gets(2);

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("input.mp4");

        let size = download_with_retries(&store, "videos/v/original.mp4", &local, 3, FAST)
            .await
            .unwrap();

        assert_eq!(size, 6);
        assert_eq!(std::fs::read(&local).unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn download_propagates_final_failure_after_exhaustion() {
        let store = MemoryObjectStore::new();
        store.insert("videos/v/original.mp4", &b"abcdef"[..]);
        store.fail_next_gets(u32::MAX);

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("input.mp4");

        let err = download_with_retries(&store, "videos/v/original.mp4", &local, 3, FAST)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("after 3 attempts"));
        assert!(!local.exists());
    }

    #[tokio::test]
    async fn upload_tree_preserves_relative_paths_and_content_types() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("720p")).unwrap();
        std::fs::write(dir.path().join("master.m3u8"), "#EXTM3U\n").unwrap();
        std::fs::write(dir.path().join("720p/playlist.m3u8"), "#EXTM3U\n").unwrap();
        std::fs::write(dir.path().join("720p/segment_000.ts"), [0u8; 16]).unwrap();

        let store = MemoryObjectStore::new();
        let keys = upload_tree(&store, dir.path(), "videos/v/hls/")
            .await
            .unwrap();

        assert_eq!(
            keys,
            vec![
                "videos/v/hls/720p/playlist.m3u8",
                "videos/v/hls/720p/segment_000.ts",
                "videos/v/hls/master.m3u8",
            ]
        );
        let segment = store.object("videos/v/hls/720p/segment_000.ts").unwrap();
        assert_eq!(segment.content_type, "video/MP2T");
        let manifest = store.object("videos/v/hls/master.m3u8").unwrap();
        assert_eq!(manifest.content_type, "application/vnd.apple.mpegurl");
    }

    #[tokio::test]
    async fn upload_tree_aborts_on_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), [0u8; 4]).unwrap();
        std::fs::write(dir.path().join("b.ts"), [0u8; 4]).unwrap();
        std::fs::write(dir.path().join("c.ts"), [0u8; 4]).unwrap();

        let store = MemoryObjectStore::new();
        store.fail_puts_from(2);

        let err = upload_tree(&store, dir.path(), "videos/v/hls")
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("b.ts"));
        assert_eq!(store.uploaded_keys(), vec!["videos/v/hls/a.ts"]);
    }

    #[tokio::test]
    async fn download_creates_missing_parent_directories() {
        let store = MemoryObjectStore::new();
        store.insert("k", &b"x"[..]);

        let dir = tempfile::tempdir().unwrap();
        let local: PathBuf = dir.path().join("nested/scratch/input.mp4");

        download_with_retries(&store, "k", &local, 1, FAST)
            .await
            .unwrap();
        assert!(local.exists());
    }
}
