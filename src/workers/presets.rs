/// Fixed HLS quality-tier table. The ladder and its numbers are part of the
/// persisted manifest contract, so they are hardcoded rather than configured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QualityPreset {
    pub name: &'static str,
    pub bitrate: &'static str,
    pub resolution: &'static str,
    pub fps: &'static str,
}

pub const QUALITY_PRESETS: &[QualityPreset] = &[
    QualityPreset { name: "1080p", bitrate: "5000k", resolution: "1920x1080", fps: "30" },
    QualityPreset { name: "720p", bitrate: "2500k", resolution: "1280x720", fps: "30" },
    QualityPreset { name: "480p", bitrate: "1000k", resolution: "854x480", fps: "30" },
    QualityPreset { name: "360p", bitrate: "500k", resolution: "640x360", fps: "30" },
    QualityPreset { name: "240p", bitrate: "250k", resolution: "426x240", fps: "24" },
];

pub const DEFAULT_TIERS: &[&str] = &["720p", "480p", "360p"];

/// Segment length in seconds, shared by the encoder invocation and the stub
/// pipeline so both produce the same playlist shape.
pub const HLS_SEGMENT_SECONDS: u32 = 10;

pub fn find(name: &str) -> Option<&'static QualityPreset> {
    QUALITY_PRESETS.iter().find(|preset| preset.name == name)
}

/// Filter requested tier names against the preset table. Unknown names are
/// dropped, request order is preserved; an empty result falls back to the
/// default tier set.
pub fn filter_requested(requested: &[String]) -> Vec<&'static QualityPreset> {
    let valid: Vec<_> = requested.iter().filter_map(|name| find(name)).collect();
    if valid.is_empty() {
        DEFAULT_TIERS
            .iter()
            .filter_map(|name| find(name))
            .collect()
    } else {
        valid
    }
}

/// Numeric BANDWIDTH value for the master playlist: the preset's bitrate
/// with the `k` suffix scaled to bits per second.
pub fn bandwidth(preset: &QualityPreset) -> String {
    preset.bitrate.replace('k', "000")
}

/// Assemble the top-level multi-variant playlist: fixed header plus one
/// STREAM-INF entry per tier referencing that tier's own sub-playlist.
pub fn master_playlist(tiers: &[&QualityPreset]) -> String {
    let mut playlist = String::from("#EXTM3U\n#EXT-X-VERSION:3\n");
    for preset in tiers {
        playlist.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}\n{}/playlist.m3u8\n",
            bandwidth(preset),
            preset.resolution,
            preset.name,
        ));
    }
    playlist
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tiers: &[&QualityPreset]) -> Vec<&'static str> {
        tiers.iter().map(|t| t.name).collect()
    }

    #[test]
    fn unknown_tiers_are_dropped_order_preserved() {
        let requested = vec!["720p".to_string(), "999p".to_string(), "360p".to_string()];
        assert_eq!(names(&filter_requested(&requested)), vec!["720p", "360p"]);
    }

    #[test]
    fn empty_or_all_invalid_requests_use_defaults() {
        assert_eq!(
            names(&filter_requested(&[])),
            vec!["720p", "480p", "360p"]
        );
        let junk = vec!["4320p".to_string(), "potato".to_string()];
        assert_eq!(
            names(&filter_requested(&junk)),
            vec!["720p", "480p", "360p"]
        );
    }

    #[test]
    fn bandwidth_scales_k_to_bits_per_second() {
        assert_eq!(bandwidth(find("1080p").unwrap()), "5000000");
        assert_eq!(bandwidth(find("240p").unwrap()), "250000");
    }

    #[test]
    fn master_playlist_has_one_stream_inf_per_tier() {
        let tiers = filter_requested(&[]);
        let playlist = master_playlist(&tiers);

        assert!(playlist.starts_with("#EXTM3U\n#EXT-X-VERSION:3\n"));
        assert_eq!(playlist.matches("#EXT-X-STREAM-INF").count(), 3);
        assert!(playlist.contains(
            "#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720\n720p/playlist.m3u8\n"
        ));
        assert!(playlist.contains("480p/playlist.m3u8"));
        assert!(playlist.contains("360p/playlist.m3u8"));
    }
}
