//! HLS playlist rendering.
//!
//! Assets are always static (VOD): the media playlist carries every
//! fragment and ends with `#EXT-X-ENDLIST`.

use fragment::FragmentList;

/// Render the master (variant) playlist: a single variant entry pointing
/// at the chunk list.
///
/// Bandwidth is estimated as `8 * file_size / duration` bits per second,
/// rounded down; an asset with zero duration reports bandwidth 0.
pub fn render_master(list: &FragmentList, file_size: u64, base_url: &str) -> String {
    let duration = list.relative_duration();
    let bandwidth = if duration > 0.0 {
        (8.0 * file_size as f64 / duration) as u64
    } else {
        0
    };

    let mut lines = vec!["#EXTM3U".to_string(), "#EXT-X-VERSION:3".to_string()];
    match &list.resolution {
        Some(resolution) => lines.push(format!(
            "#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH={bandwidth},RESOLUTION={resolution}"
        )),
        None => lines.push(format!(
            "#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH={bandwidth}"
        )),
    }
    lines.push(format!("{base_url}/chunklist.m3u8"));
    lines.join("\n")
}

/// Render the media playlist: one `EXTINF`/URL pair per fragment in
/// sequence order.
pub fn render_media(list: &FragmentList, base_url: &str) -> String {
    let target_duration = list.fragment_duration.ceil() as u64;

    let mut lines = vec![
        "#EXTM3U".to_string(),
        "#EXT-X-VERSION:3".to_string(),
        format!("#EXT-X-TARGETDURATION:{target_duration}"),
        "#EXT-X-MEDIA-SEQUENCE:1".to_string(),
    ];
    for fragment in &list.fragments {
        lines.push(format!("#EXTINF:{:.2},", fragment.relative_duration()));
        lines.push(format!("{base_url}/media-{}.ts", fragment.sequence));
    }
    lines.push("#EXT-X-ENDLIST".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fragment::{Fragment, FragmentList};
    use media_types::Resolution;

    fn list_with_fragments(durations: &[u64]) -> FragmentList {
        let timescale = 600;
        let mut fragments = Vec::new();
        let mut timestamp = 0;
        for (i, &duration) in durations.iter().enumerate() {
            fragments.push(Fragment {
                sequence: i as u32 + 1,
                timestamp,
                duration,
                timescale,
                samples: Vec::new(),
            });
            timestamp += duration;
        }
        FragmentList {
            timescale,
            duration: timestamp,
            fragment_duration: 10.0,
            resolution: Some(Resolution::new(1280, 720)),
            tracks: Vec::new(),
            fragments,
        }
    }

    #[test]
    fn test_master_playlist() {
        let list = list_with_fragments(&[6000, 6000, 6000]);
        let playlist = render_master(&list, 9_000_000, "/vod/movie.mp4");
        // 8 * 9e6 bytes over 30 s = 2.4 Mbit/s
        assert_eq!(
            playlist,
            "#EXTM3U\n\
             #EXT-X-VERSION:3\n\
             #EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=2400000,RESOLUTION=1280x720\n\
             /vod/movie.mp4/chunklist.m3u8"
        );
    }

    #[test]
    fn test_master_bandwidth_rounds_down() {
        let list = list_with_fragments(&[6000]);
        // 8 * 1000 / 10 = 800 exactly; 8 * 999 / 10 = 799.2 -> 799
        let playlist = render_master(&list, 999, "/vod/a");
        assert!(playlist.contains("BANDWIDTH=799,"), "{playlist}");
    }

    #[test]
    fn test_master_zero_duration_bandwidth() {
        let mut list = list_with_fragments(&[]);
        list.duration = 0;
        let playlist = render_master(&list, 123_456, "/vod/empty.mp4");
        assert!(playlist.contains("BANDWIDTH=0"), "{playlist}");
    }

    #[test]
    fn test_master_without_resolution() {
        let mut list = list_with_fragments(&[6000]);
        list.resolution = None;
        let playlist = render_master(&list, 1000, "/vod/audio.mp4");
        assert!(!playlist.contains("RESOLUTION"));
    }

    #[test]
    fn test_media_playlist_pairs_and_endlist() {
        let list = list_with_fragments(&[6000, 6000, 5700]);
        let playlist = render_media(&list, "/vod/movie.mp4");
        let lines: Vec<&str> = playlist.lines().collect();

        assert_eq!(lines[0], "#EXTM3U");
        assert_eq!(lines[2], "#EXT-X-TARGETDURATION:10");
        assert_eq!(lines[3], "#EXT-X-MEDIA-SEQUENCE:1");
        let extinf_count = lines.iter().filter(|l| l.starts_with("#EXTINF:")).count();
        assert_eq!(extinf_count, list.count());
        assert_eq!(lines[4], "#EXTINF:10.00,");
        assert_eq!(lines[5], "/vod/movie.mp4/media-1.ts");
        assert_eq!(lines[8], "#EXTINF:9.50,");
        assert_eq!(lines[9], "/vod/movie.mp4/media-3.ts");
        assert_eq!(*lines.last().unwrap(), "#EXT-X-ENDLIST");
    }

    #[test]
    fn test_media_target_duration_is_ceiling() {
        let mut list = list_with_fragments(&[6000]);
        list.fragment_duration = 9.2;
        let playlist = render_media(&list, "/vod/a");
        assert!(playlist.contains("#EXT-X-TARGETDURATION:10\n"));
    }
}
