//! Classifies import URLs by the video platform they point at.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoPlatform {
    YouTube,
    TikTok,
}

impl VideoPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoPlatform::YouTube => "youtube",
            VideoPlatform::TikTok => "tiktok",
        }
    }
}

impl fmt::Display for VideoPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoPlatform::YouTube => write!(f, "YouTube"),
            VideoPlatform::TikTok => write!(f, "TikTok"),
        }
    }
}

/// A URL that has been recognised as a supported video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSource {
    pub platform: VideoPlatform,
    pub url: String,
    /// Platform video id when it can be read from the URL. TikTok short links have none.
    pub video_id: Option<String>,
}

impl VideoSource {
    /// The value handed to the platform's extractor: the video id for YouTube,
    /// the full URL for TikTok.
    pub fn identifier(&self) -> &str {
        match (self.platform, self.video_id.as_deref()) {
            (VideoPlatform::YouTube, Some(id)) => id,
            _ => &self.url,
        }
    }

    /// Thumbnail that can be derived without asking the extractor.
    pub fn thumbnail_url(&self) -> Option<String> {
        match (self.platform, self.video_id.as_deref()) {
            (VideoPlatform::YouTube, Some(id)) => {
                Some(format!("https://img.youtube.com/vi/{}/hqdefault.jpg", id))
            }
            _ => None,
        }
    }
}

/// Returns `None` for anything that is not a YouTube or TikTok video URL.
pub fn classify(url: &str) -> Option<VideoSource> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host
        .trim_start_matches("www.")
        .trim_start_matches("m.")
        .to_string();

    match host.as_str() {
        "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" | "youtu.be" => {
            let video_id = youtube_video_id(&parsed, &host)?;
            Some(VideoSource {
                platform: VideoPlatform::YouTube,
                url: parsed.to_string(),
                video_id: Some(video_id),
            })
        }
        "tiktok.com" | "vm.tiktok.com" | "vt.tiktok.com" => Some(VideoSource {
            platform: VideoPlatform::TikTok,
            url: parsed.to_string(),
            video_id: tiktok_video_id(&parsed),
        }),
        _ => None,
    }
}

fn youtube_video_id(url: &Url, host: &str) -> Option<String> {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    let candidate = if host == "youtu.be" {
        segments.first().map(|s| s.to_string())
    } else {
        match segments.as_slice() {
            ["watch", ..] => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            ["shorts" | "embed" | "live" | "v", id, ..] => Some(id.to_string()),
            _ => None,
        }
    }?;

    is_video_id(&candidate).then_some(candidate)
}

fn tiktok_video_id(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.collect();
    segments
        .windows(2)
        .find(|pair| pair[0] == "video")
        .map(|pair| pair[1].to_string())
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn is_video_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn youtube_url_shapes() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://youtube.com/watch?feature=share&v=AAA", "AAA"),
            ("https://m.youtube.com/watch?v=abc_DEF-123", "abc_DEF-123"),
            ("https://youtu.be/xyz789?t=42", "xyz789"),
            ("https://www.youtube.com/shorts/short1", "short1"),
            ("https://www.youtube.com/embed/emb3d", "emb3d"),
        ];

        for (url, id) in cases {
            let source = classify(url).unwrap_or_else(|| panic!("{} not classified", url));
            assert_eq!(source.platform, VideoPlatform::YouTube, "{}", url);
            assert_eq!(source.identifier(), id, "{}", url);
        }
    }

    #[test]
    fn youtube_without_video_is_unsupported() {
        assert!(classify("https://www.youtube.com/").is_none());
        assert!(classify("https://www.youtube.com/@somechannel").is_none());
        assert!(classify("https://www.youtube.com/watch?list=PL123").is_none());
    }

    #[test]
    fn tiktok_passes_full_url() {
        let source = classify("https://www.tiktok.com/@u/video/BBB").unwrap();
        assert_eq!(source.platform, VideoPlatform::TikTok);
        assert_eq!(source.video_id.as_deref(), Some("BBB"));
        assert_eq!(source.identifier(), "https://www.tiktok.com/@u/video/BBB");

        let short = classify("https://vm.tiktok.com/ZMabc123/").unwrap();
        assert_eq!(short.platform, VideoPlatform::TikTok);
        assert!(short.video_id.is_none());
    }

    #[test]
    fn other_urls_are_unsupported() {
        assert!(classify("https://vimeo.com/12345").is_none());
        assert!(classify("not a url").is_none());
        assert!(classify("ftp://youtube.com/watch?v=abc").is_none());
        assert!(classify("").is_none());
    }

    #[test]
    fn youtube_thumbnail_is_derived() {
        let source = classify("https://youtu.be/AAA").unwrap();
        assert_eq!(
            source.thumbnail_url().as_deref(),
            Some("https://img.youtube.com/vi/AAA/hqdefault.jpg")
        );
        let tiktok = classify("https://www.tiktok.com/@u/video/1").unwrap();
        assert!(tiktok.thumbnail_url().is_none());
    }
}
