//! `embed` shortcodes.
//!
//! A fenced code block tagged `embed` holds a small YAML document:
//!
//! ````text
//! ```embed
//! provider: youtube
//! id: dQw4w9WgXcQ
//! ratio: "4:3"
//! title: Launch talk
//! ```
//! ````
//!
//! Known providers render to a responsive iframe. Anything else is left for
//! the caller to render as a plain code block.

use serde::Deserialize;
use tracing::debug;

/// Supported embed providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    YouTube,
    Vimeo,
    Spotify,
    SoundCloud,
    CodePen,
}

impl Provider {
    /// Look up a provider by its shortcode name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "youtube" => Some(Self::YouTube),
            "vimeo" => Some(Self::Vimeo),
            "spotify" => Some(Self::Spotify),
            "soundcloud" => Some(Self::SoundCloud),
            "codepen" => Some(Self::CodePen),
            _ => None,
        }
    }

    fn src(&self, id: &str) -> String {
        match self {
            Self::YouTube => format!("https://www.youtube-nocookie.com/embed/{id}"),
            Self::Vimeo => format!("https://player.vimeo.com/video/{id}"),
            Self::Spotify => format!("https://open.spotify.com/embed/{id}"),
            Self::SoundCloud => format!(
                "https://w.soundcloud.com/player/?url=https%3A//api.soundcloud.com/tracks/{id}"
            ),
            Self::CodePen => format!("https://codepen.io/{id}?default-tab=result"),
        }
    }

    /// Permissions policy granted to the iframe.
    fn allow(&self) -> &'static str {
        match self {
            Self::YouTube => {
                "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture; web-share"
            }
            Self::Vimeo => "autoplay; fullscreen; picture-in-picture",
            Self::Spotify => "autoplay; clipboard-write; encrypted-media; fullscreen; picture-in-picture",
            Self::SoundCloud => "autoplay",
            Self::CodePen => "fullscreen",
        }
    }

    fn class(&self) -> &'static str {
        match self {
            Self::YouTube => "embed-youtube",
            Self::Vimeo => "embed-vimeo",
            Self::Spotify => "embed-spotify",
            Self::SoundCloud => "embed-soundcloud",
            Self::CodePen => "embed-codepen",
        }
    }
}

/// Parsed body of an `embed` block.
#[derive(Debug, Clone, Deserialize)]
pub struct Embed {
    pub provider: String,
    pub id: String,

    #[serde(default)]
    pub ratio: Option<String>,

    #[serde(default)]
    pub title: Option<String>,
}

impl Embed {
    /// Parse the YAML body of a shortcode.
    pub fn parse(source: &str) -> Option<Self> {
        match serde_yaml::from_str::<Self>(source) {
            Ok(embed) => Some(embed),
            Err(e) => {
                debug!(error = %e, "embed shortcode is not valid YAML");
                None
            }
        }
    }

    /// Render to an iframe, or `None` when the provider or id is unusable.
    pub fn render(&self) -> Option<String> {
        let provider = Provider::from_name(&self.provider)?;
        let id = self.id.trim();
        if id.is_empty() || !id.chars().all(is_id_char) {
            debug!(provider = %self.provider, "embed id contains unsupported characters");
            return None;
        }

        let ratio = ratio_class(self.ratio.as_deref());
        let title = escape_attr(self.title.as_deref().unwrap_or("Embedded content"));

        Some(format!(
            "<div class=\"embed {class} {ratio}\"><iframe src=\"{src}\" title=\"{title}\" \
             allow=\"{allow}\" loading=\"lazy\" allowfullscreen></iframe></div>\n",
            class = provider.class(),
            src = provider.src(id),
            allow = provider.allow(),
        ))
    }
}

/// Render a shortcode body straight to HTML.
pub fn render_shortcode(source: &str) -> Option<String> {
    Embed::parse(source)?.render()
}

fn ratio_class(ratio: Option<&str>) -> &'static str {
    match ratio.map(str::trim) {
        Some("4:3") => "ratio-4x3",
        Some("1:1") => "ratio-1x1",
        Some("21:9") => "ratio-21x9",
        _ => "ratio-16x9",
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | ':' | '.')
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_embed() {
        let html = render_shortcode("provider: youtube\nid: abc123\ntitle: Talk").expect("render");
        assert!(html.contains("https://www.youtube-nocookie.com/embed/abc123"));
        assert!(html.contains("embed-youtube ratio-16x9"));
        assert!(html.contains("title=\"Talk\""));
        assert!(html.contains("encrypted-media"));
    }

    #[test]
    fn test_ratio_classes() {
        let html = render_shortcode("provider: vimeo\nid: \"42\"\nratio: \"4:3\"").expect("render");
        assert!(html.contains("ratio-4x3"));
        assert!(html.contains("player.vimeo.com/video/42"));

        let html = render_shortcode("provider: vimeo\nid: \"42\"\nratio: \"7:5\"").expect("render");
        assert!(html.contains("ratio-16x9"));
    }

    #[test]
    fn test_unknown_provider() {
        assert!(render_shortcode("provider: myspace\nid: abc").is_none());
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(render_shortcode("provider: [youtube\nid").is_none());
        assert!(render_shortcode("just some words").is_none());
    }

    #[test]
    fn test_rejects_injection_in_id() {
        assert!(render_shortcode("provider: youtube\nid: '\"><script>'").is_none());
    }

    #[test]
    fn test_title_escaped() {
        let html =
            render_shortcode("provider: spotify\nid: track/1\ntitle: 'A \"quoted\" <b>'").expect("render");
        assert!(html.contains("title=\"A &quot;quoted&quot; &lt;b&gt;\""));
    }
}
