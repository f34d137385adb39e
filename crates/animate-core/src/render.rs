//! Render settings submitted with a prompt.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum accepted prompt length in characters.
pub const MAX_PROMPT_CHARS: usize = 2000;

/// Target duration of the generated video.
///
/// Variants are declared shortest first, so `Ord` follows duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VideoLength {
    /// 5 to 10 seconds.
    #[serde(rename = "Short (5s)")]
    Short,
    /// 15 to 20 seconds.
    #[default]
    #[serde(rename = "Medium (15s)")]
    Medium,
    /// About a minute.
    #[serde(rename = "Long (1m)")]
    Long,
    /// Two minutes or more.
    #[serde(rename = "Deep Dive (2m)")]
    DeepDive,
    /// Up to five minutes.
    #[serde(rename = "Extended (5m)")]
    Extended,
}

impl VideoLength {
    /// All lengths, shortest first.
    pub const ALL: [Self; 5] = [
        Self::Short,
        Self::Medium,
        Self::Long,
        Self::DeepDive,
        Self::Extended,
    ];

    /// The label shown to users and used on the wire.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Short => "Short (5s)",
            Self::Medium => "Medium (15s)",
            Self::Long => "Long (1m)",
            Self::DeepDive => "Deep Dive (2m)",
            Self::Extended => "Extended (5m)",
        }
    }
}

impl fmt::Display for VideoLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for VideoLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.label() == s)
            .ok_or_else(|| format!("unknown video length: {s}"))
    }
}

/// Output resolution of the rendered video.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// 1280x720 at 30 fps.
    #[default]
    #[serde(rename = "720p")]
    Hd,
    /// 1920x1080 at 60 fps.
    #[serde(rename = "1080p")]
    FullHd,
    /// 3840x2160 at 60 fps.
    #[serde(rename = "4k")]
    Uhd,
}

impl Resolution {
    /// The label used on the wire.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hd => "720p",
            Self::FullHd => "1080p",
            Self::Uhd => "4k",
        }
    }

    /// Manim CLI quality flag producing this resolution.
    #[must_use]
    pub const fn quality_flag(self) -> &'static str {
        match self {
            Self::Hd => "-qm",
            Self::FullHd => "-qh",
            Self::Uhd => "-qk",
        }
    }

    /// Manim's name for the quality preset (also its output folder name).
    #[must_use]
    pub const fn quality_name(self) -> &'static str {
        match self {
            Self::Hd => "720p30",
            Self::FullHd => "1080p60",
            Self::Uhd => "2160p60",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A request to turn a prompt into an animation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Natural-language description of the animation.
    pub prompt: String,
    /// Target duration.
    #[serde(default)]
    pub length: VideoLength,
    /// Output resolution.
    #[serde(default)]
    pub resolution: Resolution,
}

impl RenderRequest {
    /// Create a request with default settings.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            length: VideoLength::default(),
            resolution: Resolution::default(),
        }
    }

    /// Check the prompt is non-empty and within the length limit.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` describing the first problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }
        let len = self.prompt.chars().count();
        if len > MAX_PROMPT_CHARS {
            return Err(ValidationError::PromptTooLong {
                len,
                max: MAX_PROMPT_CHARS,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_labels_on_the_wire() {
        let json = serde_json::to_string(&VideoLength::DeepDive).unwrap();
        assert_eq!(json, "\"Deep Dive (2m)\"");
        let parsed: VideoLength = serde_json::from_str("\"Long (1m)\"").unwrap();
        assert_eq!(parsed, VideoLength::Long);
        assert!(serde_json::from_str::<VideoLength>("\"Forever\"").is_err());
    }

    #[test]
    fn length_ordering_follows_duration() {
        assert!(VideoLength::Short < VideoLength::Medium);
        assert!(VideoLength::Long < VideoLength::Extended);
        assert_eq!("Short (5s)".parse::<VideoLength>(), Ok(VideoLength::Short));
    }

    #[test]
    fn resolution_quality_flags() {
        assert_eq!(Resolution::Hd.quality_flag(), "-qm");
        assert_eq!(Resolution::FullHd.quality_flag(), "-qh");
        assert_eq!(Resolution::Uhd.quality_flag(), "-qk");
        let parsed: Resolution = serde_json::from_str("\"4k\"").unwrap();
        assert_eq!(parsed, Resolution::Uhd);
    }

    #[test]
    fn request_defaults_apply() {
        let req: RenderRequest = serde_json::from_str(r#"{"prompt":"circles"}"#).unwrap();
        assert_eq!(req.length, VideoLength::Medium);
        assert_eq!(req.resolution, Resolution::Hd);
    }

    #[test]
    fn request_validation() {
        assert_eq!(
            RenderRequest::new("   ").validate(),
            Err(ValidationError::EmptyPrompt)
        );
        let long = RenderRequest::new("x".repeat(MAX_PROMPT_CHARS + 1));
        assert!(matches!(
            long.validate(),
            Err(ValidationError::PromptTooLong { .. })
        ));
        assert!(RenderRequest::new("Explain the Pythagorean theorem")
            .validate()
            .is_ok());
    }
}
