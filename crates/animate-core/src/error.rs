//! Error types for request validation and tier gating.

use crate::render::{Resolution, VideoLength};
use crate::usage::Tier;

/// Errors raised while validating a render request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The prompt is empty or whitespace only.
    #[error("prompt must not be empty")]
    EmptyPrompt,

    /// The prompt exceeds the maximum length.
    #[error("prompt is too long: {len} characters (max {max})")]
    PromptTooLong {
        /// Length of the submitted prompt in characters.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },
}

/// Errors raised when render settings exceed what a tier allows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TierError {
    /// The requested video length is above the tier maximum.
    #[error("{length} videos are not available on the {tier} tier (max {max})")]
    LengthNotAllowed {
        /// The user's effective tier.
        tier: Tier,
        /// The requested length.
        length: VideoLength,
        /// The longest length the tier allows.
        max: VideoLength,
    },

    /// The requested resolution is above the tier maximum.
    #[error("{resolution} rendering is not available on the {tier} tier (max {max})")]
    ResolutionNotAllowed {
        /// The user's effective tier.
        tier: Tier,
        /// The requested resolution.
        resolution: Resolution,
        /// The highest resolution the tier allows.
        max: Resolution,
    },
}
