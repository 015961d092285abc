//! Loudness delivery standards
//!
//! Named target profiles for the platforms and broadcast standards a
//! program is commonly delivered to, each carrying an integrated
//! loudness target and a true-peak ceiling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A delivery target with an integrated loudness goal and peak ceiling.
///
/// `Mastering` is the open-ended profile: no target and no ceiling,
/// used while a mix is still being shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoudnessStandard {
    /// EBU R128 broadcast: -23 LUFS, -1 dBTP.
    EbuR128,
    /// ATSC A/85 (US broadcast): -24 LUFS, -2 dBTP.
    AtscA85,
    /// Typical music streaming normalization: -14 LUFS, -1 dBTP.
    #[default]
    Streaming,
    /// Apple Music: -16 LUFS, -1 dBTP.
    AppleMusic,
    /// Spoken-word / podcast delivery: -16 LUFS, -1 dBTP.
    Podcast,
    /// No normalization target.
    Mastering,
}

impl LoudnessStandard {
    /// Integrated loudness target in LUFS, if the profile has one.
    pub fn target_lufs(self) -> Option<f64> {
        match self {
            Self::EbuR128 => Some(-23.0),
            Self::AtscA85 => Some(-24.0),
            Self::Streaming => Some(-14.0),
            Self::AppleMusic | Self::Podcast => Some(-16.0),
            Self::Mastering => None,
        }
    }

    /// True-peak ceiling in dBTP, if the profile has one.
    pub fn true_peak_ceiling_db(self) -> Option<f64> {
        match self {
            Self::EbuR128 | Self::Streaming | Self::AppleMusic | Self::Podcast => Some(-1.0),
            Self::AtscA85 => Some(-2.0),
            Self::Mastering => None,
        }
    }

    /// Display name of the standard.
    pub fn name(self) -> &'static str {
        match self {
            Self::EbuR128 => "EBU R128",
            Self::AtscA85 => "ATSC A/85",
            Self::Streaming => "Streaming",
            Self::AppleMusic => "Apple Music",
            Self::Podcast => "Podcast",
            Self::Mastering => "Mastering",
        }
    }

    /// All profiles, in display order.
    pub fn all() -> &'static [LoudnessStandard] {
        &[
            Self::EbuR128,
            Self::AtscA85,
            Self::Streaming,
            Self::AppleMusic,
            Self::Podcast,
            Self::Mastering,
        ]
    }
}

impl fmt::Display for LoudnessStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
