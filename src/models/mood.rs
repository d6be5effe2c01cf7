use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// User-facing emotional state offered by the frontend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodLabel {
    Happy,
    Sad,
    Excited,
    Calm,
    Melancholic,
    Adventurous,
    Nostalgic,
    Introspective,
}

impl MoodLabel {
    pub const ALL: [MoodLabel; 8] = [
        MoodLabel::Happy,
        MoodLabel::Sad,
        MoodLabel::Excited,
        MoodLabel::Calm,
        MoodLabel::Melancholic,
        MoodLabel::Adventurous,
        MoodLabel::Nostalgic,
        MoodLabel::Introspective,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodLabel::Happy => "happy",
            MoodLabel::Sad => "sad",
            MoodLabel::Excited => "excited",
            MoodLabel::Calm => "calm",
            MoodLabel::Melancholic => "melancholic",
            MoodLabel::Adventurous => "adventurous",
            MoodLabel::Nostalgic => "nostalgic",
            MoodLabel::Introspective => "introspective",
        }
    }
}

impl FromStr for MoodLabel {
    type Err = ();

    /// Case-insensitive, surrounding whitespace ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == key)
            .ok_or(())
    }
}
