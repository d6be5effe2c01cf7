use std::collections::HashSet;

use crate::models::MoodLabel;

/// Concrete content-mood tags for a user-facing mood label
///
/// Order matters: it is preserved through translation.
pub fn mood_tags(label: MoodLabel) -> &'static [&'static str] {
    match label {
        MoodLabel::Happy => &["fun", "wholesome", "heartwarming", "inspiring"],
        MoodLabel::Sad => &["emotional", "dark", "intense", "melancholic"],
        MoodLabel::Excited => &["thrilling", "epic", "intense", "cool"],
        MoodLabel::Calm => &["wholesome", "heartwarming", "beautiful", "peaceful"],
        MoodLabel::Melancholic => &["emotional", "dark", "thoughtful", "intense"],
        MoodLabel::Adventurous => &["epic", "thrilling", "intense", "cool"],
        MoodLabel::Nostalgic => &["beautiful", "emotional", "wholesome", "heartwarming"],
        MoodLabel::Introspective => &["thoughtful", "emotional", "mind-bending", "dark"],
    }
}

/// Maps mood labels to content-mood tags
///
/// Known labels expand through [`mood_tags`]; anything else passes through as
/// its own lower-cased, trimmed tag. The concatenation is deduplicated keeping
/// the first occurrence. Blank labels contribute nothing.
pub fn translate<S: AsRef<str>>(moods: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    for raw in moods {
        let raw = raw.as_ref();
        let expanded: Vec<String> = match raw.parse::<MoodLabel>() {
            Ok(label) => mood_tags(label).iter().map(|t| t.to_string()).collect(),
            Err(()) => {
                let tag = raw.trim().to_lowercase();
                if tag.is_empty() {
                    continue;
                }
                vec![tag]
            }
        };

        for tag in expanded {
            if seen.insert(tag.clone()) {
                tags.push(tag);
            }
        }
    }

    tags
}
