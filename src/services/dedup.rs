use std::collections::HashSet;

use crate::models::ContentItem;

/// Drops items whose id the user has already consumed, keeping relative order
pub fn filter_consumed(items: Vec<ContentItem>, consumed_ids: &HashSet<String>) -> Vec<ContentItem> {
    if consumed_ids.is_empty() {
        return items;
    }

    let before = items.len();
    let kept: Vec<ContentItem> = items
        .into_iter()
        .filter(|item| !consumed_ids.contains(&item.id))
        .collect();

    tracing::debug!(
        removed = before - kept.len(),
        remaining = kept.len(),
        "Filtered consumed content"
    );

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn item(id: &str) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            title: id.to_string(),
            category: Category::Anime,
            genres: vec![],
            moods: vec![],
            rating: 5.0,
            description: String::new(),
        }
    }

    #[test]
    fn test_removes_consumed_and_preserves_order() {
        let items = vec![item("a1"), item("a2"), item("a3"), item("a4")];
        let consumed = HashSet::from(["a3".to_string(), "a1".to_string()]);

        let kept = filter_consumed(items, &consumed);
        let ids: Vec<&str> = kept.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a2", "a4"]);
    }

    #[test]
    fn test_empty_consumed_set_keeps_everything() {
        let kept = filter_consumed(vec![item("a1"), item("a2")], &HashSet::new());
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_unrelated_ids_are_ignored() {
        let consumed = HashSet::from(["zzz".to_string()]);
        let kept = filter_consumed(vec![item("a1")], &consumed);
        assert_eq!(kept.len(), 1);
    }
}
