use std::collections::HashSet;

use crate::{
    models::{Category, ContentItem},
    services::catalog::CatalogStore,
};

/// Lower-cased, trimmed form used for every tag comparison
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Requested tags (already normalized) that appear among the item's declared tags
pub fn matched_tags<'a>(requested: &'a [String], declared: &[String]) -> Vec<&'a String> {
    requested
        .iter()
        .filter(|wanted| declared.iter().any(|d| normalize_tag(d) == **wanted))
        .collect()
}

fn matches_any(requested: &[String], declared: &[String]) -> bool {
    requested
        .iter()
        .any(|wanted| declared.iter().any(|d| normalize_tag(d) == *wanted))
}

/// Finds catalog items for the given categories
///
/// `genres` and `mood_tags` must already be normalized. Each non-empty filter is
/// an OR over its tags, and both filters must hold when both are given. With no
/// filters every item in the selected categories is returned.
///
/// Results are ordered by declared rating, highest first; equal ratings keep
/// catalog order (categories in request order, items in load order).
pub fn search(
    catalog: &dyn CatalogStore,
    categories: &[Category],
    genres: &[String],
    mood_tags: &[String],
) -> Vec<ContentItem> {
    let mut seen = HashSet::new();
    let mut results: Vec<ContentItem> = Vec::new();

    for &category in categories {
        if !seen.insert(category) {
            continue;
        }

        let partition = catalog.items_by_category(category);
        if partition.is_empty() {
            tracing::debug!(category = %category, "Category has no catalog entries");
            continue;
        }

        for item in partition {
            let genre_ok = genres.is_empty() || matches_any(genres, &item.genres);
            let mood_ok = mood_tags.is_empty() || matches_any(mood_tags, &item.moods);

            if genre_ok && mood_ok {
                let mut stamped = item.clone();
                stamped.category = category;
                results.push(stamped);
            }
        }
    }

    // Stable: ties stay in catalog order
    results.sort_by(|a, b| b.rating.total_cmp(&a.rating));

    tracing::debug!(
        categories = categories.len(),
        genres = genres.len(),
        mood_tags = mood_tags.len(),
        matches = results.len(),
        "Candidate search completed"
    );

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::InMemoryCatalog;

    fn item(
        id: &str,
        category: Category,
        genres: &[&str],
        moods: &[&str],
        rating: f64,
    ) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            title: id.to_uppercase(),
            category,
            genres: genres.iter().map(|s| s.to_string()).collect(),
            moods: moods.iter().map(|s| s.to_string()).collect(),
            rating,
            description: String::new(),
        }
    }

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn ids(items: &[ContentItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::from_items(vec![
            item("a1", Category::Anime, &["Action"], &["intense"], 8.5),
            item("a2", Category::Anime, &["comedy"], &["fun"], 7.0),
            item("a3", Category::Anime, &["action", "comedy"], &["fun"], 9.0),
            item("a4", Category::Anime, &["drama"], &[], 7.0),
            item("m1", Category::Movies, &["action"], &["Epic"], 7.0),
        ])
    }

    #[test]
    fn test_no_filters_returns_all_items_in_categories_by_rating() {
        let results = search(&catalog(), &[Category::Anime], &[], &[]);
        assert_eq!(ids(&results), vec!["a3", "a1", "a2", "a4"]);
    }

    #[test]
    fn test_genre_only_is_or_match_case_insensitive() {
        let results = search(&catalog(), &[Category::Anime], &tags(&["action"]), &[]);
        assert_eq!(ids(&results), vec!["a3", "a1"]);

        let results = search(
            &catalog(),
            &[Category::Anime],
            &tags(&["drama", "comedy"]),
            &[],
        );
        assert_eq!(ids(&results), vec!["a3", "a2", "a4"]);
    }

    #[test]
    fn test_mood_only_is_or_match() {
        let results = search(&catalog(), &[Category::Anime], &[], &tags(&["fun", "intense"]));
        assert_eq!(ids(&results), vec!["a3", "a1", "a2"]);
    }

    #[test]
    fn test_genre_and_mood_must_both_match() {
        // a1 matches genre but not mood
        let results = search(
            &catalog(),
            &[Category::Anime],
            &tags(&["action"]),
            &tags(&["calm"]),
        );
        assert!(results.is_empty());

        let results = search(
            &catalog(),
            &[Category::Anime],
            &tags(&["action"]),
            &tags(&["thrilling", "epic", "intense", "cool"]),
        );
        assert_eq!(ids(&results), vec!["a1"]);
    }

    #[test]
    fn test_items_without_moods_never_match_mood_filter() {
        let results = search(&catalog(), &[Category::Anime], &tags(&["drama"]), &tags(&["fun"]));
        assert!(results.is_empty());
    }

    #[test]
    fn test_multiple_categories_merge_with_stable_ties() {
        let results = search(
            &catalog(),
            &[Category::Movies, Category::Anime],
            &tags(&["action", "comedy"]),
            &[],
        );
        // m1 and a2 both rate 7.0; m1 comes first because Movies was requested first
        assert_eq!(ids(&results), vec!["a3", "a1", "m1", "a2"]);
        assert_eq!(results[2].category, Category::Movies);
    }

    #[test]
    fn test_repeated_category_is_searched_once() {
        let results = search(&catalog(), &[Category::Movies, Category::Movies], &[], &[]);
        assert_eq!(ids(&results), vec!["m1"]);
    }

    #[test]
    fn test_category_without_catalog_yields_nothing() {
        let results = search(&catalog(), &[Category::Games], &[], &[]);
        assert!(results.is_empty());
    }

    #[test]
    fn test_matched_tags_reports_requested_order() {
        let declared = tags(&["Epic", "intense"]);
        let requested = tags(&["intense", "cool", "epic"]);
        let matched = matched_tags(&requested, &declared);
        assert_eq!(matched, vec!["intense", "epic"]);
    }
}
