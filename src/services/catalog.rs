use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogRecord, Category, ContentItem},
};

/// Read-only access to the loaded catalogs
///
/// Partitions are immutable for the process lifetime, so lookups are synchronous.
pub trait CatalogStore: Send + Sync {
    /// Items of one category in load order; empty when the category has no catalog
    fn items_by_category(&self, category: Category) -> &[ContentItem];

    /// Categories that actually have items
    fn categories(&self) -> Vec<Category>;

    fn total_items(&self) -> usize {
        self.categories()
            .into_iter()
            .map(|c| self.items_by_category(c).len())
            .sum()
    }
}

/// Catalog partitions held in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    partitions: HashMap<Category, Vec<ContentItem>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from already-stamped items, keeping the first of any duplicate id
    pub fn from_items(items: impl IntoIterator<Item = ContentItem>) -> Self {
        let mut catalog = Self::new();
        for item in items {
            catalog.push(item);
        }
        catalog
    }

    fn push(&mut self, item: ContentItem) -> bool {
        let partition = self.partitions.entry(item.category).or_default();
        if partition.iter().any(|existing| existing.id == item.id) {
            return false;
        }
        partition.push(item);
        true
    }

    /// Loads every `<category>.json` found in `dir`
    ///
    /// A missing directory, unreadable file or malformed JSON is an error: the
    /// service must not start with a broken catalog. A category without a file
    /// simply has no items.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> AppResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(AppError::CatalogLoad(format!(
                "catalog directory '{}' does not exist",
                dir.display()
            )));
        }

        let mut catalog = Self::new();

        for category in Category::ALL {
            let path = dir.join(format!("{}.json", category.as_str()));
            if !path.exists() {
                tracing::debug!(category = %category, path = %path.display(), "No catalog file");
                continue;
            }

            let raw = std::fs::read_to_string(&path).map_err(|e| {
                AppError::CatalogLoad(format!("failed to read '{}': {}", path.display(), e))
            })?;
            let records: Vec<CatalogRecord> = serde_json::from_str(&raw).map_err(|e| {
                AppError::CatalogLoad(format!("malformed catalog '{}': {}", path.display(), e))
            })?;

            let mut seen = HashSet::new();
            let mut loaded = 0usize;
            for record in records {
                if !seen.insert(record.id.clone()) {
                    tracing::warn!(category = %category, id = %record.id, "Duplicate catalog id skipped");
                    continue;
                }
                if catalog.push(record.into_item(category)) {
                    loaded += 1;
                }
            }

            tracing::info!(category = %category, items = loaded, "Loaded catalog");
        }

        if catalog.partitions.values().all(Vec::is_empty) {
            return Err(AppError::CatalogLoad(format!(
                "no catalog entries found in '{}'",
                dir.display()
            )));
        }

        Ok(catalog)
    }
}

impl CatalogStore for InMemoryCatalog {
    fn items_by_category(&self, category: Category) -> &[ContentItem] {
        self.partitions
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| !self.items_by_category(*c).is_empty())
            .collect()
    }
}

/// Case-insensitive title search across catalogs
///
/// Exact matches first, then prefix matches, then substring matches; ties by title.
pub fn search_titles(
    catalog: &dyn CatalogStore,
    query: &str,
    category: Option<Category>,
    limit: usize,
) -> AppResult<Vec<ContentItem>> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Err(AppError::InvalidRequest(
            "Search query cannot be empty".to_string(),
        ));
    }

    let categories = match category {
        Some(c) => vec![c],
        None => Category::ALL.to_vec(),
    };

    let mut matches: Vec<(u8, String, &ContentItem)> = categories
        .into_iter()
        .flat_map(|c| catalog.items_by_category(c))
        .filter_map(|item| {
            let title = item.title.to_lowercase();
            let tier = if title == query {
                0
            } else if title.starts_with(&query) {
                1
            } else if title.contains(&query) {
                2
            } else {
                return None;
            };
            Some((tier, title, item))
        })
        .collect();

    matches.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    Ok(matches
        .into_iter()
        .take(limit)
        .map(|(_, _, item)| item.clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn item(id: &str, title: &str, category: Category) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            title: title.to_string(),
            category,
            genres: vec![],
            moods: vec![],
            rating: 5.0,
            description: String::new(),
        }
    }

    #[test]
    fn test_from_items_drops_duplicate_ids() {
        let catalog = InMemoryCatalog::from_items(vec![
            item("a1", "Ronin", Category::Anime),
            item("a1", "Ronin Again", Category::Anime),
            item("a1", "Ronin Movie", Category::Movies),
        ]);

        assert_eq!(catalog.items_by_category(Category::Anime).len(), 1);
        assert_eq!(catalog.items_by_category(Category::Anime)[0].title, "Ronin");
        // Ids are unique per category, not globally
        assert_eq!(catalog.items_by_category(Category::Movies).len(), 1);
        assert_eq!(catalog.total_items(), 2);
    }

    #[test]
    fn test_absent_category_is_empty() {
        let catalog = InMemoryCatalog::from_items(vec![item("a1", "Ronin", Category::Anime)]);
        assert!(catalog.items_by_category(Category::Games).is_empty());
        assert_eq!(catalog.categories(), vec![Category::Anime]);
    }

    #[test]
    fn test_load_from_dir_stamps_category() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("anime.json"),
            r#"[
                {"id": "a1", "title": "Ronin", "genres": ["action"], "mood": ["intense"], "rating": 8.5, "description": "A wandering swordsman."},
                {"id": "a2", "title": "Slice", "genres": ["comedy"], "mood": ["fun"], "rating": 7.0, "description": "Everyday life."},
                {"id": "a1", "title": "Ronin Dup", "genres": [], "mood": [], "rating": 1.0}
            ]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("web_series.json"),
            r#"[{"id": "w1", "title": "Signal", "genres": ["thriller"], "mood": ["dark"], "rating": 8.1}]"#,
        )
        .unwrap();

        let catalog = InMemoryCatalog::load_from_dir(dir.path()).unwrap();
        let anime = catalog.items_by_category(Category::Anime);
        assert_eq!(anime.len(), 2);
        assert_eq!(anime[0].id, "a1");
        assert_eq!(anime[0].moods, vec!["intense".to_string()]);
        assert!(anime.iter().all(|i| i.category == Category::Anime));

        let series = catalog.items_by_category(Category::WebSeries);
        assert_eq!(series[0].category, Category::WebSeries);
    }

    #[test]
    fn test_load_from_missing_dir_fails() {
        let result = InMemoryCatalog::load_from_dir("/definitely/not/here");
        assert!(matches!(result, Err(AppError::CatalogLoad(_))));
    }

    #[test]
    fn test_load_malformed_catalog_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("anime.json"), "{ not json").unwrap();

        let result = InMemoryCatalog::load_from_dir(dir.path());
        assert!(matches!(result, Err(AppError::CatalogLoad(_))));
    }

    #[test]
    fn test_load_empty_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = InMemoryCatalog::load_from_dir(dir.path());
        assert!(matches!(result, Err(AppError::CatalogLoad(_))));
    }

    #[test]
    fn test_search_titles_orders_exact_prefix_contains() {
        let catalog = InMemoryCatalog::from_items(vec![
            item("a1", "Monster Hunter Stories", Category::Anime),
            item("a2", "Monster", Category::Anime),
            item("m1", "Little Monster", Category::Movies),
            item("g1", "Monster Hunter", Category::Games),
            item("g2", "Tetris", Category::Games),
        ]);

        let results = search_titles(&catalog, "monster", None, 10).unwrap();
        let titles: Vec<&str> = results.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Monster", "Monster Hunter", "Monster Hunter Stories", "Little Monster"]
        );

        let games = search_titles(&catalog, "MONSTER", Some(Category::Games), 10).unwrap();
        assert_eq!(games.len(), 1);

        let limited = search_titles(&catalog, "monster", None, 2).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_search_titles_rejects_empty_query() {
        let catalog = InMemoryCatalog::new();
        let result = search_titles(&catalog, "   ", None, 10);
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }
}
