//! Catalog browsing and search filtering.

use crate::editor::Direction;
use crate::types::CatalogItem;

/// The catalog as shown in the browse pane, narrowed by the search query.
#[derive(Debug, Clone, Default)]
pub struct CatalogView {
    items: Vec<CatalogItem>,
    query: String,
    /// Indices into `items` that match the query, in catalog order.
    visible: Vec<usize>,
    cursor: usize,
}

impl CatalogView {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        let mut view = Self {
            items,
            ..Self::default()
        };
        view.refilter();
        view
    }

    /// Replaces the catalog, keeping the query and clamping the cursor.
    pub fn set_items(&mut self, items: Vec<CatalogItem>) {
        self.items = items;
        self.refilter();
    }

    /// Every catalog item regardless of the query.
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn push_char(&mut self, ch: char) {
        self.query.push(ch);
        self.cursor = 0;
        self.refilter();
    }

    pub fn pop_char(&mut self) {
        if self.query.pop().is_some() {
            self.refilter();
        }
    }

    pub fn clear_query(&mut self) {
        if !self.query.is_empty() {
            self.query.clear();
            self.refilter();
        }
    }

    /// Items matching the query.
    pub fn visible(&self) -> impl Iterator<Item = &CatalogItem> {
        self.visible.iter().map(|&index| &self.items[index])
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Up => self.cursor = self.cursor.saturating_sub(1),
            Direction::Down => {
                if self.cursor + 1 < self.visible.len() {
                    self.cursor += 1;
                }
            }
        }
    }

    /// The item under the cursor, if any item is visible.
    pub fn selected(&self) -> Option<&CatalogItem> {
        self.visible
            .get(self.cursor)
            .map(|&index| &self.items[index])
    }

    fn refilter(&mut self) {
        let needle = self.query.trim().to_lowercase();
        self.visible = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| needle.is_empty() || matches(item, &needle))
            .map(|(index, _)| index)
            .collect();
        self.cursor = self.cursor.min(self.visible.len().saturating_sub(1));
    }
}

/// Case-insensitive substring match over name, category and tags.
fn matches(item: &CatalogItem, needle: &str) -> bool {
    item.name.to_lowercase().contains(needle)
        || item
            .category
            .as_deref()
            .is_some_and(|category| category.to_lowercase().contains(needle))
        || item
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemId;

    fn catalog() -> Vec<CatalogItem> {
        let mut etude = CatalogItem::new(ItemId::new("1").unwrap(), "Etude in C");
        etude.category = Some("Repertoire".to_string());
        let mut scales = CatalogItem::new(ItemId::new("2").unwrap(), "Major scales");
        scales.tags = vec!["warmup".to_string()];
        let arpeggios = CatalogItem::new(ItemId::new("3").unwrap(), "Arpeggios");
        vec![etude, scales, arpeggios]
    }

    fn visible_names(view: &CatalogView) -> Vec<&str> {
        view.visible().map(|item| item.name.as_str()).collect()
    }

    #[test]
    fn empty_query_shows_everything() {
        let view = CatalogView::new(catalog());
        assert_eq!(view.visible_len(), 3);
        assert_eq!(view.selected().unwrap().name, "Etude in C");
    }

    #[test]
    fn query_matches_name_category_and_tags() {
        let mut view = CatalogView::new(catalog());
        for ch in "WARM".chars() {
            view.push_char(ch);
        }
        assert_eq!(visible_names(&view), vec!["Major scales"]);

        view.clear_query();
        for ch in "reper".chars() {
            view.push_char(ch);
        }
        assert_eq!(visible_names(&view), vec!["Etude in C"]);
    }

    #[test]
    fn cursor_is_clamped_to_filtered_list() {
        let mut view = CatalogView::new(catalog());
        view.move_cursor(Direction::Down);
        view.move_cursor(Direction::Down);
        view.move_cursor(Direction::Down);
        assert_eq!(view.cursor(), 2);

        view.push_char('z');
        assert_eq!(view.visible_len(), 0);
        assert!(view.selected().is_none());

        view.pop_char();
        assert_eq!(view.visible_len(), 3);
        assert_eq!(view.cursor(), 0);
    }

    #[test]
    fn set_items_keeps_query() {
        let mut view = CatalogView::new(Vec::new());
        view.push_char('a');
        view.set_items(catalog());
        assert_eq!(view.query(), "a");
        assert_eq!(visible_names(&view), vec!["Major scales", "Arpeggios"]);
    }
}
