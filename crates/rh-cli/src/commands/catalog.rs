//! Catalog command: `rh catalog list` and `rh catalog add`.

use anyhow::{Context, Result};
use rh_core::{CatalogItem, Store};
use rh_db::Database;

use super::{render_lines, truncate};

const NAME_WIDTH: usize = 24;
const CATEGORY_WIDTH: usize = 14;

/// Format catalog items for human-readable output.
pub fn format_catalog(items: &[CatalogItem]) -> String {
    let mut lines = Vec::new();
    if items.is_empty() {
        lines.push("No catalog items.".to_string());
        lines.push(String::new());
        lines.push("Hint: Run 'rh catalog add <name>' to add one.".to_string());
        return render_lines(&lines);
    }

    lines.push(format!("CATALOG ({} items)", items.len()));
    lines.push(String::new());
    lines.push(format!(
        "{:<NAME_WIDTH$}  {:<CATEGORY_WIDTH$}  {:>4}  Tags",
        "Name", "Category", "Used"
    ));
    lines.push(format!(
        "{}  {}  {}  {}",
        "─".repeat(NAME_WIDTH),
        "─".repeat(CATEGORY_WIDTH),
        "─".repeat(4),
        "─".repeat(16)
    ));
    for item in items {
        lines.push(format!(
            "{:<NAME_WIDTH$}  {:<CATEGORY_WIDTH$}  {:>4}  {}",
            truncate(&item.name, NAME_WIDTH),
            truncate(item.category.as_deref().unwrap_or("-"), CATEGORY_WIDTH),
            item.usage_count.unwrap_or(0),
            item.tags.join(", ")
        ));
    }
    render_lines(&lines)
}

/// Format catalog items as JSON.
pub fn format_catalog_json(items: &[CatalogItem]) -> Result<String> {
    Ok(serde_json::to_string_pretty(items)?)
}

/// Runs `rh catalog list`.
pub async fn list<S: Store>(store: &S, json: bool) -> Result<String> {
    let items = store
        .list_catalog_items()
        .await
        .context("failed to list catalog items")?;
    if json {
        Ok(format_catalog_json(&items)? + "\n")
    } else {
        Ok(format_catalog(&items))
    }
}

/// Runs `rh catalog add`.
pub fn add(
    db: &mut Database,
    name: &str,
    category: Option<&str>,
    tags: &[String],
) -> Result<String> {
    let item = db
        .add_catalog_item(name, category, tags)
        .context("failed to add catalog item")?;
    tracing::info!(item = %item.id, name = %item.name, "catalog item added");
    Ok(format!("Added '{}' ({})\n", item.name, item.id))
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use rh_core::{ItemId, MemoryStore};

    use super::*;

    fn catalog() -> Vec<CatalogItem> {
        let mut etude = CatalogItem::new(ItemId::new("item-1").unwrap(), "Etude in C");
        etude.category = Some("Repertoire".to_string());
        etude.tags = vec!["exam".to_string()];
        etude.usage_count = Some(2);
        let mut scales = CatalogItem::new(ItemId::new("item-2").unwrap(), "Major scales");
        scales.category = Some("Technique".to_string());
        scales.tags = vec!["daily".to_string(), "warmup".to_string()];
        let long = CatalogItem::new(
            ItemId::new("item-3").unwrap(),
            "Variations on a theme by Paganini",
        );
        vec![etude, scales, long]
    }

    #[test]
    fn empty_catalog_shows_hint() {
        assert_snapshot!(format_catalog(&[]), @r"
        No catalog items.

        Hint: Run 'rh catalog add <name>' to add one.
        ");
    }

    #[test]
    fn catalog_table() {
        assert_snapshot!(format_catalog(&catalog()), @r"
        CATALOG (3 items)

        Name                      Category        Used  Tags
        ────────────────────────  ──────────────  ────  ────────────────
        Etude in C                Repertoire         2  exam
        Major scales              Technique          0  daily, warmup
        Variations on a theme...  -                  0
        ");
    }

    #[tokio::test]
    async fn list_json_reads_from_store() {
        let store = MemoryStore::with_catalog(catalog().into_iter().take(1));
        let output = list(&store, true).await.unwrap();
        assert_snapshot!(output, @r#"
        [
          {
            "id": "item-1",
            "name": "Etude in C",
            "category": "Repertoire",
            "tags": [
              "exam"
            ],
            "usage_count": 2
          }
        ]
        "#);
    }

    #[test]
    fn add_reports_new_item() {
        let mut db = Database::open_in_memory().unwrap();
        let output = add(&mut db, "Scales", None, &["warmup".to_string()]).unwrap();
        assert!(output.starts_with("Added 'Scales' ("));
        assert_eq!(db.list_catalog_items().unwrap()[0].tags, vec!["warmup"]);
    }
}
