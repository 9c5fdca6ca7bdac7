use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tagwall_core::{MetadataCache, StoreImpl, TagLearningStore, WallConfig};

pub fn report(settings_path: &Path, db_path: &Path, wall: &WallConfig) -> Result<()> {
    println!(
        "settings: {} ({})",
        settings_path.display(),
        if settings_path.exists() { "present" } else { "defaults" }
    );
    println!("origin: {}", if wall.origin.is_empty() { "-" } else { &wall.origin });
    println!(
        "fill: target {} | pages {} | items {} | concurrency {}",
        wall.target_visible, wall.max_fill_pages, wall.max_merged_items, wall.fetch_concurrency
    );

    let existed = db_path.exists();
    println!("db: {} ({})", db_path.display(), if existed { "present" } else { "new" });
    if let Some(dir) = db_path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let store = match StoreImpl::new(db_path) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            println!("db open: failed ({e})");
            return Ok(());
        }
    };
    let status = store.migration_status()?;
    println!(
        "migrations: current {} | latest {} | pending {}",
        status.current,
        status.latest,
        if status.pending.is_empty() { "-".to_string() } else { status.pending.join(", ") }
    );

    let contexts = TagLearningStore::new(store.clone()).contexts()?;
    println!("tag contexts: {}", contexts.len());

    let stats = MetadataCache::new(store, wall.cache_ttl()).stats()?;
    println!(
        "metadata cache: {} entries ({} fresh, {} stale, {} negative) | ttl {}d",
        stats.total,
        stats.fresh,
        stats.stale,
        stats.negative,
        wall.cache_ttl().whole_days()
    );
    Ok(())
}
