//! Subcommand handlers. Rendering is kept separate from printing so it can be tested.

use anyhow::Result;
use futures::future::try_join_all;
use modhub::domain::metadata::{FeatureMetadata, FeatureStats};
use modhub::kernel::FeatureManager;
use std::fmt::Write as _;
use std::time::Duration;

pub(crate) fn list(manager: &FeatureManager, tag: Option<&str>) -> Result<String> {
    let registry = manager.registry();
    let features = tag.map_or_else(|| registry.all_metadata(), |tag| registry.by_tag(tag));
    render_list(manager, &features)
}

pub(crate) async fn load(manager: &FeatureManager, features: &[String], timeout: Option<Duration>) -> Result<String> {
    match timeout {
        Some(limit) => {
            let loads = features.iter().map(|feature| manager.ensure_loaded_within(feature, limit));
            try_join_all(loads).await?;
        },
        None => manager.preload(features).await?,
    }
    Ok(format!("loaded: {}\n", manager.loaded().join(", ")))
}

pub(crate) fn stats(manager: &FeatureManager, json: bool) -> Result<String> {
    let stats = manager.stats();
    if json {
        return Ok(serde_json::to_string_pretty(&stats)? + "\n");
    }
    render_stats(&stats)
}

fn render_list(manager: &FeatureManager, features: &[FeatureMetadata]) -> Result<String> {
    let mut out = String::new();
    for meta in features {
        let dependencies =
            if meta.dependencies.is_empty() { "-".to_owned() } else { meta.dependencies.join(",") };
        writeln!(
            out,
            "{:<12} {:<10} {:<8} deps: {:<16} tags: {}",
            meta.name,
            manager.status(&meta.name),
            meta.version.as_deref().unwrap_or("-"),
            dependencies,
            meta.tags.join(","),
        )?;
    }
    Ok(out)
}

fn render_stats(stats: &FeatureStats) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "registered ({}): {}", stats.registered_count(), stats.registered.join(", "))?;
    writeln!(out, "loaded     ({}): {}", stats.loaded_count(), stats.loaded.join(", "))?;
    writeln!(out, "loading    ({}): {}", stats.loading_count(), stats.loading.join(", "))?;
    writeln!(out, "pending    ({}): {}", stats.pending().len(), stats.pending().join(", "))?;
    Ok(out)
}
