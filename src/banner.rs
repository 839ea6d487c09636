//! Startup banner

use colored::*;

use cg_core::RagStats;

const BANNER_WIDTH: usize = 60;

/// Component availability shown at startup
pub struct ComponentStatus<'a> {
    pub stats: &'a RagStats,
    pub store: &'a str,
    pub index: &'a str,
    pub bind: Option<&'a str>,
}

pub fn display_banner(status: &ComponentStatus<'_>) {
    let border = "─".repeat(BANNER_WIDTH);

    println!();
    println!("{}", format!("┌{}┐", border).blue());
    println!("  {}", "Career Guide - AI career counseling".blue().bold());
    println!("{}", format!("└{}┘", border).blue());

    print_component("Database", status.store, status.store == "sqlite");
    match &status.stats.generator {
        Some(name) => print_component("AI model", name, true),
        None => print_component("AI model", "not available - check API keys", false),
    }
    match &status.stats.embedder {
        Some(model) => print_component("Embeddings", model, true),
        None => print_component("Embeddings", "not available", false),
    }
    let index = format!("{} ({} chunks)", status.index, status.stats.indexed_chunks);
    print_component("Vector store", &index, status.stats.indexed_chunks > 0);

    if let Some(bind) = status.bind {
        println!();
        println!("{} Listening on {}", "🚀".green(), format!("http://{}", bind).bold());
    }
    println!();
}

fn print_component(label: &str, value: &str, healthy: bool) {
    let marker = if healthy { "✅".green() } else { "⚠️ ".yellow() };
    println!("  {} {:<13} {}", marker, format!("{}:", label), value);
}
