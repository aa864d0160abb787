use axum::Json;
use serde::Serialize;

use codestock_core::models::section::{ALL_SECTIONS, Section};

#[derive(Serialize)]
pub struct SectionEntry {
    id: &'static str,
    name: &'static str,
}

/// Sidebar entries: the `all` pseudo-section, then every known section.
pub async fn list_sections() -> Json<Vec<SectionEntry>> {
    let mut entries = vec![SectionEntry {
        id: ALL_SECTIONS,
        name: "すべて",
    }];
    entries.extend(Section::ALL.iter().map(|s| SectionEntry {
        id: s.label(),
        name: s.label(),
    }));
    Json(entries)
}
