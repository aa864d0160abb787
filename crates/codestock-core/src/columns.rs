//! Table and column conventions of the snippet store.
//!
//! Pure string constants. These name the columns the Gateway filters and
//! orders on; the remaining columns travel inside serialized rows.

/// Default table holding snippet rows.
pub const SNIPPETS_TABLE: &str = "snippets";

/// Projection meaning "every column".
pub const ALL: &str = "*";

pub const ID: &str = "id";
pub const SECTION: &str = "section";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";
