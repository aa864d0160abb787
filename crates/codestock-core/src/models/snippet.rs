use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::section::SectionBucket;

/// A stored, reusable front-end code sample.
///
/// This is the read shape: rows coming back from the store may carry extra
/// legacy columns, which are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Snippet {
    pub id: Uuid,
    pub title: String,
    pub section: String,
    pub company_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[ts(type = "Array<string>")]
    pub tags: Vec<String>,
    /// Combined markup/style/script body.
    #[serde(rename = "js_code", default)]
    pub code: Option<String>,
    /// Remote URL or inline `data:` URL.
    #[serde(default)]
    pub preview_image_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub gist_url: Option<String>,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}

impl Snippet {
    pub fn section_bucket(&self) -> SectionBucket {
        SectionBucket::classify(&self.section)
    }
}

/// Body of a create request. Server-assigned columns are not accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct NewSnippet {
    pub title: String,
    pub section: String,
    pub company_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "js_code", default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gist_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl NewSnippet {
    /// Reject blank required fields. Values are stored exactly as submitted.
    pub fn into_validated(self) -> Result<Self, CoreError> {
        required("title", &self.title)?;
        required("section", &self.section)?;
        required("company_name", &self.company_name)?;
        Ok(self)
    }
}

/// Body of a partial update. Absent fields are left untouched; an explicit
/// `null` on an optional column clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct SnippetPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(
        rename = "js_code",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional, type = "string | null")]
    pub code: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[ts(optional, type = "string | null")]
    pub preview_image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[ts(optional, type = "string | null")]
    pub github_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[ts(optional, type = "string | null")]
    pub gist_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[ts(optional, type = "string | null")]
    pub public_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[ts(optional, type = "string | null")]
    pub memo: Option<Option<String>>,
}

impl SnippetPatch {
    /// No field present. A field set to `null` counts as present.
    pub fn is_empty(&self) -> bool {
        *self == SnippetPatch::default()
    }

    /// Reject an empty patch and blank required fields.
    pub fn into_validated(self) -> Result<Self, CoreError> {
        if self.is_empty() {
            return Err(CoreError::EmptyPatch);
        }
        if let Some(title) = &self.title {
            required("title", title)?;
        }
        if let Some(section) = &self.section {
            required("section", section)?;
        }
        if let Some(company_name) = &self.company_name {
            required("company_name", company_name)?;
        }
        Ok(self)
    }
}

/// Parse a path id. Anything that is not a UUID cannot name a stored row.
pub fn parse_id(raw: &str) -> Result<Uuid, CoreError> {
    Ok(Uuid::parse_str(raw.trim())?)
}

fn required(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::MissingField(field.to_string()));
    }
    Ok(())
}

/// Distinguish an explicit `null` (`Some(None)`) from an absent field
/// (`None`, via `#[serde(default)]`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
