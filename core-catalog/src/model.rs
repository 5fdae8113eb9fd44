//! Catalog data model
//!
//! A [`SoundItem`] is immutable once fetched. Items are compared by
//! [`ItemKey`]: the catalog id when the catalog provides one, otherwise the
//! audio reference. Both are stable across refetches of the same clip.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{CatalogError, Result};

/// Catalog identifier. Catalogs use either numeric row ids or opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SoundId {
    Number(i64),
    Text(String),
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundId::Number(n) => write!(f, "{n}"),
            SoundId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for SoundId {
    fn from(id: i64) -> Self {
        SoundId::Number(id)
    }
}

impl From<&str> for SoundId {
    fn from(id: &str) -> Self {
        SoundId::Text(id.to_string())
    }
}

/// Identity of an item within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ItemKey {
    Id(SoundId),
    AudioRef(String),
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Id(id) => id.fmt(f),
            ItemKey::AudioRef(uri) => f.write_str(uri),
        }
    }
}

/// One playable clip in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundItem {
    pub id: Option<SoundId>,
    pub name: String,
    pub tags: Vec<String>,
    /// Absolute URI of the clip's audio
    pub audio_ref: String,
}

impl SoundItem {
    pub fn new(name: impl Into<String>, audio_ref: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            tags: Vec::new(),
            audio_ref: audio_ref.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<SoundId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn identity(&self) -> ItemKey {
        match &self.id {
            Some(id) => ItemKey::Id(id.clone()),
            None => ItemKey::AudioRef(self.audio_ref.clone()),
        }
    }

    /// Case-insensitive substring match over the name and each tag.
    /// `needle` must already be lowercase.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.name.to_lowercase().contains(needle)
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
    }
}

/// `ceil(total / page_size)`; zero when there is nothing to show.
pub fn page_count_for(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size)).min(u64::from(u32::MAX)) as u32
}

/// One page of catalog results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<SoundItem>,
    /// Matching items across all pages
    pub total: u64,
    /// Zero when nothing matched (or nothing could be fetched)
    pub page_count: u32,
    /// 1-based
    pub current_page: u32,
}

impl Page {
    /// No results: `page_count = 0`, `current_page = 1`.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page_count: 0,
            current_page: 1,
        }
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.page_count
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::empty()
    }
}

/// Append `incoming` to `items`, skipping anything whose identity is already
/// present. Order is preserved on both sides.
pub fn append_unique(items: &mut Vec<SoundItem>, incoming: Vec<SoundItem>) {
    let mut seen: HashSet<ItemKey> = items.iter().map(SoundItem::identity).collect();
    for item in incoming {
        if seen.insert(item.identity()) {
            items.push(item);
        }
    }
}

/// What to fetch: a 1-based page of a search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub page: u32,
    pub page_size: u32,
    pub term: String,
}

impl CatalogQuery {
    pub fn new(page: u32, page_size: u32, term: impl Into<String>) -> Self {
        Self {
            page,
            page_size,
            term: term.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(CatalogError::InvalidQuery("page numbers start at 1".to_string()));
        }
        if self.page_size == 0 {
            return Err(CatalogError::InvalidQuery(
                "page size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of items before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(name: &str) -> SoundItem {
        SoundItem::new(name, format!("http://localhost:5000/audio/{name}.ogg"))
    }

    #[test]
    fn identity_prefers_id_over_audio_ref() {
        let with_id = clip("rain").with_id(7);
        assert_eq!(with_id.identity(), ItemKey::Id(SoundId::Number(7)));
        assert_eq!(with_id.identity().to_string(), "7");

        let without_id = clip("rain");
        assert_eq!(
            without_id.identity(),
            ItemKey::AudioRef("http://localhost:5000/audio/rain.ogg".to_string())
        );
    }

    #[test]
    fn sound_id_accepts_numbers_and_strings() {
        let ids: Vec<SoundId> = serde_json::from_str(r#"[12, "abc-3"]"#).unwrap();
        assert_eq!(ids, vec![SoundId::Number(12), SoundId::Text("abc-3".into())]);
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count_for(0, 8), 0);
        assert_eq!(page_count_for(6, 8), 1);
        assert_eq!(page_count_for(8, 8), 1);
        assert_eq!(page_count_for(9, 8), 2);
        assert_eq!(page_count_for(9, 0), 0);
    }

    #[test]
    fn empty_page_shape() {
        let page = Page::empty();
        assert!(page.items.is_empty());
        assert_eq!(page.page_count, 0);
        assert_eq!(page.current_page, 1);
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn append_unique_skips_known_identities() {
        let mut items = vec![clip("a").with_id(1), clip("b").with_id(2)];
        append_unique(
            &mut items,
            vec![clip("b again").with_id(2), clip("c").with_id(3), clip("d")],
        );

        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn query_validation_and_offset() {
        assert!(CatalogQuery::new(0, 8, "").validate().is_err());
        assert!(CatalogQuery::new(1, 0, "").validate().is_err());

        let query = CatalogQuery::new(3, 8, "rain");
        assert!(query.validate().is_ok());
        assert_eq!(query.offset(), 16);
    }

    #[test]
    fn matching_is_case_insensitive_over_name_and_tags() {
        let item = clip("Cave Ambience").with_tags(["Ambient", "underground"]);
        assert!(item.matches_lowercase("cave"));
        assert!(item.matches_lowercase("ambi"));
        assert!(item.matches_lowercase("ground"));
        assert!(!item.matches_lowercase("rain"));
        assert!(item.matches_lowercase(""));
    }
}
