//! Shared types that mirror the Wadoku XML dump and the documents built from it.
//!
//! [`ParsedEntry`] keeps the fields of one `<entry>` element as they were read:
//! orthographic forms with their `midashigo` flag, reading pairs, category
//! markers and the raw translation fragments of every sense group.
//! [`OutputEntry`] is the reshaped, persisted document.
//!
//! Grammatical categories form a closed enumeration ([`Category`]). The dump
//! encodes them as empty marker elements inside `<gramGrp>`; those are
//! collected into a [`CategoryMarkers`] set and decoded with
//! [`CategoryMarkers::resolve`], which applies a fixed priority order.
//!
//! ```rust
//! use wadoku_types::{Category, CategoryMarkers};
//!
//! let mut markers = CategoryMarkers::default();
//! markers.insert(Category::from_tag("meishi").unwrap());
//! markers.insert(Category::Kanji);
//! assert_eq!(markers.resolve(), Category::Kanji);
//! ```

use std::fmt;

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

/// Grammatical category of an entry, plus `Undefined` for entries without one.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Undefined,
    Daimeishi,
    Doushi,
    Fukujoshi,
    Fukushi,
    Jodoushi,
    Jokeiyoushi,
    Joshi,
    Kakarijoshi,
    Kandoushi,
    Kanji,
    Keiyoudoushi,
    Keiyoushi,
    Meishi,
    Prefix,
    Rengo,
    Rentaishi,
    Setsuzokushi,
    Shuujoshi,
    Specialcharacter,
    Suffix,
    Wordcomponent,
}

impl Category {
    /// Order in which markers are checked; the first one present wins.
    pub const PRIORITY: [Category; 21] = [
        Category::Daimeishi,
        Category::Doushi,
        Category::Fukujoshi,
        Category::Fukushi,
        Category::Jodoushi,
        Category::Jokeiyoushi,
        Category::Joshi,
        Category::Kakarijoshi,
        Category::Kandoushi,
        Category::Kanji,
        Category::Keiyoudoushi,
        Category::Keiyoushi,
        Category::Meishi,
        Category::Prefix,
        Category::Rengo,
        Category::Rentaishi,
        Category::Setsuzokushi,
        Category::Shuujoshi,
        Category::Specialcharacter,
        Category::Suffix,
        Category::Wordcomponent,
    ];

    /// Decode a `<gramGrp>` marker element name.
    ///
    /// `Undefined` has no marker element, so it is never returned.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|c| c.tag() == tag)
    }

    /// Element name used in the dump (and the persisted name).
    pub fn tag(self) -> &'static str {
        match self {
            Category::Undefined => "undefined",
            Category::Daimeishi => "daimeishi",
            Category::Doushi => "doushi",
            Category::Fukujoshi => "fukujoshi",
            Category::Fukushi => "fukushi",
            Category::Jodoushi => "jodoushi",
            Category::Jokeiyoushi => "jokeiyoushi",
            Category::Joshi => "joshi",
            Category::Kakarijoshi => "kakarijoshi",
            Category::Kandoushi => "kandoushi",
            Category::Kanji => "kanji",
            Category::Keiyoudoushi => "keiyoudoushi",
            Category::Keiyoushi => "keiyoushi",
            Category::Meishi => "meishi",
            Category::Prefix => "prefix",
            Category::Rengo => "rengo",
            Category::Rentaishi => "rentaishi",
            Category::Setsuzokushi => "setsuzokushi",
            Category::Shuujoshi => "shuujoshi",
            Category::Specialcharacter => "specialcharacter",
            Category::Suffix => "suffix",
            Category::Wordcomponent => "wordcomponent",
        }
    }

    /// Numeric code: `Undefined` is 0, the markers follow alphabetically from 1.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

type MarkerBits = BitArr!(for 22, in u32, Lsb0);

/// Set of category markers found in one `<gramGrp>`.
///
/// Well-formed entries carry at most one marker.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CategoryMarkers {
    bits: MarkerBits,
}

impl CategoryMarkers {
    pub fn insert(&mut self, category: Category) {
        if category != Category::Undefined {
            self.bits.set(category.code() as usize, true);
        }
    }

    pub fn contains(&self, category: Category) -> bool {
        self.bits[category.code() as usize]
    }

    /// Number of markers set.
    pub fn len(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// More than one marker set: malformed input, resolved by priority.
    pub fn is_ambiguous(&self) -> bool {
        self.len() > 1
    }

    /// Select exactly one category, walking [`Category::PRIORITY`].
    pub fn resolve(&self) -> Category {
        Category::PRIORITY
            .into_iter()
            .find(|c| self.contains(*c))
            .unwrap_or(Category::Undefined)
    }
}

impl FromIterator<Category> for CategoryMarkers {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut markers = Self::default();
        for category in iter {
            markers.insert(category);
        }
        markers
    }
}

/// One `<orth>` element.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Orthography {
    pub text: String,
    /// Headword duplicate; excluded from output.
    pub midashigo: bool,
}

/// One `<reading>` element with its `<hira>` and `<hatsuon>` children.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReadingRecord {
    pub hiragana: String,
    pub hatsuon: String,
}

/// One `<sense>` group; fragments hold the raw inner markup of each `<tr>`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Sense {
    pub translations: Vec<String>,
}

/// An `<entry>` as read from the dump.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParsedEntry {
    pub id: i64,
    pub orthography: Vec<Orthography>,
    pub readings: Vec<ReadingRecord>,
    pub markers: CategoryMarkers,
    pub senses: Vec<Sense>,
}

/// Normalized reading pair as persisted.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub hiragana: String,
    pub hatsuon: String,
}

/// Persisted dictionary document. `id` is the collection's unique key.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OutputEntry {
    pub id: i64,
    pub category: Category,
    pub orthography: Vec<String>,
    pub reading: Vec<Reading>,
    pub translation: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_by_priority_not_insertion_order() {
        let markers: CategoryMarkers = [Category::Meishi, Category::Kanji].into_iter().collect();
        assert!(markers.is_ambiguous());
        assert_eq!(markers.resolve(), Category::Kanji);

        let markers: CategoryMarkers = [Category::Wordcomponent, Category::Daimeishi]
            .into_iter()
            .collect();
        assert_eq!(markers.resolve(), Category::Daimeishi);
    }

    #[test]
    fn empty_markers_resolve_to_undefined() {
        let markers = CategoryMarkers::default();
        assert!(markers.is_empty());
        assert_eq!(markers.resolve(), Category::Undefined);
    }

    #[test]
    fn every_marker_resolves_to_itself() {
        for category in Category::PRIORITY {
            let mut markers = CategoryMarkers::default();
            markers.insert(category);
            assert_eq!(markers.len(), 1);
            assert_eq!(markers.resolve(), category);
        }
    }

    #[test]
    fn undefined_is_not_a_marker() {
        let mut markers = CategoryMarkers::default();
        markers.insert(Category::Undefined);
        assert!(markers.is_empty());
        assert_eq!(Category::from_tag("undefined"), None);
    }

    #[test]
    fn tags_and_codes() {
        assert_eq!(Category::from_tag("specialcharacter"), Some(Category::Specialcharacter));
        assert_eq!(Category::from_tag("gramGrp"), None);
        assert_eq!(Category::Undefined.code(), 0);
        assert_eq!(Category::Daimeishi.code(), 1);
        assert_eq!(Category::Wordcomponent.code(), 21);
        assert_eq!(Category::Keiyoudoushi.to_string(), "keiyoudoushi");
    }

    #[test]
    fn serializes_category_by_name() {
        let json = serde_json::to_string(&Category::Specialcharacter).unwrap();
        assert_eq!(json, "\"specialcharacter\"");
        let back: Category = serde_json::from_str("\"undefined\"").unwrap();
        assert_eq!(back, Category::Undefined);
    }
}
