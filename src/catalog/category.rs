//! Download categories and their file rules
//!
//! The category enum only carries identity. Everything about how files of a
//! category are found and titled lives in the [`CATEGORY_RULES`] table, keyed
//! by the category tag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::CatalogError;

// ============================================================================
// Download Category
// ============================================================================

/// Closed set of downloadable file categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadCategory {
    Map,
    Road,
    Wiki,
    Travel,
    Srtm,
    Hillshade,
    Slope,
    Heightmap,
    Font,
    Voice,
    Depth,
}

impl DownloadCategory {
    /// All categories in catalog build order
    pub fn all() -> [Self; 11] {
        [
            Self::Map,
            Self::Voice,
            Self::Font,
            Self::Depth,
            Self::Wiki,
            Self::Travel,
            Self::Road,
            Self::Srtm,
            Self::Hillshade,
            Self::Slope,
            Self::Heightmap,
        ]
    }

    /// Stable tag used in documents and lookup tables
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::Road => "road",
            Self::Wiki => "wiki",
            Self::Travel => "travel",
            Self::Srtm => "srtm",
            Self::Hillshade => "hillshade",
            Self::Slope => "slope",
            Self::Heightmap => "heightmap",
            Self::Font => "font",
            Self::Voice => "voice",
            Self::Depth => "depth",
        }
    }

    /// File rules for this category
    pub fn rule(&self) -> &'static CategoryRule {
        rule_for(self.tag()).unwrap_or(&CATEGORY_RULES[0])
    }
}

impl fmt::Display for DownloadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for DownloadCategory {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|c| c.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| CatalogError::UnknownCategory(s.to_string()))
    }
}

// ============================================================================
// Category Rules
// ============================================================================

/// How files of one category are located, accepted and titled
#[derive(Debug)]
pub struct CategoryRule {
    /// Category tag this rule belongs to
    pub tag: &'static str,

    /// Directories (relative to the files root) scanned for this category
    pub dirs: &'static [&'static str],

    /// File name suffixes accepted for this category
    pub suffixes: &'static [&'static str],

    /// Default title; `{name}` is the readable region name, `{unit}` the contour unit
    pub title: &'static str,
}

const OBF_SUFFIXES: &[&str] = &[".obf.zip", ".obf", ".extra.zip"];

/// Rule table, one row per category tag
pub static CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        tag: "map",
        dirs: &[".", "indexes"],
        suffixes: OBF_SUFFIXES,
        title: "Map, Roads, POI, Transport, Address data for {name}",
    },
    CategoryRule {
        tag: "voice",
        dirs: &["indexes"],
        suffixes: &[".voice.zip"],
        title: "Voice package: {name}",
    },
    CategoryRule {
        tag: "font",
        dirs: &["indexes/fonts"],
        suffixes: &[".otf.zip"],
        title: "Fonts {name}",
    },
    CategoryRule {
        tag: "depth",
        dirs: &["indexes/inapp/depth", "depth"],
        suffixes: OBF_SUFFIXES,
        title: "Depth maps for {name}",
    },
    CategoryRule {
        tag: "wiki",
        dirs: &["wiki"],
        suffixes: OBF_SUFFIXES,
        title: "Wikipedia POI data for {name}",
    },
    CategoryRule {
        tag: "travel",
        dirs: &["travel"],
        suffixes: &[".travel.obf.zip", ".travel.obf"],
        title: "Travel for {name}",
    },
    CategoryRule {
        tag: "road",
        dirs: &["road-indexes"],
        suffixes: OBF_SUFFIXES,
        title: "Roads, POI, Address data for {name}",
    },
    CategoryRule {
        tag: "srtm",
        dirs: &["srtm-countries"],
        suffixes: OBF_SUFFIXES,
        title: "Contour lines ({unit}) for {name}",
    },
    CategoryRule {
        tag: "hillshade",
        dirs: &["hillshade"],
        suffixes: &[".sqlitedb"],
        title: "{name}",
    },
    CategoryRule {
        tag: "slope",
        dirs: &["slope"],
        suffixes: &[".sqlitedb"],
        title: "{name}",
    },
    CategoryRule {
        tag: "heightmap",
        dirs: &["heightmap"],
        suffixes: &[".sqlite"],
        title: "{name}",
    },
];

/// Look up a rule by category tag
pub fn rule_for(tag: &str) -> Option<&'static CategoryRule> {
    CATEGORY_RULES.iter().find(|r| r.tag == tag)
}

impl CategoryRule {
    /// Check whether a file name belongs to this category
    pub fn accepts(&self, file_name: &str) -> bool {
        self.suffixes.iter().any(|s| file_name.ends_with(s))
    }

    /// Render the default title for a readable name and the file extension
    pub fn default_title(&self, readable_name: &str, ext: &str) -> String {
        let unit = if ext.contains("srtmf") { "feet" } else { "meters" };
        self.title
            .replace("{unit}", unit)
            .replace("{name}", readable_name)
    }
}

/// Split a file name at its first `.` into the base name and the extension
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.find('.') {
        Some(idx) => (&file_name[..idx], &file_name[idx + 1..]),
        None => (file_name, ""),
    }
}

/// Turn a file name into the human-readable region name used in titles
///
/// `Germany_europe_2.obf.zip` becomes `Germany europe`.
pub fn readable_name(file_name: &str) -> String {
    let (base, _) = split_extension(file_name);
    let base = base
        .strip_suffix("_ext_2")
        .or_else(|| base.strip_suffix("_2"))
        .unwrap_or(base);
    base.replace('_', " ")
}
