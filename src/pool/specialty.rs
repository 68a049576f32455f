//! Traffic specialties
//!
//! Mirrors are weighted per specialty. A specialty groups the request
//! parameters and catalog categories that share one mirror table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::SettingsError;
use crate::catalog::DownloadCategory;

/// Traffic class with its own mirror weight table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specialty {
    Main,
    Srtm,
    Hillshade,
    Slope,
    Heightmap,
    #[serde(rename = "osmlive")]
    OsmLive,
    Depth,
    Wiki,
    Roads,
}

/// Request parameters and categories served by one specialty
#[derive(Debug)]
pub struct SpecialtyRule {
    pub specialty: Specialty,
    pub params: &'static [&'static str],
    pub categories: &'static [DownloadCategory],
}

/// Specialty table; lookups by category take the first matching row
pub static SPECIALTY_RULES: &[SpecialtyRule] = &[
    SpecialtyRule {
        specialty: Specialty::Main,
        params: &[],
        categories: &[DownloadCategory::Voice, DownloadCategory::Font, DownloadCategory::Map],
    },
    SpecialtyRule {
        specialty: Specialty::Srtm,
        params: &["srtmcountry"],
        categories: &[DownloadCategory::Srtm],
    },
    SpecialtyRule {
        specialty: Specialty::Hillshade,
        params: &["hillshade"],
        categories: &[DownloadCategory::Hillshade],
    },
    SpecialtyRule {
        specialty: Specialty::Slope,
        params: &["slope"],
        categories: &[DownloadCategory::Slope],
    },
    SpecialtyRule {
        specialty: Specialty::Heightmap,
        params: &["heightmap"],
        categories: &[DownloadCategory::Heightmap],
    },
    SpecialtyRule {
        specialty: Specialty::OsmLive,
        params: &["aosmc", "osmc"],
        categories: &[DownloadCategory::Map],
    },
    SpecialtyRule {
        specialty: Specialty::Depth,
        params: &["depth"],
        categories: &[DownloadCategory::Depth],
    },
    SpecialtyRule {
        specialty: Specialty::Wiki,
        params: &["wikivoyage", "wiki", "travel"],
        categories: &[DownloadCategory::Wiki, DownloadCategory::Travel],
    },
    SpecialtyRule {
        specialty: Specialty::Roads,
        params: &["road"],
        categories: &[DownloadCategory::Road],
    },
];

impl Specialty {
    /// All specialties in table order
    pub fn all() -> impl Iterator<Item = Self> {
        SPECIALTY_RULES.iter().map(|r| r.specialty)
    }

    /// Stable tag used in settings documents
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Srtm => "srtm",
            Self::Hillshade => "hillshade",
            Self::Slope => "slope",
            Self::Heightmap => "heightmap",
            Self::OsmLive => "osmlive",
            Self::Depth => "depth",
            Self::Wiki => "wiki",
            Self::Roads => "roads",
        }
    }

    /// Table row for this specialty
    pub fn rule(&self) -> &'static SpecialtyRule {
        SPECIALTY_RULES
            .iter()
            .find(|r| r.specialty == *self)
            .unwrap_or(&SPECIALTY_RULES[0])
    }

    /// Request parameter that selects this specialty on a mirror, if any
    pub fn request_param(&self) -> Option<&'static str> {
        self.rule().params.first().copied()
    }
}

/// Specialty serving a catalog category
pub fn specialty_for(category: DownloadCategory) -> Specialty {
    SPECIALTY_RULES
        .iter()
        .find(|r| r.categories.contains(&category))
        .map_or(Specialty::Main, |r| r.specialty)
}

impl fmt::Display for Specialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for Specialty {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .find(|sp| sp.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| SettingsError::Invalid(vec![format!("unknown specialty '{s}'")]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specialty_for_category() {
        assert_eq!(specialty_for(DownloadCategory::Map), Specialty::Main);
        assert_eq!(specialty_for(DownloadCategory::Voice), Specialty::Main);
        assert_eq!(specialty_for(DownloadCategory::Travel), Specialty::Wiki);
        assert_eq!(specialty_for(DownloadCategory::Srtm), Specialty::Srtm);
        assert_eq!(specialty_for(DownloadCategory::Road), Specialty::Roads);
    }

    #[test]
    fn test_every_category_has_a_specialty() {
        for category in DownloadCategory::all() {
            let specialty = specialty_for(category);
            assert!(specialty.rule().categories.contains(&category));
        }
    }

    #[test]
    fn test_request_param() {
        assert_eq!(Specialty::Main.request_param(), None);
        assert_eq!(Specialty::Wiki.request_param(), Some("wikivoyage"));
        assert_eq!(Specialty::Srtm.request_param(), Some("srtmcountry"));
    }

    #[test]
    fn test_specialty_from_str() {
        assert_eq!("osmlive".parse::<Specialty>().unwrap(), Specialty::OsmLive);
        assert_eq!("Roads".parse::<Specialty>().unwrap(), Specialty::Roads);
        assert!("tiles".parse::<Specialty>().is_err());
    }
}
