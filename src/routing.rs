//! Serve-or-redirect decision for download requests
//!
//! A request carries one location flag (`srtm`, `wiki`, `fonts`, ...). The
//! flags also classify the request: some traffic must always go to the main
//! pool, some must always be served here, the rest may be spread over the
//! help pool as well.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::pool::{DownloadSettings, RandomSource};

// ============================================================================
// Request Flags
// ============================================================================

/// Location flag of a download request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestFlag {
    Srtm,
    SrtmCountry,
    Road,
    Osmc,
    Aosmc,
    Wiki,
    Hillshade,
    Inapp,
    Wikivoyage,
    Fonts,
    Standard,
}

/// How a request may be routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    /// Redirect only to the main pool
    MustMain,
    /// Never redirect
    LocalOnly,
    /// Help or main pool
    General,
}

impl RequestFlag {
    /// Flags in resolution priority order
    pub const ALL: [Self; 11] = [
        Self::Srtm,
        Self::SrtmCountry,
        Self::Road,
        Self::Osmc,
        Self::Aosmc,
        Self::Wiki,
        Self::Hillshade,
        Self::Inapp,
        Self::Wikivoyage,
        Self::Fonts,
        Self::Standard,
    ];

    /// Query parameter name
    pub fn param(&self) -> &'static str {
        match self {
            Self::Srtm => "srtm",
            Self::SrtmCountry => "srtmcountry",
            Self::Road => "road",
            Self::Osmc => "osmc",
            Self::Aosmc => "aosmc",
            Self::Wiki => "wiki",
            Self::Hillshade => "hillshade",
            Self::Inapp => "inapp",
            Self::Wikivoyage => "wikivoyage",
            Self::Fonts => "fonts",
            Self::Standard => "standard",
        }
    }

    /// Routing class this flag imposes
    pub fn class(&self) -> RequestClass {
        match self {
            Self::SrtmCountry | Self::Hillshade => RequestClass::MustMain,
            Self::Fonts | Self::Inapp => RequestClass::LocalOnly,
            _ => RequestClass::General,
        }
    }

    /// Look up a flag by parameter name
    pub fn from_param(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.param() == name)
    }
}

impl fmt::Display for RequestFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.param())
    }
}

/// A flag value counts when empty, `yes` or `true`
fn is_set(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("yes") || value.eq_ignore_ascii_case("true")
}

// ============================================================================
// Download Query
// ============================================================================

/// Parsed query string of a download request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadQuery {
    /// Requested file name
    pub file: Option<String>,

    /// Flags present on the request with any value, in priority order
    pub flags: Vec<RequestFlag>,

    /// Flags whose value is empty, `yes` or `true`; these drive routing
    pub enabled: Vec<RequestFlag>,

    /// `self=true`: the client asks not to be redirected
    pub self_requested: bool,
}

impl DownloadQuery {
    /// Parse a raw (still percent-encoded) query string
    pub fn parse(raw: &str) -> Self {
        let mut file = None;
        let mut present = Vec::new();
        let mut set = Vec::new();
        let mut self_requested = false;

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "file" if file.is_none() => file = Some(value.into_owned()),
                "self" => self_requested |= value.eq_ignore_ascii_case("true"),
                other => {
                    if let Some(flag) = RequestFlag::from_param(other) {
                        present.push(flag);
                        if is_set(&value) {
                            set.push(flag);
                        }
                    }
                }
            }
        }

        let in_order = |found: &[RequestFlag]| {
            RequestFlag::ALL
                .into_iter()
                .filter(|f| found.contains(f))
                .collect::<Vec<_>>()
        };

        Self {
            file,
            flags: in_order(&present),
            enabled: in_order(&set),
            self_requested,
        }
    }

    /// Flag used to locate the file
    pub fn flag(&self) -> Option<RequestFlag> {
        self.flags.first().copied()
    }

    /// Routing class from enabled flags; a local-only flag wins over a main-only one
    pub fn class(&self) -> RequestClass {
        let has = |class| self.enabled.iter().any(|f| f.class() == class);
        if has(RequestClass::LocalOnly) {
            RequestClass::LocalOnly
        } else if has(RequestClass::MustMain) {
            RequestClass::MustMain
        } else {
            RequestClass::General
        }
    }
}

// ============================================================================
// Routing Decision
// ============================================================================

/// Outcome of routing one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "mirror", rename_all = "snake_case")]
pub enum RoutingDecision {
    Local,
    RedirectHelp(String),
    RedirectMain(String),
}

impl RoutingDecision {
    /// Mirror to redirect to, if any
    pub fn mirror(&self) -> Option<&str> {
        match self {
            Self::Local => None,
            Self::RedirectHelp(m) | Self::RedirectMain(m) => Some(m),
        }
    }

    /// Short label for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::RedirectHelp(_) => "help",
            Self::RedirectMain(_) => "main",
        }
    }
}

/// Decides whether to serve a request here or redirect it
pub struct DownloadRouter {
    random: Arc<dyn RandomSource>,
}

impl DownloadRouter {
    /// Create a router drawing from `random`
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// Route one request under the given settings
    pub fn decide(&self, query: &DownloadQuery, settings: &DownloadSettings) -> RoutingDecision {
        let class = query.class();
        if query.self_requested || class == RequestClass::LocalOnly {
            return RoutingDecision::Local;
        }

        let p = self.random.next_below(100);
        let help = &settings.help_servers;
        let main = &settings.main_servers;

        if !help.is_empty()
            && class == RequestClass::General
            && p < 100u32.saturating_sub(settings.main_load)
        {
            return RoutingDecision::RedirectHelp(help[p as usize % help.len()].clone());
        }
        if !main.is_empty() {
            return RoutingDecision::RedirectMain(main[p as usize % main.len()].clone());
        }
        RoutingDecision::Local
    }
}

/// Redirect target preserving the original path and raw query
pub fn redirect_location(scheme: &str, mirror: &str, path: &str, raw_query: Option<&str>) -> String {
    match raw_query {
        Some(q) if !q.is_empty() => format!("{scheme}://{mirror}{path}?{q}"),
        _ => format!("{scheme}://{mirror}{path}"),
    }
}
