//! Keyword extraction over free-text chat replies.
//!
//! Each extractor is a fixed vocabulary checked in declaration order. Results
//! follow vocabulary order, not the order words appear in the input. Nothing
//! here fails: no match is an empty result.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Trigger word, optional plural, optional lead-in, then the fragment up to
/// the next sentence boundary.
static FEATURE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:feature|function|capability|need|want|require|include)s?\s*(?::|like|such as)?\s*([^.!?]+)",
    )
    .expect("feature pattern is valid")
});

/// Pull feature descriptions out of a reply.
///
/// Matching runs on the lower-cased text, so fragments come back lower-cased.
/// Callers fall back to the raw reply when this returns nothing.
pub fn extract_features(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    FEATURE_PATTERN
        .captures_iter(&lowered)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}

/// Target platforms recognised in a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "Mobile")]
    Mobile,
    #[serde(rename = "Desktop")]
    Desktop,
    #[serde(rename = "Tablet")]
    Tablet,
    #[serde(rename = "Web Browser")]
    WebBrowser,
    #[serde(rename = "Responsive (All Devices)")]
    Responsive,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "Mobile",
            Self::Desktop => "Desktop",
            Self::Tablet => "Tablet",
            Self::WebBrowser => "Web Browser",
            Self::Responsive => "Responsive (All Devices)",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const PLATFORM_VOCABULARY: &[(Platform, &[&str])] = &[
    (Platform::Mobile, &["mobile", "phone", "ios", "android"]),
    (Platform::Desktop, &["desktop", "computer", "laptop"]),
    (Platform::Tablet, &["tablet", "ipad"]),
    (Platform::WebBrowser, &["web", "browser"]),
    (Platform::Responsive, &["responsive", "all devices"]),
];

/// Integration categories recognised in a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Integration {
    #[serde(rename = "Payment Processing")]
    Payments,
    #[serde(rename = "Analytics")]
    Analytics,
    #[serde(rename = "Social Media")]
    SocialMedia,
    #[serde(rename = "Email Marketing")]
    EmailMarketing,
    #[serde(rename = "Third-party APIs")]
    ThirdPartyApis,
    #[serde(rename = "CRM Systems")]
    Crm,
}

impl Integration {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payments => "Payment Processing",
            Self::Analytics => "Analytics",
            Self::SocialMedia => "Social Media",
            Self::EmailMarketing => "Email Marketing",
            Self::ThirdPartyApis => "Third-party APIs",
            Self::Crm => "CRM Systems",
        }
    }
}

impl std::fmt::Display for Integration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const INTEGRATION_VOCABULARY: &[(Integration, &[&str])] = &[
    (Integration::Payments, &["payment", "stripe", "paypal"]),
    (Integration::Analytics, &["analytics", "tracking"]),
    (
        Integration::SocialMedia,
        &["social", "facebook", "twitter", "instagram"],
    ),
    (
        Integration::EmailMarketing,
        &["email", "mailchimp", "newsletter"],
    ),
    (
        Integration::ThirdPartyApis,
        &["api", "third party", "integration"],
    ),
    (Integration::Crm, &["crm", "salesforce", "hubspot"]),
];

/// Platforms mentioned in `text`, each at most once.
pub fn extract_platforms(text: &str) -> Vec<Platform> {
    match_vocabulary(text, PLATFORM_VOCABULARY)
}

/// Integration categories mentioned in `text`, each at most once.
pub fn extract_integrations(text: &str) -> Vec<Integration> {
    match_vocabulary(text, INTEGRATION_VOCABULARY)
}

fn match_vocabulary<T: Copy>(text: &str, vocabulary: &[(T, &[&str])]) -> Vec<T> {
    let lowered = text.to_lowercase();
    vocabulary
        .iter()
        .filter(|(_, words)| words.iter().any(|w| lowered.contains(w)))
        .map(|(tag, _)| *tag)
        .collect()
}
