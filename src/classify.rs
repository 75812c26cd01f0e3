use std::fmt;

use serde::{Deserialize, Serialize};

/// Regulatory classification of a location, derived from its free-text kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AreaType {
    #[serde(rename = "Protected")]
    Protected,
    #[serde(rename = "Non-protected")]
    NonProtected,
    #[serde(rename = "Transit / Other")]
    TransitOther,
}

impl AreaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Protected => "Protected",
            Self::NonProtected => "Non-protected",
            Self::TransitOther => "Transit / Other",
        }
    }
}

impl fmt::Display for AreaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the classification table: a case-sensitive substring and
/// the area it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRule {
    pub pattern: String,
    pub area: AreaType,
}

impl AreaRule {
    pub fn new(pattern: &str, area: AreaType) -> Self {
        Self {
            pattern: pattern.to_string(),
            area,
        }
    }
}

/// Ordered rule table. Rules are evaluated top to bottom and the first
/// pattern contained in the kind wins; kinds matching nothing fall back to
/// [`AreaType::TransitOther`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaRules {
    rules: Vec<AreaRule>,
}

impl Default for AreaRules {
    fn default() -> Self {
        Self {
            rules: vec![
                AreaRule::new("Preserve", AreaType::Protected),
                AreaRule::new("Reserve", AreaType::Protected),
                AreaRule::new("Fishing", AreaType::NonProtected),
                AreaRule::new("Shelf", AreaType::NonProtected),
            ],
        }
    }
}

impl AreaRules {
    pub fn new(rules: Vec<AreaRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[AreaRule] {
        &self.rules
    }

    pub fn classify(&self, kind: &str) -> AreaType {
        self.rules
            .iter()
            .find(|rule| kind.contains(rule.pattern.as_str()))
            .map(|rule| rule.area)
            .unwrap_or(AreaType::TransitOther)
    }
}

/// Classify with the default rule table.
pub fn classify_kind(kind: &str) -> AreaType {
    AreaRules::default().classify(kind)
}
