use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// External sources mirrored by the sync core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationKind {
    /// Messaging threads exported from Beeper.
    Beeper,
    /// Meeting notes pulled through the Granola CLI.
    Granola,
}

impl IntegrationKind {
    pub const ALL: [IntegrationKind; 2] = [IntegrationKind::Beeper, IntegrationKind::Granola];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationKind::Beeper => "beeper",
            IntegrationKind::Granola => "granola",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            IntegrationKind::Beeper => "Beeper",
            IntegrationKind::Granola => "Granola",
        }
    }
}

impl fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IntegrationKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "beeper" => Ok(IntegrationKind::Beeper),
            "granola" => Ok(IntegrationKind::Granola),
            other => Err(format!("Unknown integration: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_integrations() {
        assert_eq!("granola".parse::<IntegrationKind>(), Ok(IntegrationKind::Granola));
        assert_eq!(" Beeper ".parse::<IntegrationKind>(), Ok(IntegrationKind::Beeper));
        assert!("notion".parse::<IntegrationKind>().is_err());
    }

    #[test]
    fn serializes_as_snake_case() {
        let value = serde_json::to_value(IntegrationKind::Granola).unwrap();
        assert_eq!(value, serde_json::json!("granola"));
    }
}
