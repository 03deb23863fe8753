//! Change frequency hints for links
//!
//! Values come from sitemap `<changefreq>` tags; links discovered any other
//! way default to `Monthly`.

use std::fmt;

/// How often a link's content is expected to change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
    Never,
}

impl ChangeFreq {
    /// All variants, from most to least frequent
    pub const ALL: [ChangeFreq; 7] = [
        Self::Always,
        Self::Hourly,
        Self::Daily,
        Self::Weekly,
        Self::Monthly,
        Self::Yearly,
        Self::Never,
    ];

    /// Converts the change frequency to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }

    /// Parses a change frequency from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "always" => Some(Self::Always),
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    /// Parses a sitemap `<changefreq>` value, ignoring case and surrounding whitespace
    pub fn parse_hint(s: &str) -> Option<Self> {
        Self::from_db_string(&s.trim().to_lowercase())
    }
}

impl fmt::Display for ChangeFreq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_string_roundtrip() {
        for freq in ChangeFreq::ALL {
            assert_eq!(ChangeFreq::from_db_string(freq.to_db_string()), Some(freq));
        }
    }

    #[test]
    fn test_parse_hint_is_case_insensitive() {
        assert_eq!(ChangeFreq::parse_hint("Weekly"), Some(ChangeFreq::Weekly));
        assert_eq!(ChangeFreq::parse_hint(" DAILY\n"), Some(ChangeFreq::Daily));
        assert_eq!(ChangeFreq::parse_hint("fortnightly"), None);
    }

    #[test]
    fn test_default_is_monthly() {
        assert_eq!(ChangeFreq::default(), ChangeFreq::Monthly);
    }
}
