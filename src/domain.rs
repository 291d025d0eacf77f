use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::error::DatapointsError;

/// A local authority as named on the INSPIRE download page, e.g. `"Barking and Dagenham"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorityName(String);

impl AuthorityName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name as used for cache files and archive URLs.
    pub fn file_stem(&self) -> String {
        sanitize_name(&self.0)
    }
}

impl fmt::Display for AuthorityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AuthorityName {
    type Err = DatapointsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.contains(['/', '\\']) {
            return Err(DatapointsError::InvalidName(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

pub fn sanitize_name(name: &str) -> String {
    name.trim().replace(' ', "_")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: AuthorityName,
    /// Absent when the listing only exposes names; the URL is then derived from the name.
    pub source_url: Option<String>,
}

impl CatalogEntry {
    pub fn named(name: AuthorityName) -> Self {
        Self {
            name,
            source_url: None,
        }
    }
}

/// A file that is ready in the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fetched {
    pub path: Utf8PathBuf,
    /// True when the file already existed and no request was made.
    pub cached: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PricePaidVersion {
    /// The rolling file of recent changes, and the default download.
    #[default]
    MonthlyUpdate,
    Complete,
    Year(u16),
}

impl PricePaidVersion {
    /// The yearly file for the last full calendar year.
    pub fn previous_year() -> Self {
        let year = chrono::Local::now().year() - 1;
        PricePaidVersion::Year(year as u16)
    }
}

impl fmt::Display for PricePaidVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricePaidVersion::MonthlyUpdate => write!(f, "monthly-update"),
            PricePaidVersion::Complete => write!(f, "complete"),
            PricePaidVersion::Year(year) => write!(f, "{year}"),
        }
    }
}

impl FromStr for PricePaidVersion {
    type Err = DatapointsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        match normalized.as_str() {
            "monthly-update" | "monthly" => Ok(PricePaidVersion::MonthlyUpdate),
            "complete" => Ok(PricePaidVersion::Complete),
            year if year.len() == 4 && year.chars().all(|ch| ch.is_ascii_digit()) => year
                .parse::<u16>()
                .ok()
                .filter(|year| *year >= 1000)
                .map(PricePaidVersion::Year)
                .ok_or_else(|| DatapointsError::InvalidVersion(value.to_string())),
            _ => Err(DatapointsError::InvalidVersion(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn authority_file_stem() {
        let name: AuthorityName = "  Barking and Dagenham ".parse().unwrap();
        assert_eq!(name.as_str(), "Barking and Dagenham");
        assert_eq!(name.file_stem(), "Barking_and_Dagenham");
    }

    #[test]
    fn authority_rejects_paths() {
        let err = "../etc".parse::<AuthorityName>().unwrap_err();
        assert_matches!(err, DatapointsError::InvalidName(_));
        let err = "   ".parse::<AuthorityName>().unwrap_err();
        assert_matches!(err, DatapointsError::InvalidName(_));
    }

    #[test]
    fn price_paid_versions() {
        assert_eq!(
            "monthly-update".parse::<PricePaidVersion>().unwrap(),
            PricePaidVersion::MonthlyUpdate
        );
        assert_eq!(
            "2019".parse::<PricePaidVersion>().unwrap(),
            PricePaidVersion::Year(2019)
        );
        assert_eq!(PricePaidVersion::Year(2019).to_string(), "2019");
        assert_matches!(
            "19".parse::<PricePaidVersion>(),
            Err(DatapointsError::InvalidVersion(_))
        );
    }

    #[test]
    fn leading_zero_year_is_rejected() {
        assert_matches!(
            "0999".parse::<PricePaidVersion>(),
            Err(DatapointsError::InvalidVersion(value)) if value == "0999"
        );
        let year = "1995".parse::<PricePaidVersion>().unwrap();
        assert_eq!(year.to_string().parse::<PricePaidVersion>().unwrap(), year);
    }

    #[test]
    fn monthly_update_is_the_default() {
        assert_eq!(PricePaidVersion::default(), PricePaidVersion::MonthlyUpdate);
        assert_eq!(PricePaidVersion::default().to_string(), "monthly-update");
    }
}
