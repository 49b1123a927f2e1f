//! Locality - Zones and regions that scope Scaleway resources
//!
//! A zone (`fr-par-1`) is a single availability zone inside a region (`fr-par`).
//! Zonal resources live in exactly one zone, regional resources in one region,
//! and global resources carry no locality at all.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::identifier::IdentifierError;

static ZONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}-[a-z]{3}-[0-9]+$").expect("zone pattern is valid"));

static REGION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}-[a-z]{3}$").expect("region pattern is valid"));

/// Availability zone, e.g. `fr-par-1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Zone(String);

impl Zone {
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        if ZONE_PATTERN.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(IdentifierError::InvalidZone(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Region containing this zone (`fr-par-2` -> `fr-par`)
    pub fn region(&self) -> Region {
        // The grammar guarantees at least one '-' before the zone number.
        let cut = self.0.rfind('-').unwrap_or(self.0.len());
        Region(self.0[..cut].to_string())
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Zone {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Region, e.g. `fr-par`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Region(String);

impl Region {
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        if REGION_PATTERN.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(IdentifierError::InvalidRegion(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First zone of this region (`fr-par` -> `fr-par-1`)
    pub fn first_zone(&self) -> Zone {
        Zone(format!("{}-1", self.0))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Region {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Either a zone or a region
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locality {
    Zonal(Zone),
    Regional(Region),
}

impl Locality {
    /// Parse either grammar, zone first
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        if let Ok(zone) = Zone::parse(s) {
            return Ok(Locality::Zonal(zone));
        }
        if let Ok(region) = Region::parse(s) {
            return Ok(Locality::Regional(region));
        }
        Err(IdentifierError::InvalidLocality(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Locality::Zonal(zone) => zone.as_str(),
            Locality::Regional(region) => region.as_str(),
        }
    }

    /// Region of this locality; a zone resolves to its containing region
    pub fn region(&self) -> Region {
        match self {
            Locality::Zonal(zone) => zone.region(),
            Locality::Regional(region) => region.clone(),
        }
    }

    pub fn zone(&self) -> Option<&Zone> {
        match self {
            Locality::Zonal(zone) => Some(zone),
            Locality::Regional(_) => None,
        }
    }
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Zone> for Locality {
    fn from(zone: Zone) -> Self {
        Locality::Zonal(zone)
    }
}

impl From<Region> for Locality {
    fn from(region: Region) -> Self {
        Locality::Regional(region)
    }
}

/// Localities used when a declared resource does not name its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalityDefaults {
    pub zone: Zone,
    pub region: Region,
}

impl LocalityDefaults {
    pub fn new(zone: Zone, region: Region) -> Self {
        Self { zone, region }
    }
}

impl Default for LocalityDefaults {
    fn default() -> Self {
        let region = Region("fr-par".to_string());
        Self {
            zone: region.first_zone(),
            region,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_zone() {
        let zone = Zone::parse("fr-par-1").unwrap();
        assert_eq!(zone.as_str(), "fr-par-1");
        assert_eq!(zone.region().as_str(), "fr-par");

        assert_eq!(Zone::parse("nl-ams-3").unwrap().region().as_str(), "nl-ams");
    }

    #[test]
    fn parse_zone_rejects_invalid() {
        assert!(Zone::parse("fr-par").is_err());
        assert!(Zone::parse("FR-PAR-1").is_err());
        assert!(Zone::parse("fr-par-").is_err());
        assert!(Zone::parse("").is_err());
        assert!(Zone::parse("fr-par-1/extra").is_err());
    }

    #[test]
    fn parse_region() {
        assert_eq!(Region::parse("pl-waw").unwrap().as_str(), "pl-waw");
        assert!(Region::parse("pl-waw-1").is_err());
        assert!(Region::parse("plwaw").is_err());
    }

    #[test]
    fn region_first_zone() {
        let region = Region::parse("nl-ams").unwrap();
        assert_eq!(region.first_zone().as_str(), "nl-ams-1");
    }

    #[test]
    fn parse_locality_prefers_zone() {
        assert_eq!(
            Locality::parse("fr-par-2").unwrap(),
            Locality::Zonal(Zone::parse("fr-par-2").unwrap())
        );
        assert_eq!(
            Locality::parse("fr-par").unwrap(),
            Locality::Regional(Region::parse("fr-par").unwrap())
        );
        assert!(matches!(
            Locality::parse("paris"),
            Err(IdentifierError::InvalidLocality(_))
        ));
    }

    #[test]
    fn locality_region() {
        let zonal = Locality::parse("pl-waw-2").unwrap();
        assert_eq!(zonal.region().as_str(), "pl-waw");
        assert_eq!(zonal.zone().map(Zone::as_str), Some("pl-waw-2"));

        let regional = Locality::parse("pl-waw").unwrap();
        assert_eq!(regional.region().as_str(), "pl-waw");
        assert!(regional.zone().is_none());
    }

    #[test]
    fn default_localities() {
        let defaults = LocalityDefaults::default();
        assert_eq!(defaults.zone.as_str(), "fr-par-1");
        assert_eq!(defaults.region.as_str(), "fr-par");
    }
}
