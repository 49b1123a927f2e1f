//! Identifier - Composite identifiers and their wire form
//!
//! A composite identifier is the string that correlates tracked state with a
//! remote entity across reconciliation runs. It is persisted verbatim, so the
//! encodings here are a stable on-disk format:
//!
//! - zonal: `{zone}/{uuid}` (e.g. `fr-par-1/11111111-1111-1111-1111-111111111111`)
//! - regional: `{region}/{uuid}`
//! - global: `{uuid}`
//! - multi-part: `v1/v2/.../vN`, positional against a declared key order

use std::collections::HashMap;
use std::fmt;

use crate::locality::{Locality, Region, Zone};

/// Separator between the segments of a composite identifier
pub const SEPARATOR: char = '/';

/// Error raised while parsing or encoding identifiers and localities
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("invalid zone '{0}'")]
    InvalidZone(String),

    #[error("invalid region '{0}'")]
    InvalidRegion(String),

    #[error("invalid locality '{0}': expected a zone or a region")]
    InvalidLocality(String),

    #[error("malformed {kind} identifier '{value}'")]
    Malformed { kind: &'static str, value: String },

    #[error("identifier must not be empty")]
    EmptyId,
}

impl IdentifierError {
    fn malformed(kind: &'static str, value: &str) -> Self {
        IdentifierError::Malformed {
            kind,
            value: value.to_string(),
        }
    }
}

/// Returns `"{zone}/{id}"`
pub fn encode_zonal(zone: &Zone, id: &str) -> Result<String, IdentifierError> {
    if id.is_empty() {
        return Err(IdentifierError::EmptyId);
    }
    Ok(format!("{}{}{}", zone, SEPARATOR, id))
}

/// Split a zonal identifier on its first separator
pub fn parse_zonal(s: &str) -> Result<(Zone, String), IdentifierError> {
    let (zone, id) = s
        .split_once(SEPARATOR)
        .ok_or_else(|| IdentifierError::malformed("zonal", s))?;
    let zone = Zone::parse(zone).map_err(|_| IdentifierError::malformed("zonal", s))?;
    Ok((zone, id.to_string()))
}

/// Returns `"{region}/{id}"`
pub fn encode_regional(region: &Region, id: &str) -> Result<String, IdentifierError> {
    if id.is_empty() {
        return Err(IdentifierError::EmptyId);
    }
    Ok(format!("{}{}{}", region, SEPARATOR, id))
}

/// Split a regional identifier on its first separator
pub fn parse_regional(s: &str) -> Result<(Region, String), IdentifierError> {
    let (region, id) = s
        .split_once(SEPARATOR)
        .ok_or_else(|| IdentifierError::malformed("regional", s))?;
    let region = Region::parse(region).map_err(|_| IdentifierError::malformed("regional", s))?;
    Ok((region, id.to_string()))
}

/// Join the values of `key_order` with `/`. Missing keys yield empty segments.
pub fn encode_multi_part(values: &HashMap<String, String>, key_order: &[&str]) -> String {
    key_order
        .iter()
        .map(|key| values.get(*key).map(String::as_str).unwrap_or(""))
        .collect::<Vec<_>>()
        .join("/")
}

/// Assign the segments of `s` to `key_order` positionally.
///
/// At most `key_order.len()` segments are produced, so the last key keeps any
/// embedded separators. Keys past the last produced segment are absent from
/// the result rather than set to an empty string.
pub fn parse_multi_part(s: &str, key_order: &[&str]) -> HashMap<String, String> {
    s.splitn(key_order.len(), SEPARATOR)
        .zip(key_order)
        .map(|(segment, key)| (key.to_string(), segment.to_string()))
        .collect()
}

/// Strip a locality prefix if present, returning the bare id.
///
/// `fr-par-1/uuid` and `fr-par/uuid` both give `uuid`; a bare id is returned
/// unchanged.
pub fn expand_id(s: &str) -> &str {
    match s.split_once(SEPARATOR) {
        Some((locality, id)) if Locality::parse(locality).is_ok() => id,
        _ => s,
    }
}

/// Split `{locality}/{id}` without committing to zonal or regional
pub fn parse_localized_id(s: &str) -> Result<(Locality, String), IdentifierError> {
    let (locality, id) = s
        .split_once(SEPARATOR)
        .ok_or_else(|| IdentifierError::malformed("localized", s))?;
    let locality = Locality::parse(locality).map_err(|_| IdentifierError::malformed("localized", s))?;
    if id.is_empty() {
        return Err(IdentifierError::malformed("localized", s));
    }
    Ok((locality, id.to_string()))
}

/// Rewrite a zonal identifier into the regional form of the same entity.
/// Regional identifiers are returned unchanged.
pub fn zonal_to_regional_id(s: &str) -> Result<String, IdentifierError> {
    match parse_localized_id(s)? {
        (Locality::Zonal(zone), id) => encode_regional(&zone.region(), &id),
        (Locality::Regional(_), _) => Ok(s.to_string()),
    }
}

/// Compare two ids while ignoring any locality prefix
pub fn same_id_ignoring_locality(a: &str, b: &str) -> bool {
    expand_id(a) == expand_id(b)
}

/// How a resource type shapes its composite identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdScope {
    Zonal,
    Regional,
    Global,
    /// Positional keys, e.g. `["region", "instance_id", "name"]`
    MultiPart(&'static [&'static str]),
}

impl IdScope {
    pub fn name(&self) -> &'static str {
        match self {
            IdScope::Zonal => "zonal",
            IdScope::Regional => "regional",
            IdScope::Global => "global",
            IdScope::MultiPart(_) => "multi-part",
        }
    }
}

/// Multi-part identifier with every declared key present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiPartId {
    key_order: &'static [&'static str],
    values: HashMap<String, String>,
}

impl MultiPartId {
    pub fn new(key_order: &'static [&'static str], values: HashMap<String, String>) -> Self {
        Self { key_order, values }
    }

    pub fn key_order(&self) -> &'static [&'static str] {
        self.key_order
    }

    pub fn values(&self) -> &HashMap<String, String> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl fmt::Display for MultiPartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_multi_part(&self.values, self.key_order))
    }
}

/// A parsed composite identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositeId {
    Zonal { zone: Zone, id: String },
    Regional { region: Region, id: String },
    Global(String),
    MultiPart(MultiPartId),
}

impl CompositeId {
    pub fn zonal(zone: Zone, id: impl Into<String>) -> Self {
        CompositeId::Zonal { zone, id: id.into() }
    }

    pub fn regional(region: Region, id: impl Into<String>) -> Self {
        CompositeId::Regional {
            region,
            id: id.into(),
        }
    }

    pub fn global(id: impl Into<String>) -> Self {
        CompositeId::Global(id.into())
    }

    /// Parse `s` in the shape `scope` dictates.
    ///
    /// Unlike [`parse_multi_part`], a multi-part identifier must supply every
    /// declared key; an entity cannot be addressed with a partial handle.
    pub fn parse(s: &str, scope: &IdScope) -> Result<Self, IdentifierError> {
        let parsed = match scope {
            IdScope::Zonal => {
                let (zone, id) = parse_zonal(s)?;
                CompositeId::Zonal { zone, id }
            }
            IdScope::Regional => {
                let (region, id) = parse_regional(s)?;
                CompositeId::Regional { region, id }
            }
            IdScope::Global => CompositeId::Global(s.to_string()),
            IdScope::MultiPart(key_order) => {
                let values = parse_multi_part(s, key_order);
                if values.len() != key_order.len() {
                    return Err(IdentifierError::malformed("multi-part", s));
                }
                CompositeId::MultiPart(MultiPartId::new(key_order, values))
            }
        };
        if parsed.id().is_empty() {
            return Err(IdentifierError::EmptyId);
        }
        Ok(parsed)
    }

    /// Bare remote id. For multi-part identifiers this is the last segment.
    pub fn id(&self) -> &str {
        match self {
            CompositeId::Zonal { id, .. } | CompositeId::Regional { id, .. } => id,
            CompositeId::Global(id) => id,
            CompositeId::MultiPart(multi) => multi
                .key_order
                .last()
                .and_then(|key| multi.get(key))
                .unwrap_or(""),
        }
    }

    /// Locality carried by the identifier, if any
    pub fn locality(&self) -> Option<Locality> {
        match self {
            CompositeId::Zonal { zone, .. } => Some(Locality::Zonal(zone.clone())),
            CompositeId::Regional { region, .. } => Some(Locality::Regional(region.clone())),
            CompositeId::Global(_) => None,
            CompositeId::MultiPart(multi) => {
                if let Some(zone) = multi.get("zone").and_then(|z| Zone::parse(z).ok()) {
                    Some(Locality::Zonal(zone))
                } else {
                    multi
                        .get("region")
                        .and_then(|r| Region::parse(r).ok())
                        .map(Locality::Regional)
                }
            }
        }
    }

    pub fn scope(&self) -> IdScope {
        match self {
            CompositeId::Zonal { .. } => IdScope::Zonal,
            CompositeId::Regional { .. } => IdScope::Regional,
            CompositeId::Global(_) => IdScope::Global,
            CompositeId::MultiPart(multi) => IdScope::MultiPart(multi.key_order),
        }
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositeId::Zonal { zone, id } => write!(f, "{}{}{}", zone, SEPARATOR, id),
            CompositeId::Regional { region, id } => write!(f, "{}{}{}", region, SEPARATOR, id),
            CompositeId::Global(id) => f.write_str(id),
            CompositeId::MultiPart(multi) => fmt::Display::fmt(multi, f),
        }
    }
}
