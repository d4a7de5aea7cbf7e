//! Domain primitives: Address, BlockNumber, RideId, ProposalId, Coordinates, Perspective.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Chain height.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BlockNumber(pub u64);

impl BlockNumber {
    pub fn new(height: u64) -> Self {
        BlockNumber(height)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Snapshot reads use block 0 for "not reached yet".
    pub fn is_unset(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account or contract address (hex string).
///
/// Normalized to lowercase so checksummed and plain spellings compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct Address(String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Address(addr.into().trim().to_ascii_lowercase())
    }

    /// The null sentinel the contracts return for empty slots.
    pub fn zero() -> Self {
        Address(ZERO_ADDRESS.to_string())
    }

    pub fn is_zero(&self) -> bool {
        let digits = self.0.strip_prefix("0x").unwrap_or(&self.0);
        digits.chars().all(|c| c == '0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Address {
    fn from(addr: String) -> Self {
        Address::new(addr)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque ride identifier as emitted by the ride contract.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RideId(pub String);

impl RideId {
    pub fn new(id: impl Into<String>) -> Self {
        RideId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RideId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque governance proposal identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub String);

impl ProposalId {
    pub fn new(id: impl Into<String>) -> Self {
        ProposalId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geographic point; the contracts store it as `"lon,lat"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid coordinates {0:?}, expected \"lon,lat\"")]
pub struct CoordinatesParseError(pub String);

impl Coordinates {
    pub fn new(lon: f64, lat: f64) -> Self {
        Coordinates { lon, lat }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lon, self.lat)
    }
}

impl FromStr for Coordinates {
    type Err = CoordinatesParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || CoordinatesParseError(s.to_string());
        let (lon, lat) = s.split_once(',').ok_or_else(err)?;
        let lon = lon.trim().parse::<f64>().map_err(|_| err())?;
        let lat = lat.trim().parse::<f64>().map_err(|_| err())?;
        if !lon.is_finite() || !lat.is_finite() {
            return Err(err());
        }
        Ok(Coordinates { lon, lat })
    }
}

/// The role the local actor plays; decides which events concern it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Perspective {
    Driver,
    Rider,
}

impl std::fmt::Display for Perspective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Perspective::Driver => write!(f, "driver"),
            Perspective::Rider => write!(f, "rider"),
        }
    }
}
