use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use neuroflight_core::PlacementRecord;
use neuroflight_system_worldgen::fingerprint;

const SNAPSHOT_DOMAIN: &str = "city";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub(crate) const SNAPSHOT_HEADER: &str = "city:v1";
const FIELD_DELIMITER: char = ':';

/// Generated placements packed for comparison between machines.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CityLayoutSnapshot {
    /// Placement records in generation order.
    pub placements: Vec<PlacementRecord>,
}

impl CityLayoutSnapshot {
    /// Layout fingerprint of the contained placements.
    #[must_use]
    pub(crate) fn fingerprint(&self) -> u64 {
        fingerprint(&self.placements)
    }

    /// Encodes the snapshot as `city:v1:<count>:<fingerprint>:<payload>`.
    pub(crate) fn encode(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(&self.placements)?;
        Ok(format!(
            "{SNAPSHOT_HEADER}:{}:{:016x}:{}",
            self.placements.len(),
            self.fingerprint(),
            STANDARD_NO_PAD.encode(json)
        ))
    }

    /// Decodes a snapshot and checks its count and fingerprint.
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let mut field = |name: &'static str| parts.next().ok_or(LayoutTransferError::Missing(name));
        let domain = field("prefix")?;
        let version = field("version")?;
        let count = field("count")?;
        let recorded = field("fingerprint")?;
        let payload = field("payload")?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
        }
        let count = count
            .parse::<usize>()
            .map_err(|_| LayoutTransferError::InvalidField("count", count.to_owned()))?;
        let recorded = u64::from_str_radix(recorded, 16)
            .map_err(|_| LayoutTransferError::InvalidField("fingerprint", recorded.to_owned()))?;

        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LayoutTransferError::InvalidEncoding)?;
        let placements: Vec<PlacementRecord> =
            serde_json::from_slice(&bytes).map_err(LayoutTransferError::InvalidPayload)?;

        if placements.len() != count {
            return Err(LayoutTransferError::CountMismatch {
                recorded: count,
                decoded: placements.len(),
            });
        }
        let snapshot = Self { placements };
        if snapshot.fingerprint() != recorded {
            return Err(LayoutTransferError::FingerprintMismatch);
        }
        Ok(snapshot)
    }
}

/// Errors that can occur while decoding layout snapshot strings.
#[derive(Debug)]
pub(crate) enum LayoutTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// A segment was missing from the encoded snapshot.
    Missing(&'static str),
    /// The encoded snapshot used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    UnsupportedVersion(String),
    /// A numeric segment could not be parsed.
    InvalidField(&'static str, String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    InvalidPayload(serde_json::Error),
    /// The payload holds a different number of placements than recorded.
    CountMismatch {
        /// Count written in the header.
        recorded: usize,
        /// Count found in the payload.
        decoded: usize,
    },
    /// The payload does not hash to the recorded fingerprint.
    FingerprintMismatch,
}

impl fmt::Display for LayoutTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "layout snapshot was empty"),
            Self::Missing(segment) => write!(f, "layout snapshot is missing the {segment}"),
            Self::InvalidPrefix(prefix) => write!(f, "layout prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "layout version '{version}' is not supported")
            }
            Self::InvalidField(name, value) => write!(f, "could not parse {name} '{value}'"),
            Self::InvalidEncoding(error) => write!(f, "could not decode layout payload: {error}"),
            Self::InvalidPayload(error) => write!(f, "could not parse layout payload: {error}"),
            Self::CountMismatch { recorded, decoded } => write!(
                f,
                "layout snapshot records {recorded} placements but carries {decoded}"
            ),
            Self::FingerprintMismatch => {
                write!(f, "layout payload does not match its fingerprint")
            }
        }
    }
}

impl Error for LayoutTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}
