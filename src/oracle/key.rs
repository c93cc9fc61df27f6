use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::primitives::{Address, Timestamp};

/// Digest identifying one status request: (index, airline, flight, timestamp).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey([u8; 32]);

impl RequestKey {
    pub fn derive(index: u8, airline: &Address, flight: &str, timestamp: Timestamp) -> Self {
        let mut hasher = Sha256::new();
        hasher.update([index]);
        hasher.update(airline.as_bytes());
        // Length prefix keeps ("AB", ts) and ("A", ..) from colliding on concatenation
        hasher.update((flight.len() as u64).to_be_bytes());
        hasher.update(flight.as_bytes());
        hasher.update(timestamp.to_be_bytes());
        RequestKey(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl fmt::Debug for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestKey({})", hex::encode(self.0))
    }
}

impl Serialize for RequestKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for RequestKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&s, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(RequestKey(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_field_changes_the_key() {
        let airline = Address::from_low_u64(1);
        let base = RequestKey::derive(1, &airline, "AA100", 123);

        assert_eq!(base, RequestKey::derive(1, &airline, "AA100", 123));
        assert_ne!(base, RequestKey::derive(2, &airline, "AA100", 123));
        assert_ne!(base, RequestKey::derive(1, &Address::from_low_u64(2), "AA100", 123));
        assert_ne!(base, RequestKey::derive(1, &airline, "AA101", 123));
        assert_ne!(base, RequestKey::derive(1, &airline, "AA100", 124));
    }

    #[test]
    fn test_json_key_round_trip() {
        let key = RequestKey::derive(3, &Address::from_low_u64(1), "AA100", 5);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(serde_json::from_str::<RequestKey>(&json).unwrap(), key);
    }
}
