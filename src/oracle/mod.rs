//! Quorum resolution of flight status from independent oracle reporters.
//!
//! Each oracle pays a fee and receives a fixed set of indices. A status request is
//! routed to one index; only oracles holding that index may answer it, each at most
//! once. The first status to collect `min_responses` agreeing answers resolves the
//! request, and nothing reported afterwards can resolve it again.

pub mod key;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::SuretyConfig;
use crate::errors::{SuretyError, SuretyResult};
use crate::primitives::{Address, Amount, FlightStatus, Timestamp};

pub use key::RequestKey;

/// Answers collected for one (index, airline, flight, timestamp) request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseGroup {
    pub index: u8,
    pub airline: Address,
    pub flight: String,
    pub timestamp: Timestamp,
    pub requester: Address,
    pub responses: BTreeMap<FlightStatus, BTreeSet<Address>>,
    pub responders: BTreeSet<Address>,
    pub resolved: Option<FlightStatus>,
}

impl ResponseGroup {
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    pub fn votes_for(&self, status: FlightStatus) -> usize {
        self.responses.get(&status).map_or(0, |oracles| oracles.len())
    }
}

/// What an accepted oracle response did to its request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Quorum not reached yet for the reported status
    Pending { votes: usize, required: usize },
    /// This response completed the quorum
    Resolved(FlightStatus),
    /// Recorded, but the request had already been resolved
    AlreadyResolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConsensus {
    registration_fee: Amount,
    index_space: u8,
    indices_per_oracle: usize,
    min_responses: usize,
    oracles: HashMap<Address, Vec<u8>>,
    requests: HashMap<RequestKey, ResponseGroup>,
    fees_collected: Amount,
    nonce: u64,
}

impl OracleConsensus {
    pub fn new(config: &SuretyConfig) -> Self {
        OracleConsensus {
            registration_fee: config.oracle_registration_fee,
            index_space: config.oracle_index_space,
            indices_per_oracle: config.oracle_indices_per_oracle,
            min_responses: config.oracle_min_responses,
            oracles: HashMap::new(),
            requests: HashMap::new(),
            fees_collected: 0,
            nonce: 0,
        }
    }

    pub fn registration_fee(&self) -> Amount {
        self.registration_fee
    }

    /// Take fee, index space and quorum from `config`; assigned indices are kept.
    pub(crate) fn apply_config(&mut self, config: &SuretyConfig) {
        self.registration_fee = config.oracle_registration_fee;
        self.index_space = config.oracle_index_space;
        self.indices_per_oracle = config.oracle_indices_per_oracle;
        self.min_responses = config.oracle_min_responses;
    }

    pub fn register_oracle(&mut self, oracle: Address, fee: Amount) -> SuretyResult<Vec<u8>> {
        if fee < self.registration_fee {
            return Err(SuretyError::InsufficientFunds {
                required: self.registration_fee,
                available: fee,
            });
        }
        if self.oracles.contains_key(&oracle) {
            return Err(SuretyError::AlreadyRegistered(format!("oracle {}", oracle)));
        }

        let indexes = self.generate_indexes(&oracle);
        self.fees_collected = self.fees_collected.checked_add(fee).ok_or(SuretyError::Overflow)?;
        self.oracles.insert(oracle, indexes.clone());
        Ok(indexes)
    }

    /// Draw distinct indices from a hash chain over the oracle identity and a
    /// registration nonce, so assignment is reproducible from the state alone.
    fn generate_indexes(&mut self, oracle: &Address) -> Vec<u8> {
        let wanted = self.indices_per_oracle.min(self.index_space as usize);
        let mut indexes = Vec::with_capacity(wanted);

        while indexes.len() < wanted {
            let mut hasher = Sha256::new();
            hasher.update(oracle.as_bytes());
            hasher.update(self.nonce.to_be_bytes());
            let digest = hasher.finalize();
            self.nonce = self.nonce.wrapping_add(1);

            for byte in digest.iter() {
                let index = byte % self.index_space;
                if !indexes.contains(&index) {
                    indexes.push(index);
                    if indexes.len() == wanted {
                        break;
                    }
                }
            }
        }
        indexes
    }

    pub fn get_my_indexes(&self, oracle: &Address) -> SuretyResult<&[u8]> {
        self.oracles
            .get(oracle)
            .map(|indexes| indexes.as_slice())
            .ok_or_else(|| {
                SuretyError::AccessDenied(format!("{} is not a registered oracle", oracle))
            })
    }

    pub fn is_oracle_registered(&self, oracle: &Address) -> bool {
        self.oracles.contains_key(oracle)
    }

    pub fn oracle_count(&self) -> usize {
        self.oracles.len()
    }

    /// Index a status request for these parameters is routed to.
    pub fn request_index(&self, airline: &Address, flight: &str, timestamp: Timestamp) -> u8 {
        let mut hasher = Sha256::new();
        hasher.update(airline.as_bytes());
        hasher.update(flight.as_bytes());
        hasher.update(timestamp.to_be_bytes());
        let digest = hasher.finalize();
        digest[0] % self.index_space
    }

    /// Open (or re-announce) a status request. Returns the routed index.
    pub fn request_flight_status(
        &mut self,
        requester: Address,
        airline: Address,
        flight: &str,
        timestamp: Timestamp,
    ) -> u8 {
        let index = self.request_index(&airline, flight, timestamp);
        let key = RequestKey::derive(index, &airline, flight, timestamp);
        self.requests.entry(key).or_insert_with(|| ResponseGroup {
            index,
            airline,
            flight: flight.to_string(),
            timestamp,
            requester,
            responses: BTreeMap::new(),
            responders: BTreeSet::new(),
            resolved: None,
        });
        index
    }

    pub fn submit_response(
        &mut self,
        oracle: &Address,
        index: u8,
        airline: &Address,
        flight: &str,
        timestamp: Timestamp,
        status: FlightStatus,
    ) -> SuretyResult<ResponseOutcome> {
        let holds_index = self
            .oracles
            .get(oracle)
            .map_or(false, |indexes| indexes.contains(&index));
        if !holds_index {
            return Err(SuretyError::AccessDenied(format!(
                "index {} is not assigned to oracle {}",
                index, oracle
            )));
        }

        let key = RequestKey::derive(index, airline, flight, timestamp);
        let group = self.requests.get_mut(&key).ok_or(SuretyError::UnknownRequest)?;

        if !group.responders.insert(*oracle) {
            return Err(SuretyError::DuplicateVote(format!(
                "oracle {} already answered request {}",
                oracle, key
            )));
        }
        let agreeing = group.responses.entry(status).or_default();
        agreeing.insert(*oracle);
        let votes = agreeing.len();

        if group.is_resolved() {
            return Ok(ResponseOutcome::AlreadyResolved);
        }
        if votes >= self.min_responses {
            group.resolved = Some(status);
            return Ok(ResponseOutcome::Resolved(status));
        }
        Ok(ResponseOutcome::Pending {
            votes,
            required: self.min_responses,
        })
    }

    pub fn get_request(&self, key: &RequestKey) -> Option<&ResponseGroup> {
        self.requests.get(key)
    }

    pub fn open_requests(&self) -> impl Iterator<Item = &ResponseGroup> {
        self.requests.values().filter(|group| !group.is_resolved())
    }

    pub fn fees_collected(&self) -> Amount {
        self.fees_collected
    }
}
