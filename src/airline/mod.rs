use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::SuretyConfig;
use crate::errors::{SuretyError, SuretyResult};
use crate::primitives::{Address, Amount};

/// An insurer participant, either admitted or still collecting admission votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airline {
    pub address: Address,
    pub name: String,
    pub registered: bool,
    pub funded: bool,
    /// Total contributed so far
    pub funds: Amount,
    /// Registered airlines endorsing this airline while it is pending
    pub votes: BTreeSet<Address>,
}

impl Airline {
    fn pending(address: Address, name: &str) -> Self {
        Airline {
            address,
            name: name.to_string(),
            registered: false,
            funded: false,
            funds: 0,
            votes: BTreeSet::new(),
        }
    }
}

/// Result of a `register_airline` call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Candidate is now a registered airline
    Registered,
    /// Vote recorded; candidate still needs `required` votes in total
    Pending { votes: usize, required: usize },
}

/// Admission consensus over airlines.
///
/// Below `voting_threshold` registered airlines a single funded airline admits a
/// candidate on its own. From then on a candidate needs votes from a strict
/// majority of the registered airlines: `votes > registered / 2`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirlineRegistry {
    airlines: HashMap<Address, Airline>,
    registered_count: usize,
    voting_threshold: usize,
    min_funding: Amount,
}

impl AirlineRegistry {
    /// Create the registry with its founding airline already admitted (but unfunded).
    pub fn new(
        first_airline: Address,
        first_name: &str,
        voting_threshold: usize,
        min_funding: Amount,
    ) -> Self {
        let mut founder = Airline::pending(first_airline, first_name);
        founder.registered = true;

        let mut airlines = HashMap::new();
        airlines.insert(first_airline, founder);

        AirlineRegistry {
            airlines,
            registered_count: 1,
            voting_threshold,
            min_funding,
        }
    }

    pub(crate) fn apply_config(&mut self, config: &SuretyConfig) {
        self.voting_threshold = config.voting_threshold;
        self.min_funding = config.min_airline_funding;
    }

    /// Votes a candidate needs with the current population: `registered / 2 + 1`.
    pub fn required_votes(&self) -> usize {
        self.registered_count / 2 + 1
    }

    pub fn is_voting_required(&self) -> bool {
        self.registered_count >= self.voting_threshold
    }

    pub fn register_airline(
        &mut self,
        sponsor: &Address,
        candidate: Address,
        name: &str,
    ) -> SuretyResult<RegistrationOutcome> {
        if !self.is_airline_funded(sponsor) {
            return Err(SuretyError::AccessDenied(format!(
                "sponsor {} is not a funded airline",
                sponsor
            )));
        }
        if self.is_airline(&candidate) {
            return Err(SuretyError::AlreadyRegistered(format!("airline {}", candidate)));
        }

        if !self.is_voting_required() {
            self.admit(candidate, name);
            return Ok(RegistrationOutcome::Registered);
        }

        let required = self.required_votes();
        let entry = self
            .airlines
            .entry(candidate)
            .or_insert_with(|| Airline::pending(candidate, name));

        if !entry.votes.insert(*sponsor) {
            return Err(SuretyError::DuplicateVote(format!(
                "{} already voted for {}",
                sponsor, candidate
            )));
        }

        let votes = entry.votes.len();
        if votes >= required {
            self.admit(candidate, name);
            Ok(RegistrationOutcome::Registered)
        } else {
            Ok(RegistrationOutcome::Pending { votes, required })
        }
    }

    fn admit(&mut self, candidate: Address, name: &str) {
        let airline = self
            .airlines
            .entry(candidate)
            .or_insert_with(|| Airline::pending(candidate, name));
        airline.registered = true;
        airline.votes.clear();
        self.registered_count += 1;
    }

    /// Record a contribution from a registered airline. Returns its running total.
    pub fn fund(&mut self, airline: &Address, amount: Amount) -> SuretyResult<Amount> {
        if amount < self.min_funding {
            return Err(SuretyError::InsufficientFunds {
                required: self.min_funding,
                available: amount,
            });
        }
        let record = self
            .airlines
            .get_mut(airline)
            .filter(|a| a.registered)
            .ok_or_else(|| {
                SuretyError::AccessDenied(format!("{} is not a registered airline", airline))
            })?;

        record.funds = record.funds.checked_add(amount).ok_or(SuretyError::Overflow)?;
        record.funded = true;
        Ok(record.funds)
    }

    pub fn is_airline(&self, airline: &Address) -> bool {
        self.airlines.get(airline).map_or(false, |a| a.registered)
    }

    pub fn is_airline_funded(&self, airline: &Address) -> bool {
        self.airlines
            .get(airline)
            .map_or(false, |a| a.registered && a.funded)
    }

    /// Registered or pending airline record.
    pub fn get_airline(&self, airline: &Address) -> Option<&Airline> {
        self.airlines.get(airline)
    }

    /// Number of registered airlines.
    pub fn get_airline_count(&self) -> usize {
        self.registered_count
    }
}
