use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::airline::AirlineRegistry;
use crate::errors::{SuretyError, SuretyResult};
use crate::primitives::{Address, FlightStatus, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub airline: Address,
    pub designator: String,
    pub registered: bool,
    pub status: FlightStatus,
    /// Timestamp of the report that set `status`; registration time until then
    pub updated_at: Timestamp,
}

/// Flights keyed by their designator, which is unique across airlines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightRegistry {
    flights: HashMap<String, Flight>,
}

impl FlightRegistry {
    pub fn new() -> Self {
        FlightRegistry::default()
    }

    pub fn register_flight(
        &mut self,
        airlines: &AirlineRegistry,
        airline: &Address,
        designator: &str,
        timestamp: Timestamp,
    ) -> SuretyResult<()> {
        if !airlines.is_airline_funded(airline) {
            return Err(SuretyError::AccessDenied(format!(
                "{} is not a funded airline",
                airline
            )));
        }
        if designator.trim().is_empty() {
            return Err(SuretyError::UnknownFlight("empty flight designator".to_string()));
        }
        if self.is_flight_registered(designator) {
            return Err(SuretyError::AlreadyRegistered(format!("flight {}", designator)));
        }

        self.flights.insert(
            designator.to_string(),
            Flight {
                airline: *airline,
                designator: designator.to_string(),
                registered: true,
                status: FlightStatus::Unknown,
                updated_at: timestamp,
            },
        );
        Ok(())
    }

    /// Overwrite the resolved status. Returns the status it replaced.
    pub fn set_flight_status(
        &mut self,
        designator: &str,
        status: FlightStatus,
        timestamp: Timestamp,
    ) -> SuretyResult<FlightStatus> {
        let flight = self
            .flights
            .get_mut(designator)
            .filter(|f| f.registered)
            .ok_or_else(|| SuretyError::UnknownFlight(designator.to_string()))?;

        let previous = flight.status;
        flight.status = status;
        flight.updated_at = timestamp;
        Ok(previous)
    }

    pub fn get_flight(&self, designator: &str) -> Option<&Flight> {
        self.flights.get(designator)
    }

    pub fn is_flight_registered(&self, designator: &str) -> bool {
        self.flights.get(designator).map_or(false, |f| f.registered)
    }

    /// Fail with `UnknownFlight` unless `designator` is registered under `airline`.
    pub fn require_flight_of(&self, airline: &Address, designator: &str) -> SuretyResult<&Flight> {
        self.flights
            .get(designator)
            .filter(|f| f.registered && f.airline == *airline)
            .ok_or_else(|| {
                SuretyError::UnknownFlight(format!("{} operated by {}", designator, airline))
            })
    }
}
