use serde::{Deserialize, Serialize};

use crate::primitives::{Address, Amount, FlightStatus, Timestamp};

/// Notifications emitted by committed calls. The relay service watches
/// `OracleRequest` and the front-end renders the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    OperatingStatusChanged {
        operational: bool,
    },
    AirlineRegistered {
        airline: Address,
        name: String,
        sponsor: Address,
    },
    AirlineVoted {
        candidate: Address,
        voter: Address,
        votes: usize,
        required: usize,
    },
    AirlineFunded {
        airline: Address,
        amount: Amount,
        total: Amount,
    },
    FlightRegistered {
        airline: Address,
        flight: String,
    },
    InsurancePurchased {
        passenger: Address,
        flight: String,
        premium: Amount,
    },
    OracleRegistered {
        oracle: Address,
        indexes: Vec<u8>,
    },
    OracleRequest {
        index: u8,
        airline: Address,
        flight: String,
        timestamp: Timestamp,
    },
    OracleReport {
        oracle: Address,
        index: u8,
        airline: Address,
        flight: String,
        timestamp: Timestamp,
        status: FlightStatus,
    },
    FlightStatusInfo {
        airline: Address,
        flight: String,
        timestamp: Timestamp,
        status: FlightStatus,
    },
    PassengerCredited {
        passenger: Address,
        flight: String,
        amount: Amount,
    },
    PassengerPaid {
        passenger: Address,
        amount: Amount,
    },
}

impl Event {
    /// Short name used by the CLI and in logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::OperatingStatusChanged { .. } => "OperatingStatusChanged",
            Event::AirlineRegistered { .. } => "AirlineRegistered",
            Event::AirlineVoted { .. } => "AirlineVoted",
            Event::AirlineFunded { .. } => "AirlineFunded",
            Event::FlightRegistered { .. } => "FlightRegistered",
            Event::InsurancePurchased { .. } => "InsurancePurchased",
            Event::OracleRegistered { .. } => "OracleRegistered",
            Event::OracleRequest { .. } => "OracleRequest",
            Event::OracleReport { .. } => "OracleReport",
            Event::FlightStatusInfo { .. } => "FlightStatusInfo",
            Event::PassengerCredited { .. } => "PassengerCredited",
            Event::PassengerPaid { .. } => "PassengerPaid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let event = Event::OracleRequest {
            index: 4,
            airline: Address::from_low_u64(1),
            flight: "AA100".to_string(),
            timestamp: 123,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "oracle_request");
        assert_eq!(value["index"], 4);
        assert_eq!(event.name(), "OracleRequest");
    }
}
