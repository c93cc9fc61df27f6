mod common;

use common::*;
use flight_surety_core::simulation::oracle_address;
use flight_surety_core::{CallContext, FlightStatus, ResponseOutcome, SuretyError, UNIT};

#[test]
fn test_registration_fee_enforced() {
    let (surety, _) = deploy_with_flight();
    let fee = surety.registration_fee();
    assert_eq!(fee, UNIT);

    let err = surety
        .register_oracle(&CallContext::with_value(oracle_address(0), fee - 1))
        .unwrap_err();
    assert!(matches!(err, SuretyError::InsufficientFunds { .. }));

    assert!(!surety.is_oracle_registered(&oracle_address(0)));

    let indexes = surety
        .register_oracle(&CallContext::with_value(oracle_address(0), fee))
        .unwrap();
    assert_eq!(indexes.len(), 3);
    assert!(surety.is_oracle_registered(&oracle_address(0)));
    assert_eq!(
        surety.get_my_indexes(&CallContext::new(oracle_address(0))).unwrap(),
        indexes
    );

    let err = surety
        .register_oracle(&CallContext::with_value(oracle_address(0), fee))
        .unwrap_err();
    assert!(matches!(err, SuretyError::AlreadyRegistered(_)));

    let err = surety
        .get_my_indexes(&CallContext::new(oracle_address(1)))
        .unwrap_err();
    assert!(matches!(err, SuretyError::AccessDenied(_)));
}

#[test]
fn test_first_status_to_reach_quorum_wins() {
    let (surety, _) = deploy_with_flight();
    let index = surety
        .fetch_flight_status(&CallContext::new(owner()), &first_airline(), FLIGHT, DEPARTURE)
        .unwrap();
    let holders = oracles_holding(&surety, 50, index);
    assert!(holders.len() >= 4, "only {} oracles hold index {}", holders.len(), index);

    let respond = |ctx: &CallContext, status| {
        surety.submit_oracle_response(ctx, index, &first_airline(), FLIGHT, DEPARTURE, status)
    };

    assert!(matches!(
        respond(&holders[0], FlightStatus::LateWeather).unwrap(),
        ResponseOutcome::Pending { votes: 1, required: 3 }
    ));
    assert!(matches!(
        respond(&holders[1], FlightStatus::OnTime).unwrap(),
        ResponseOutcome::Pending { votes: 1, .. }
    ));
    assert!(matches!(
        respond(&holders[2], FlightStatus::LateWeather).unwrap(),
        ResponseOutcome::Pending { votes: 2, .. }
    ));

    let err = respond(&holders[0], FlightStatus::LateWeather).unwrap_err();
    assert!(matches!(err, SuretyError::DuplicateVote(_)));

    assert_eq!(
        respond(&holders[3], FlightStatus::LateWeather).unwrap(),
        ResponseOutcome::Resolved(FlightStatus::LateWeather)
    );
    assert_eq!(surety.get_flight(FLIGHT).unwrap().status, FlightStatus::LateWeather);
    let group = surety
        .get_oracle_request(index, &first_airline(), FLIGHT, DEPARTURE)
        .unwrap();
    assert_eq!(group.resolved, Some(FlightStatus::LateWeather));
    assert_eq!(group.votes_for(FlightStatus::LateWeather), 3);

    if let Some(late) = holders.get(4) {
        assert_eq!(
            respond(late, FlightStatus::LateAirline).unwrap(),
            ResponseOutcome::AlreadyResolved
        );
        assert_eq!(surety.get_flight(FLIGHT).unwrap().status, FlightStatus::LateWeather);
    }
}

#[test]
fn test_response_requires_assigned_index_and_open_request() {
    let (surety, _) = deploy_with_flight();
    let fee = surety.registration_fee();
    let oracle = CallContext::with_value(oracle_address(0), fee);
    let indexes = surety.register_oracle(&oracle).unwrap();

    let foreign = (0..10u8).find(|i| !indexes.contains(i)).unwrap();
    let on_time = FlightStatus::OnTime;
    let err = surety
        .submit_oracle_response(&oracle, foreign, &first_airline(), FLIGHT, DEPARTURE, on_time)
        .unwrap_err();
    assert!(matches!(err, SuretyError::AccessDenied(_)));

    // Nothing requested yet for this key
    let err = surety
        .submit_oracle_response(&oracle, indexes[0], &first_airline(), FLIGHT, DEPARTURE, on_time)
        .unwrap_err();
    assert!(matches!(err, SuretyError::UnknownRequest));
}

#[test]
fn test_oracle_fees_stay_accounted() {
    let (surety, _) = deploy_with_flight();
    let before = surety.contract_balance();
    oracles_holding(&surety, 5, 0);
    assert_eq!(surety.contract_balance(), before + 5 * surety.registration_fee());
    assert!(surety.is_balanced());
}
