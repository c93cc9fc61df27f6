pub mod access;
pub mod airline;
pub mod config;
pub mod errors;
pub mod events;
pub mod flight;
pub mod insurance;
pub mod oracle;
pub mod primitives;
pub mod simulation;
pub mod surety;
pub mod utils;

// Re-export commonly used items
pub use config::SuretyConfig;
pub use errors::{SuretyError, SuretyResult};
pub use events::Event;
pub use insurance::{PayoutSink, RecordingPayoutSink};
pub use oracle::ResponseOutcome;
pub use primitives::{Address, Amount, CallContext, FlightStatus, Timestamp, UNIT};
pub use surety::FlightSurety;
