//! Geofence save flow.
//!
//! # Responsibility
//! - Model permission, location-settings and geofence registration steps as
//!   one explicit state machine ([`machine::SaveFlow`]).
//! - Define the platform ports the host implements ([`platform`]).
//! - Run the machine against those ports and persist through the editor
//!   ([`driver::run_save_flow`]).
//!
//! # Invariants
//! - Every platform call is one command/input edge of the machine.
//! - Registration failures stall the flow; they never persist implicitly.

pub mod driver;
pub mod geofence;
pub mod machine;
pub mod permission;
pub mod platform;
