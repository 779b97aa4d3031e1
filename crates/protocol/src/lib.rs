//! Shared wire constants and data types for sunpoll.
//!
//! Everything that has to stay bit-exact with the inverter family lives in
//! [`constants`]; [`command`] describes a raw UDP request and [`sensor`] the
//! telemetry snapshot handed around by the coordinator.

pub mod command;
pub mod constants;
pub mod sensor;

pub use command::{CommandResponse, ProtocolCommand, ResponseValidator, UdpTarget};
pub use sensor::{RuntimeData, SensorValue, Snapshot};
