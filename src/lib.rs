//! Locate offline-finding beacons: derive the rotating advertisement keys a beacon
//! broadcast during a time window, fetch the encrypted location reports filed
//! against them and decrypt those reports into coordinates.

#![no_std]
#![warn(missing_docs)]

#[macro_use]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

/// Advertisement key schedules of rotating accessories.
pub mod accessory;
/// Error types shared across the crate.
pub mod error;
/// An offline finding finder device, which seals location reports.
pub mod finder;
/// Beacon identities and the ephemeral sub-keys derived from them.
pub mod keys;
/// JSON and GeoJSON rendering of decoded locations.
#[cfg(feature = "std")]
pub mod output;
/// An offline finding owner device, which decrypts location reports.
pub mod owner;
/// Structs that capture aspects of the offline finding wire protocol.
pub mod protocol;
/// Aggregation of sub-keys into report queries and batch decoding of results.
pub mod query;
/// Tools for interfacing with the report servers, e.g. to fetch reports.
#[cfg(feature = "std")]
pub mod server;

pub use p224;
