//! Listing lifecycle core for a real-estate agency: properties, offers,
//! tags and types, their write-time constraints, and the sell / cancel /
//! accept / refuse workflow.

pub mod config;
pub mod error;
pub mod listings;
pub mod telemetry;
