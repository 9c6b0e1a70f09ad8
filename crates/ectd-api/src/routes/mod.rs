//! # API Route Modules
//!
//! - `profiles`: regional profile lookup and mandatory-module queries.
//! - `acknowledgements`: acknowledgement registration, submission, gateway
//!   event ingestion, and status.

pub mod acknowledgements;
pub mod profiles;
