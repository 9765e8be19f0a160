//! Cross-component scenarios: publisher → broker → source.

pub mod delivery;
pub mod observability;
pub mod scenarios;
