//! Correspondence ("courrier") tracking core: registration, imputation to
//! services, status lifecycle, due dates and dashboard aggregation.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
