pub mod courrier;
pub mod dashboard;
pub mod import;
