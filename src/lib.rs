// Haven - Crisis and mental-state detection engine
// Library exports

pub mod config;
pub mod crisis; // Detector, rule tables, response composition
pub mod errors;
pub mod metrics; // Detection log and Prometheus counters
pub mod server; // HTTP daemon mode
