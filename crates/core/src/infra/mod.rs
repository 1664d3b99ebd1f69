pub mod metrics;
pub mod opener;
pub mod service;
