pub mod cost;
pub mod error;
pub mod job;
pub mod scene;
pub mod settings;
pub mod stage;
pub mod types;
