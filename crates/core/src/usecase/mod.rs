pub mod app_service;
pub mod download;
pub mod job_poller;
