pub mod challenge;
pub mod challenge_config;
pub mod job;
pub mod method;
pub mod result;
pub mod submission;
pub mod upload;
pub mod user;
