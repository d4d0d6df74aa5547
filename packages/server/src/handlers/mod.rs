pub mod auth;
pub mod challenge;
pub mod debug;
pub mod editor;
pub mod evaluation;
pub mod files;
