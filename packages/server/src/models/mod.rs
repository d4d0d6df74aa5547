pub mod auth;
pub mod challenge;
pub mod editor;
pub mod evaluation;
pub mod shared;
