pub mod filename;
pub mod hash;
pub mod html;
pub mod jwt;
pub mod media;
pub mod permissions;
