mod error;

pub mod filesystem;
pub mod naming;
pub mod thumbnail;

pub use error::StorageError;
pub use filesystem::UploadStore;
pub use thumbnail::{THUMBNAIL_SIZE, create_thumbnail};
