//! Where photos are written and what they are called.

mod naming;
mod output;

pub use naming::{CapturedPhotoFile, FILENAME_FORMAT, PHOTO_EXTENSION};
pub use output::{OutputDirectory, StorageError, StorageLocation};
