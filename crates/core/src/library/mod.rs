//! Library scanning - turns the on-disk library into a snapshot.
//!
//! Layout: one directory per show directly under the library root, episode
//! files directly inside each show directory.

mod error;
mod scanner;

pub use error::ScanError;
pub use scanner::{natural_cmp, LibraryScanner};
