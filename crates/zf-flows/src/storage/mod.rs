//! File storage backends.
//!
//! Both clients implement [`zf_core::FileRemover`], which is all the order
//! provider needs for attachment cleanup.

pub mod drive;
pub mod s3;
pub mod sigv4;

pub use drive::{DriveClient, DriveFile};
pub use s3::{object_key, ObjectInfo, ObjectStorage, StoredObject};
