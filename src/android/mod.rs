//! Android package containers: the APK/XAPK archive and the compiled
//! resource table.

pub mod apk;
pub mod resources;
pub mod zip;

pub use apk::{Apk, ApkError};
pub use resources::{ResourceError, ResourceTable};
