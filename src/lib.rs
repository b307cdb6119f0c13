//! # Android decompiler
//!
//! A library for reading Android application packages: DEX classes, fields,
//! methods and their decoded instructions, constant values flowing into
//! call sites, and string resources from the compiled resource table.
//!
//! ```no_run
//!  use android_decompiler::android::Apk;
//!  use android_decompiler::config::ParseConfig;
//!  use regex::Regex;
//!
//!  let apk = Apk::from_file("app.apk", ParseConfig::default()).unwrap();
//!  let toast = Regex::new(r"^Landroid/widget/Toast;->makeText\(").unwrap();
//!  let calls = apk.method_arguments(&toast).unwrap();
//!  for args in apk.resolve_resource_if_needed(calls) {
//!      println!("{:?}", args);
//!  }
//! ```

#[macro_use]
pub mod dex;
pub mod android;
pub mod config;
pub mod types;

pub use android::{Apk, ApkError, ResourceTable};
pub use config::ParseConfig;
pub use dex::DexFile;

#[cfg(test)]
mod tests;
