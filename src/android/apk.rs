//! APK and XAPK loading.
//!
//! An APK is read as a ZIP archive: every `.dex` entry is parsed into a
//! [`DexFile`], every `.arsc` entry into a [`ResourceTable`], and the binary
//! manifest is kept undecoded. An XAPK bundle is detected when the archive
//! holds no DEX and manifest pair, in which case the base APK inside it is
//! loaded instead.

use log::{debug, info, warn};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

use crate::android::resources::{ResourceError, ResourceTable};
use crate::android::zip::{ApkArchive, ApkEntry, ApkZipError};
use crate::config::ParseConfig;
use crate::dex::error::DexError;
use crate::dex::resolver::placeholder_resource_id;
use crate::dex::DexFile;

const MANIFEST_NAME: &str = "AndroidManifest.xml";

/// Errors surfaced while loading a package; one variant per stage.
#[derive(Debug)]
pub enum ApkError {
    /// The outer archive could not be read.
    Zip(ApkZipError),
    /// The bundle holds no base APK.
    ApkNotFoundInXapk,
    /// The base APK inside a bundle could not be read.
    InnerApk(ApkZipError),
    Dex { entry: String, source: DexError },
    Resource { entry: String, source: ResourceError },
}

impl std::fmt::Display for ApkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApkError::Zip(err) => write!(f, "open zip: {err}"),
            ApkError::ApkNotFoundInXapk => write!(f, "apk not found in xapk"),
            ApkError::InnerApk(err) => write!(f, "extract apk from xapk: {err}"),
            ApkError::Dex { entry, source } => write!(f, "read dex {entry}: {source}"),
            ApkError::Resource { entry, source } => write!(f, "read resource file {entry}: {source}"),
        }
    }
}

impl std::error::Error for ApkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApkError::Zip(err) | ApkError::InnerApk(err) => Some(err),
            ApkError::ApkNotFoundInXapk => None,
            ApkError::Dex { source, .. } => Some(source),
            ApkError::Resource { source, .. } => Some(source),
        }
    }
}

impl From<ApkZipError> for ApkError {
    fn from(value: ApkZipError) -> Self {
        ApkError::Zip(value)
    }
}

/// A loaded application package.
#[derive(Debug, Default)]
pub struct Apk {
    /// `AndroidManifest.xml` as stored, in binary XML form
    pub manifest: Vec<u8>,
    /// DEX files in archive order, each with its entry name as filename
    pub dex_files: Vec<DexFile>,
    pub resources: Vec<ResourceTable>,
}

impl Apk {
    pub fn from_file(path: impl AsRef<Path>, config: ParseConfig) -> Result<Apk, ApkError> {
        let archive = ApkArchive::from_file(path)?;
        Apk::from_archive(archive, config)
    }

    pub fn from_bytes(bytes: &[u8], config: ParseConfig) -> Result<Apk, ApkError> {
        let archive = ApkArchive::from_bytes(bytes)?;
        Apk::from_archive(archive, config)
    }

    pub fn from_archive(archive: ApkArchive, config: ParseConfig) -> Result<Apk, ApkError> {
        let archive = if has_dex_and_manifest(&archive) { archive } else { extract_base_apk(&archive)? };

        let mut apk = Apk::default();
        for entry in archive.entries() {
            if entry.name.ends_with(MANIFEST_NAME) {
                apk.manifest = entry.data.clone();
            } else if entry.has_extension("dex") {
                apk.read_dex(entry, &config)?;
            } else if entry.has_extension("arsc") {
                apk.read_resources(entry, &config)?;
            }
        }

        info!(
            "Loaded package: {} dex files, {} resource tables",
            apk.dex_files.len(),
            apk.resources.len()
        );
        Ok(apk)
    }

    fn read_dex(&mut self, entry: &ApkEntry, config: &ParseConfig) -> Result<(), ApkError> {
        match DexFile::from_bytes_with_config(&entry.data, config) {
            Ok(mut dex) => {
                debug!("Parsed {}: {} classes", entry.name, dex.classes.len());
                dex.filename = Some(entry.name.clone());
                self.dex_files.push(dex);
                Ok(())
            }
            Err(source) if config.fail_on_invalid_dex => Err(ApkError::Dex { entry: entry.name.clone(), source }),
            Err(source) => {
                warn!("Skipping {}: {}", entry.name, source);
                Ok(())
            }
        }
    }

    fn read_resources(&mut self, entry: &ApkEntry, config: &ParseConfig) -> Result<(), ApkError> {
        match ResourceTable::from_bytes(&entry.data) {
            Ok(table) => {
                self.resources.push(table);
                Ok(())
            }
            Err(source) if config.fail_on_invalid_resource => {
                Err(ApkError::Resource { entry: entry.name.clone(), source })
            }
            Err(source) => {
                warn!("Skipping {}: {}", entry.name, source);
                Ok(())
            }
        }
    }

    /// Argument tuples of calls matching `pattern` across every DEX file,
    /// each distinct tuple once.
    pub fn method_arguments(&self, pattern: &Regex) -> Result<Vec<Vec<String>>, DexError> {
        let mut seen = HashSet::new();
        let mut out = vec![];
        for dex in &self.dex_files {
            dex.collect_method_arguments(pattern, &mut seen, &mut out).map_err(|e| {
                DexError::with_context(e, dex.filename.clone().unwrap_or_else(|| "dex".to_string()))
            })?;
        }
        Ok(out)
    }

    /// The string resource with `id`, from the first table that has it.
    pub fn resource_string(&self, id: u32) -> Option<&str> {
        self.resources.iter().find_map(|table| table.string_by_id(id))
    }

    /// Replace `{{resolve_from_resource}}:<id>` placeholders with the
    /// resource string; placeholders without a matching resource stay.
    pub fn resolve_resource_if_needed(&self, mut arguments: Vec<Vec<String>>) -> Vec<Vec<String>> {
        for argument in arguments.iter_mut().flatten() {
            let Some(id) = placeholder_resource_id(argument) else {
                continue;
            };
            if let Some(value) = self.resource_string(id) {
                *argument = value.to_string();
            }
        }
        arguments
    }

    /// Constant strings of every DEX file, each once, in file and table order.
    pub fn const_strings(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.dex_files
            .iter()
            .flat_map(DexFile::const_strings)
            .filter(|s| seen.insert(*s))
            .collect()
    }
}

fn has_dex_and_manifest(archive: &ApkArchive) -> bool {
    let has_dex = archive.entries().any(|e| e.has_extension("dex"));
    let has_manifest = archive.entry_names().any(|n| n.ends_with(MANIFEST_NAME));
    has_dex && has_manifest
}

/// The base APK of a bundle: the first `.apk` that is not a `config.` split
/// and whose file name has more than one dot (`com.example.app.apk`).
fn extract_base_apk(archive: &ApkArchive) -> Result<ApkArchive, ApkError> {
    let base = archive.entries_with_extension("apk").find(|e| {
        let name = e.file_name();
        !name.starts_with("config.") && name.matches('.').count() > 1
    });
    let Some(base) = base else {
        return Err(ApkError::ApkNotFoundInXapk);
    };
    debug!("Loading {} from bundle", base.name);
    ApkArchive::from_bytes(&base.data).map_err(ApkError::InnerApk)
}
