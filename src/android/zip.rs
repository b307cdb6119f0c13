use log::warn;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::{Component, Path};
use zip::read::ZipArchive;

// Caps on the up-front buffer for one entry. Deflate cannot expand beyond
// about 1032:1, and the declared size is only a hint.
const MAX_PREALLOCATED: u64 = 16 * 1024 * 1024;
const MAX_COMPRESSION_RATIO: u64 = 1032;

/// Result alias for APK (ZIP) operations.
pub type ApkZipResult<T> = Result<T, ApkZipError>;

/// Errors surfaced while reading an APK or XAPK archive.
#[derive(Debug)]
pub enum ApkZipError {
    Io(io::Error),
    Zip(zip::result::ZipError),
    InvalidInput(String),
}

impl std::fmt::Display for ApkZipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApkZipError::Io(err) => write!(f, "I/O error: {err}"),
            ApkZipError::Zip(err) => write!(f, "ZIP error: {err}"),
            ApkZipError::InvalidInput(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ApkZipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApkZipError::Io(err) => Some(err),
            ApkZipError::Zip(err) => Some(err),
            ApkZipError::InvalidInput(_) => None,
        }
    }
}

impl From<io::Error> for ApkZipError {
    fn from(value: io::Error) -> Self {
        ApkZipError::Io(value)
    }
}

impl From<zip::result::ZipError> for ApkZipError {
    fn from(value: zip::result::ZipError) -> Self {
        ApkZipError::Zip(value)
    }
}

/// A single file entry stored in [`ApkArchive`].
#[derive(Clone, Debug)]
pub struct ApkEntry {
    /// Normalized path, `/`-separated
    pub name: String,
    pub data: Vec<u8>,
}

impl ApkEntry {
    /// Final path component, e.g. `base.apk` for `splits/base.apk`.
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn has_extension(&self, ext: &str) -> bool {
        self.file_name()
            .rsplit_once('.')
            .map_or(false, |(_, e)| e.eq_ignore_ascii_case(ext))
    }
}

/// The file entries of an APK (ZIP) archive, held in memory in archive
/// order. Directory entries are dropped.
#[derive(Clone, Debug, Default)]
pub struct ApkArchive {
    entries: Vec<ApkEntry>,
    by_name: BTreeMap<String, usize>,
}

impl ApkArchive {
    /// Read an archive from a byte buffer.
    pub fn from_bytes(bytes: &[u8]) -> ApkZipResult<Self> {
        Self::read(io::Cursor::new(bytes))
    }

    /// Load an archive from disk into memory.
    pub fn from_file(path: impl AsRef<Path>) -> ApkZipResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::read(file)
    }

    fn read<R: Read + Seek>(reader: R) -> ApkZipResult<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut apk = ApkArchive::default();
        for idx in 0..archive.len() {
            let mut entry = archive.by_index(idx)?;
            if entry.is_dir() {
                continue;
            }
            let Some(enclosed) = entry.enclosed_name() else {
                warn!("Skipping archive entry with unsafe path {}", entry.name());
                continue;
            };
            let name = path_to_entry_name(&enclosed)?;
            let declared = entry.size();
            let capacity = declared
                .min(entry.compressed_size().saturating_mul(MAX_COMPRESSION_RATIO))
                .min(MAX_PREALLOCATED);
            let mut data = Vec::with_capacity(capacity as usize);
            (&mut entry).take(declared).read_to_end(&mut data)?;
            if data.len() as u64 != declared {
                return Err(ApkZipError::InvalidInput(format!(
                    "entry {name} declares {declared} bytes but holds {}",
                    data.len()
                )));
            }
            apk.push(ApkEntry { name, data });
        }
        Ok(apk)
    }

    fn push(&mut self, entry: ApkEntry) {
        // Later duplicates shadow earlier ones by name, both stay iterable.
        self.by_name.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
    }

    /// Iterate over entries in archive order.
    pub fn entries(&self) -> impl Iterator<Item = &ApkEntry> {
        self.entries.iter()
    }

    /// Iterate over entry names in archive order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Borrow an entry by name (e.g., `classes.dex`).
    pub fn entry(&self, name: &str) -> Option<&ApkEntry> {
        self.by_name.get(name).map(|idx| &self.entries[*idx])
    }

    /// Entries with the given file extension, in archive order.
    pub fn entries_with_extension<'a>(&'a self, ext: &'a str) -> impl Iterator<Item = &'a ApkEntry> + 'a {
        self.entries.iter().filter(move |e| e.has_extension(ext))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn path_to_entry_name(path: &Path) -> ApkZipResult<String> {
    let mut components = Vec::new();
    for comp in path.components() {
        match comp {
            Component::Normal(part) => components.push(part.to_string_lossy().replace('\\', "/")),
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) | Component::ParentDir => {
                return Err(ApkZipError::InvalidInput(format!(
                    "invalid entry path component in {}",
                    path.display()
                )));
            }
        }
    }
    if components.is_empty() {
        return Err(ApkZipError::InvalidInput("entry name must not be empty".to_string()));
    }
    Ok(components.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn archive(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(io::Cursor::new(Vec::new()));
        for (name, data) in files {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.add_directory("assets/", SimpleFileOptions::default()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn reads_entries_in_archive_order() {
        let bytes = archive(&[("classes2.dex", b"two"), ("classes.dex", b"one"), ("res/a.arsc", b"arsc")]);
        let apk = ApkArchive::from_bytes(&bytes).unwrap();
        assert_eq!(apk.len(), 3);
        assert_eq!(apk.entry_names().collect::<Vec<_>>(), ["classes2.dex", "classes.dex", "res/a.arsc"]);
        assert_eq!(apk.entry("classes.dex").unwrap().data, b"one");
        assert!(apk.entry("assets/").is_none());
    }

    #[test]
    fn entry_name_helpers() {
        let bytes = archive(&[("res/strings.ARSC", b""), ("base.apk", b"")]);
        let apk = ApkArchive::from_bytes(&bytes).unwrap();
        let arsc = apk.entry("res/strings.ARSC").unwrap();
        assert_eq!(arsc.file_name(), "strings.ARSC");
        assert!(arsc.has_extension("arsc"));
        assert_eq!(apk.entries_with_extension("apk").count(), 1);
    }

    #[test]
    fn rejects_non_zip_input() {
        assert!(matches!(ApkArchive::from_bytes(b"not a zip"), Err(ApkZipError::Zip(_))));
    }

    /// A stored `classes.dex` holding 4 bytes whose zip64 extra field
    /// declares `declared` uncompressed bytes.
    fn zip64_entry(declared: u64) -> Vec<u8> {
        const NAME: &[u8] = b"classes.dex";
        const DATA: &[u8] = b"dex\n";
        const CRC: u32 = 0xdc2f_ac63;
        let mut extra = Vec::new();
        extra.extend_from_slice(&1u16.to_le_bytes());
        extra.extend_from_slice(&8u16.to_le_bytes());
        extra.extend_from_slice(&declared.to_le_bytes());

        let mut out = Vec::new();
        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&45u16.to_le_bytes());
        out.extend_from_slice(&[0; 8]); // flags, method, time, date
        out.extend_from_slice(&CRC.to_le_bytes());
        out.extend_from_slice(&(DATA.len() as u32).to_le_bytes());
        out.extend_from_slice(&u32::MAX.to_le_bytes());
        out.extend_from_slice(&(NAME.len() as u16).to_le_bytes());
        out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        out.extend_from_slice(NAME);
        out.extend_from_slice(&extra);
        out.extend_from_slice(DATA);

        let central_offset = out.len() as u32;
        out.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        out.extend_from_slice(&45u16.to_le_bytes());
        out.extend_from_slice(&45u16.to_le_bytes());
        out.extend_from_slice(&[0; 8]);
        out.extend_from_slice(&CRC.to_le_bytes());
        out.extend_from_slice(&(DATA.len() as u32).to_le_bytes());
        out.extend_from_slice(&u32::MAX.to_le_bytes());
        out.extend_from_slice(&(NAME.len() as u16).to_le_bytes());
        out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        out.extend_from_slice(&[0; 10]); // comment, disk, attributes
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(NAME);
        out.extend_from_slice(&extra);
        let central_size = out.len() as u32 - central_offset;

        out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&central_size.to_le_bytes());
        out.extend_from_slice(&central_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    #[test]
    fn oversized_declared_length_is_an_error() {
        assert_eq!(zip64_entry(0).len(), 148);
        for declared in [1u64 << 45, 1 << 63, u64::MAX] {
            assert!(ApkArchive::from_bytes(&zip64_entry(declared)).is_err(), "{declared}");
        }
    }

    #[test]
    fn rejects_parent_components() {
        assert!(path_to_entry_name(Path::new("../evil")).is_err());
        assert_eq!(path_to_entry_name(Path::new("./a/b.dex")).unwrap(), "a/b.dex");
    }
}
