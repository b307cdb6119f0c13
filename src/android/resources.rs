//! Reader for the compiled resource table (`resources.arsc`).
//!
//! Only string resources are indexed: for every package, the type chunks of
//! the type named `string` are walked and each entry holding a string value
//! is recorded under its packed resource id and under its key name. Other
//! resource types, configurations beyond the first entry seen, and bag
//! (complex) values are not resolved.

use log::{debug, trace, warn};
use serde::Serialize;
use std::collections::HashMap;

use crate::dex::cursor::Cursor;
use crate::dex::error::DexError;

const RES_STRING_POOL_TYPE: u16 = 0x0001;
const RES_TABLE_TYPE: u16 = 0x0002;
const RES_TABLE_PACKAGE_TYPE: u16 = 0x0200;
const RES_TABLE_TYPE_TYPE: u16 = 0x0201;
const RES_TABLE_TYPE_SPEC_TYPE: u16 = 0x0202;

const CHUNK_HEADER_SIZE: usize = 8;
const STRING_FLAG_UTF8: u32 = 0x0000_0100;

const TYPE_FLAG_SPARSE: u8 = 0x01;
const TYPE_FLAG_OFFSET16: u8 = 0x02;

const ENTRY_FLAG_COMPLEX: u16 = 0x0001;
const ENTRY_FLAG_COMPACT: u16 = 0x0008;

const NO_ENTRY: u32 = 0xFFFF_FFFF;
const NO_ENTRY16: u16 = 0xFFFF;

/// `Res_value` data type of a string pool reference.
pub const TYPE_STRING: u8 = 0x03;

/// Result alias for resource table operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors surfaced while reading a resource table.
#[derive(Debug)]
pub enum ResourceError {
    /// The table is missing the expected structure.
    Malformed(String),
    /// A chunk of one specific type was required here.
    UnexpectedChunk { expected: u16, found: u16 },
    /// An entry or offset table reaches past the end of its type chunk, which
    /// packers that mangle resource tables tend to produce.
    Obfuscated { offset: usize, chunk_end: usize },
    /// A read or seek failed.
    Read(DexError),
}

impl std::fmt::Display for ResourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceError::Malformed(msg) => write!(f, "Malformed resource table: {msg}"),
            ResourceError::UnexpectedChunk { expected, found } => {
                write!(f, "Expected chunk type 0x{expected:04x}, found 0x{found:04x}")
            }
            ResourceError::Obfuscated { offset, chunk_end } => write!(
                f,
                "Invalid offset 0x{offset:x} at or past chunk end 0x{chunk_end:x}, table is likely obfuscated"
            ),
            ResourceError::Read(err) => write!(f, "Read error: {err}"),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Read(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DexError> for ResourceError {
    fn from(value: DexError) -> Self {
        ResourceError::Read(value)
    }
}

/// Pack a resource id: `0xPPTTEEEE`.
pub fn resource_id(package_id: u32, type_id: u8, entry_id: u16) -> u32 {
    ((package_id & 0xff) << 24) | ((type_id as u32) << 16) | entry_id as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChunkHeader {
    chunk_type: u16,
    header_size: u16,
    chunk_size: u32,
    start: usize,
}

impl ChunkHeader {
    fn read(cursor: &mut Cursor<'_>) -> ResourceResult<ChunkHeader> {
        let start = cursor.position();
        let chunk_type = cursor.read_u16()?;
        let header_size = cursor.read_u16()?;
        let chunk_size = cursor.read_u32()?;
        if (header_size as usize) < CHUNK_HEADER_SIZE || chunk_size < header_size as u32 {
            return Err(ResourceError::Malformed(format!(
                "Invalid sizing for chunk 0x{chunk_type:04x} at 0x{start:x}: header {header_size}, size {chunk_size}"
            )));
        }
        let header = ChunkHeader { chunk_type, header_size, chunk_size, start };
        if header.end() > cursor.len() {
            return Err(ResourceError::Malformed(format!(
                "Chunk 0x{chunk_type:04x} at 0x{start:x} extends past end of table"
            )));
        }
        Ok(header)
    }

    fn end(&self) -> usize {
        self.start + self.chunk_size as usize
    }

    fn body_start(&self) -> usize {
        self.start + self.header_size as usize
    }

    fn expect(&self, expected: u16) -> ResourceResult<()> {
        if self.chunk_type != expected {
            return Err(ResourceError::UnexpectedChunk { expected, found: self.chunk_type });
        }
        Ok(())
    }
}

/// A string pool whose strings are decoded on demand.
#[derive(Debug, Clone, Default)]
pub struct StringPool {
    flags: u32,
    strings_start: usize,
    offsets: Vec<u32>,
}

impl StringPool {
    /// Read a pool whose chunk header has just been read.
    fn read(cursor: &mut Cursor<'_>, header: &ChunkHeader) -> ResourceResult<StringPool> {
        header.expect(RES_STRING_POOL_TYPE)?;
        let string_count = cursor.read_u32()? as usize;
        let _style_count = cursor.read_u32()?;
        let flags = cursor.read_u32()?;
        let strings_start = cursor.read_u32()? as usize;
        let _styles_start = cursor.read_u32()?;

        cursor.seek(header.body_start())?;
        cursor.check_count(string_count, 4)?;
        let mut offsets = Vec::with_capacity(string_count);
        for _ in 0..string_count {
            offsets.push(cursor.read_u32()?);
        }

        Ok(StringPool { flags, strings_start: header.start + strings_start, offsets })
    }

    pub fn is_utf8(&self) -> bool {
        (self.flags & STRING_FLAG_UTF8) != 0
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Decode string `idx`. None when the index is outside the pool; strings
    /// stored with the long length encoding come back empty.
    pub fn get(&self, cursor: &mut Cursor<'_>, idx: u32) -> ResourceResult<Option<String>> {
        let Some(offset) = self.offsets.get(idx as usize) else {
            return Ok(None);
        };
        cursor.seek(self.strings_start + *offset as usize)?;
        let text = if self.is_utf8() { read_utf8_string(cursor)? } else { read_utf16_string(cursor)? };
        Ok(Some(text))
    }
}

fn read_utf16_string(cursor: &mut Cursor<'_>) -> ResourceResult<String> {
    let length = cursor.read_u16()?;
    if (length & 0x8000) != 0 {
        return Ok(String::new());
    }
    let mut units = Vec::with_capacity(length as usize);
    for _ in 0..length {
        units.push(cursor.read_u16()?);
    }
    Ok(String::from_utf16_lossy(&units))
}

fn read_utf8_string(cursor: &mut Cursor<'_>) -> ResourceResult<String> {
    let char_len = cursor.read_u8()?;
    if (char_len & 0x80) != 0 {
        return Ok(String::new());
    }
    let byte_len = cursor.read_u8()?;
    if (byte_len & 0x80) != 0 {
        return Ok(String::new());
    }
    let bytes = cursor.read_bytes(byte_len as usize)?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// A package declared in the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourcePackage {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone)]
struct PackageHeader {
    id: u32,
    name: String,
    type_strings: u32,
    key_strings: u32,
}

impl PackageHeader {
    fn read(cursor: &mut Cursor<'_>) -> ResourceResult<PackageHeader> {
        let id = cursor.read_u32()?;
        let mut units = Vec::with_capacity(128);
        for _ in 0..128 {
            units.push(cursor.read_u16()?);
        }
        let name_len = units.iter().position(|u| *u == 0).unwrap_or(units.len());
        let name = String::from_utf16_lossy(&units[..name_len]);
        let type_strings = cursor.read_u32()?;
        let _last_public_type = cursor.read_u32()?;
        let key_strings = cursor.read_u32()?;
        let _last_public_key = cursor.read_u32()?;

        Ok(PackageHeader { id, name, type_strings, key_strings })
    }
}

/// One entry of a type chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeEntry {
    pub flags: u16,
    /// Index into the package's key string pool
    pub key: u32,
    pub data_type: u8,
    /// Zero for complex entries
    pub data: u32,
}

impl TypeEntry {
    pub fn is_complex(&self) -> bool {
        (self.flags & ENTRY_FLAG_COMPLEX) != 0
    }

    pub fn is_compact(&self) -> bool {
        (self.flags & ENTRY_FLAG_COMPACT) != 0
    }
}

#[derive(Debug, Clone)]
struct TypeChunk {
    id: u8,
    entries_start: usize,
    chunk_end: usize,
    /// (entry id, offset from `entries_start`)
    offsets: Vec<(u16, u32)>,
}

impl TypeChunk {
    fn read(cursor: &mut Cursor<'_>, header: &ChunkHeader) -> ResourceResult<TypeChunk> {
        let id = cursor.read_u8()?;
        let flags = cursor.read_u8()?;
        let _reserved = cursor.read_u16()?;
        let entry_count = cursor.read_u32()? as usize;
        let entries_start = header.start + cursor.read_u32()? as usize;
        let chunk_end = header.end();

        if id == 0 {
            return Err(ResourceError::Malformed(format!("Type chunk at 0x{:x} has type id 0", header.start)));
        }

        let sparse = (flags & TYPE_FLAG_SPARSE) != 0;
        let offset16 = (flags & TYPE_FLAG_OFFSET16) != 0;
        let offset_size = if offset16 && !sparse { 2 } else { 4 };

        // The offset table sits right after the header and its ResTable_config.
        let table_start = header.body_start();
        let table_end = entry_count
            .checked_mul(offset_size)
            .and_then(|n| n.checked_add(table_start))
            .unwrap_or(usize::MAX);
        if table_end > chunk_end {
            return Err(ResourceError::Obfuscated { offset: table_end, chunk_end });
        }
        cursor.seek(table_start)?;

        let mut offsets = Vec::with_capacity(entry_count);
        for i in 0..entry_count {
            if sparse {
                let idx = cursor.read_u16()?;
                let offset = cursor.read_u16()?;
                offsets.push((idx, offset as u32 * 4));
                continue;
            }

            let offset = if offset16 {
                match cursor.read_u16()? {
                    NO_ENTRY16 => continue,
                    offset => offset as u32 * 4,
                }
            } else {
                match cursor.read_u32()? {
                    NO_ENTRY => continue,
                    offset => offset,
                }
            };
            let idx = u16::try_from(i)
                .map_err(|_| ResourceError::Malformed(format!("Type chunk 0x{id:02x} declares {entry_count} entries")))?;
            offsets.push((idx, offset));
        }

        Ok(TypeChunk { id, entries_start, chunk_end, offsets })
    }

    /// Read the entry at `offset`; None for entries without a key.
    fn entry(&self, cursor: &mut Cursor<'_>, offset: u32) -> ResourceResult<Option<TypeEntry>> {
        let start = self.entries_start + offset as usize;
        if start + 8 > self.chunk_end {
            return Err(ResourceError::Obfuscated { offset: start, chunk_end: self.chunk_end });
        }
        cursor.seek(start)?;
        let size = cursor.read_u16()?;
        let flags = cursor.read_u16()?;

        // compact entries keep the key in the size field and the data type
        // in the high byte of the flags
        let compact = TypeEntry { flags, key: size as u32, data_type: (flags >> 8) as u8, data: 0 };
        if compact.is_compact() {
            return Ok(Some(TypeEntry { data: cursor.read_u32()?, ..compact }));
        }

        let key = cursor.read_u32()?;
        if key == NO_ENTRY {
            return Ok(None);
        }
        let complex = TypeEntry { flags, key, data_type: 0, data: 0 };
        if complex.is_complex() {
            return Ok(Some(complex));
        }

        if start + 16 > self.chunk_end {
            return Err(ResourceError::Obfuscated { offset: start + 16, chunk_end: self.chunk_end });
        }
        // Res_value: size, res0, data type, data
        let _value_size = cursor.read_u16()?;
        let _res0 = cursor.read_u8()?;
        let data_type = cursor.read_u8()?;
        let data = cursor.read_u32()?;
        Ok(Some(TypeEntry { flags, key, data_type, data }))
    }
}

/// String resources of a resource table, by id and by name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceTable {
    packages: Vec<ResourcePackage>,
    pub strings_by_id: HashMap<u32, String>,
    pub strings_by_name: HashMap<String, String>,
}

impl ResourceTable {
    pub fn from_bytes(bytes: &[u8]) -> ResourceResult<ResourceTable> {
        let mut cursor = Cursor::new(bytes);
        let header = ChunkHeader::read(&mut cursor)?;
        header.expect(RES_TABLE_TYPE)?;
        let package_count = cursor.read_u32()?;

        let mut table = ResourceTable::default();
        let mut global_strings: Option<StringPool> = None;

        let mut pos = header.body_start();
        while pos + CHUNK_HEADER_SIZE <= header.end() {
            cursor.seek(pos)?;
            let chunk = ChunkHeader::read(&mut cursor)?;
            match chunk.chunk_type {
                RES_STRING_POOL_TYPE => global_strings = Some(StringPool::read(&mut cursor, &chunk)?),
                RES_TABLE_PACKAGE_TYPE => {
                    let strings = global_strings.as_ref().ok_or_else(|| {
                        ResourceError::Malformed("Package chunk precedes the global string pool".to_string())
                    })?;
                    table.read_package(&mut cursor, &chunk, strings)?;
                }
                other => warn!("Skipping unknown resource chunk type 0x{other:04x} at 0x{:x}", chunk.start),
            }
            pos = chunk.end();
        }

        if table.packages.len() != package_count as usize {
            warn!("Resource table declares {} packages, found {}", package_count, table.packages.len());
        }
        debug!(
            "Read resource table: {} packages, {} string resources",
            table.packages.len(),
            table.strings_by_id.len()
        );
        Ok(table)
    }

    fn read_nested_pool(cursor: &mut Cursor<'_>, offset: usize) -> ResourceResult<StringPool> {
        cursor.seek(offset)?;
        let header = ChunkHeader::read(cursor)?;
        StringPool::read(cursor, &header)
    }

    fn read_package(&mut self, cursor: &mut Cursor<'_>, chunk: &ChunkHeader, strings: &StringPool) -> ResourceResult<()> {
        let package = PackageHeader::read(cursor)?;
        let type_strings = match package.type_strings {
            0 => StringPool::default(),
            off => Self::read_nested_pool(cursor, chunk.start + off as usize)?,
        };
        let key_strings = match package.key_strings {
            0 => StringPool::default(),
            off => Self::read_nested_pool(cursor, chunk.start + off as usize)?,
        };
        debug!("Resource package 0x{:02x} {}", package.id, package.name);

        let mut pos = chunk.body_start();
        while pos + CHUNK_HEADER_SIZE <= chunk.end() {
            cursor.seek(pos)?;
            let sub = ChunkHeader::read(cursor)?;
            match sub.chunk_type {
                RES_TABLE_TYPE_TYPE => {
                    let type_chunk = TypeChunk::read(cursor, &sub)?;
                    let type_name = type_strings.get(cursor, type_chunk.id as u32 - 1)?;
                    if type_name.as_deref() == Some("string") {
                        self.index_strings(cursor, &package, &type_chunk, &key_strings, strings)?;
                    }
                }
                RES_TABLE_TYPE_SPEC_TYPE | RES_STRING_POOL_TYPE => {}
                other => trace!("Skipping package chunk 0x{other:04x} at 0x{:x}", sub.start),
            }
            pos = sub.end();
        }

        self.packages.push(ResourcePackage { id: package.id, name: package.name });
        Ok(())
    }

    fn index_strings(
        &mut self,
        cursor: &mut Cursor<'_>,
        package: &PackageHeader,
        chunk: &TypeChunk,
        key_strings: &StringPool,
        strings: &StringPool,
    ) -> ResourceResult<()> {
        for (entry_id, offset) in &chunk.offsets {
            let Some(entry) = chunk.entry(cursor, *offset)? else {
                continue;
            };
            if entry.is_complex() || entry.data_type != TYPE_STRING {
                continue;
            }
            let name = match key_strings.get(cursor, entry.key)? {
                Some(name) if !name.is_empty() => name,
                _ => continue,
            };
            let Some(value) = strings.get(cursor, entry.data)? else {
                continue;
            };

            let id = resource_id(package.id, chunk.id, *entry_id);
            self.strings_by_id.entry(id).or_insert_with(|| value.clone());
            self.strings_by_name.entry(name).or_insert(value);
        }
        Ok(())
    }

    pub fn packages(&self) -> &[ResourcePackage] {
        &self.packages
    }

    pub fn string_by_id(&self, id: u32) -> Option<&str> {
        self.strings_by_id.get(&id).map(String::as_str)
    }

    pub fn string_by_name(&self, name: &str) -> Option<&str> {
        self.strings_by_name.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings_by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_chunk(flags: u32, strings: &[&[u8]]) -> Vec<u8> {
        let header_size = 28u16;
        let offsets_len = strings.len() * 4;
        let mut data = vec![];
        let mut offsets = vec![];
        for s in strings {
            offsets.push(data.len() as u32);
            data.extend_from_slice(s);
        }
        let mut buf = vec![];
        buf.extend_from_slice(&RES_STRING_POOL_TYPE.to_le_bytes());
        buf.extend_from_slice(&header_size.to_le_bytes());
        buf.extend_from_slice(&((header_size as usize + offsets_len + data.len()) as u32).to_le_bytes());
        buf.extend_from_slice(&(strings.len() as u32).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&flags.to_le_bytes());
        buf.extend_from_slice(&((header_size as usize + offsets_len) as u32).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        for o in offsets {
            buf.extend_from_slice(&o.to_le_bytes());
        }
        buf.extend_from_slice(&data);
        buf
    }

    fn read_pool(buf: &[u8]) -> (StringPool, Cursor<'_>) {
        let mut c = Cursor::new(buf);
        let header = ChunkHeader::read(&mut c).unwrap();
        let pool = StringPool::read(&mut c, &header).unwrap();
        (pool, c)
    }

    #[test]
    fn utf16_pool() {
        let buf = pool_chunk(0, &[&[0x03, 0x00, 0x61, 0x00, 0x62, 0x00, 0x63, 0x00, 0x00, 0x00]]);
        let (pool, mut c) = read_pool(&buf);
        assert!(!pool.is_utf8());
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(&mut c, 0).unwrap().as_deref(), Some("abc"));
        assert_eq!(pool.get(&mut c, 1).unwrap(), None);
    }

    #[test]
    fn utf8_pool() {
        let buf = pool_chunk(STRING_FLAG_UTF8, &[b"\x02\x02hi\x00", "\x01\x02\u{e9}\x00".as_bytes()]);
        let (pool, mut c) = read_pool(&buf);
        assert!(pool.is_utf8());
        assert_eq!(pool.get(&mut c, 0).unwrap().as_deref(), Some("hi"));
        assert_eq!(pool.get(&mut c, 1).unwrap().as_deref(), Some("\u{e9}"));
    }

    #[test]
    fn long_strings_are_empty() {
        let buf = pool_chunk(0, &[&[0x01, 0x80, 0x00, 0x00, 0x41, 0x00]]);
        let (pool, mut c) = read_pool(&buf);
        assert_eq!(pool.get(&mut c, 0).unwrap().as_deref(), Some(""));

        let buf = pool_chunk(STRING_FLAG_UTF8, &[&[0x81, 0x00, 0x01, b'A', 0x00]]);
        let (pool, mut c) = read_pool(&buf);
        assert_eq!(pool.get(&mut c, 0).unwrap().as_deref(), Some(""));
    }

    #[test]
    fn chunk_header_sizing() {
        // size smaller than header
        let buf = [0x01, 0x00, 0x1c, 0x00, 0x08, 0x00, 0x00, 0x00];
        assert!(ChunkHeader::read(&mut Cursor::new(&buf)).is_err());
        // past end of data
        let buf = [0x01, 0x00, 0x08, 0x00, 0x10, 0x00, 0x00, 0x00];
        assert!(ChunkHeader::read(&mut Cursor::new(&buf)).is_err());
        let buf = [0x02, 0x00, 0x08, 0x00, 0x08, 0x00, 0x00, 0x00];
        let header = ChunkHeader::read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(header.end(), 8);
    }

    #[test]
    fn rejects_non_table() {
        let buf = pool_chunk(0, &[]);
        match ResourceTable::from_bytes(&buf) {
            Err(ResourceError::UnexpectedChunk { expected, found }) => {
                assert_eq!(expected, RES_TABLE_TYPE);
                assert_eq!(found, RES_STRING_POOL_TYPE);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn entry_layouts() {
        let mut buf = vec![];
        // compact: key 5, string type, data 2
        buf.extend_from_slice(&5u16.to_le_bytes());
        buf.extend_from_slice(&(ENTRY_FLAG_COMPACT | (TYPE_STRING as u16) << 8).to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        // complex map entry with key 1
        buf.extend_from_slice(&16u16.to_le_bytes());
        buf.extend_from_slice(&ENTRY_FLAG_COMPLEX.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        // plain entry with key 3 and an integer value
        buf.extend_from_slice(&8u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&[8, 0, 0, 0x10]);
        buf.extend_from_slice(&42u32.to_le_bytes());
        // no key
        buf.extend_from_slice(&8u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&NO_ENTRY.to_le_bytes());

        let chunk = TypeChunk { id: 1, entries_start: 0, chunk_end: buf.len(), offsets: vec![] };
        let mut c = Cursor::new(&buf);

        let compact = chunk.entry(&mut c, 0).unwrap().unwrap();
        assert!(compact.is_compact() && !compact.is_complex());
        assert_eq!((compact.key, compact.data_type, compact.data), (5, TYPE_STRING, 2));

        let complex = chunk.entry(&mut c, 8).unwrap().unwrap();
        assert!(complex.is_complex() && !complex.is_compact());
        assert_eq!((complex.key, complex.data), (1, 0));

        let plain = chunk.entry(&mut c, 16).unwrap().unwrap();
        assert!(!plain.is_compact() && !plain.is_complex());
        assert_eq!((plain.key, plain.data_type, plain.data), (3, 0x10, 42));

        assert_eq!(chunk.entry(&mut c, 32).unwrap(), None);
        assert!(matches!(chunk.entry(&mut c, 36), Err(ResourceError::Obfuscated { .. })));
    }

    #[test]
    fn packs_resource_ids() {
        assert_eq!(resource_id(0x7f, 0x0b, 0x001e), 0x7f0b001e);
        assert_eq!(resource_id(0x01, 0x01, 0xffff), 0x0101ffff);
    }
}
