/* Dex file format structures */

use log::{debug, warn};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::config::ParseConfig;
use crate::dex::annotations::collect_annotation_strings;
use crate::dex::class_data::{ClassDataItem, CodeItem, EncodedField, EncodedMethod};
use crate::dex::cursor::{Cursor, ReadStruct};
use crate::dex::encoded_values::{read_encoded_array, EncodedValue};
use crate::dex::error::DexError;
use crate::dex::opcodes::Opcode;
use crate::types::{AccessFlags, DexClass, DexField, DexMethod};

/* Constants */
pub const DEX_FILE_MAGIC: [u8; 8] = [0x64, 0x65, 0x78, 0x0a, 0x30, 0x33, 0x35, 0x00];
pub const HEADER_SIZE: u32 = 0x70;
pub const ENDIAN_CONSTANT: u32 = 0x12345678;
pub const NO_INDEX: u32 = 0xffffffff;

impl ReadStruct for u32 {
    const SIZE: usize = 4;

    fn read(cursor: &mut Cursor<'_>) -> Result<Self, DexError> {
        cursor.read_u32()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub magic: [u8; 8],
    pub checksum: u32,
    pub signature: [u8; 20],
    pub file_size: u32,
    pub header_size: u32,
    pub endian_tag: u32,
    pub link_size: u32,
    pub link_off: u32,
    pub map_off: u32,
    pub string_ids_size: u32,
    pub string_ids_off: u32,
    pub type_ids_size: u32,
    pub type_ids_off: u32,
    pub proto_ids_size: u32,
    pub proto_ids_off: u32,
    pub field_ids_size: u32,
    pub field_ids_off: u32,
    pub method_ids_size: u32,
    pub method_ids_off: u32,
    pub class_defs_size: u32,
    pub class_defs_off: u32,
    pub data_size: u32,
    pub data_off: u32,
}

impl ReadStruct for Header {
    const SIZE: usize = HEADER_SIZE as usize;

    fn read(cursor: &mut Cursor<'_>) -> Result<Header, DexError> {
        let mut magic = [0u8; 8];
        magic.copy_from_slice(cursor.read_bytes(8)?);
        let checksum = cursor.read_u32()?;
        let mut signature = [0u8; 20];
        signature.copy_from_slice(cursor.read_bytes(20)?);

        Ok(Header {
            magic,
            checksum,
            signature,
            file_size: cursor.read_u32()?,
            header_size: cursor.read_u32()?,
            endian_tag: cursor.read_u32()?,
            link_size: cursor.read_u32()?,
            link_off: cursor.read_u32()?,
            map_off: cursor.read_u32()?,
            string_ids_size: cursor.read_u32()?,
            string_ids_off: cursor.read_u32()?,
            type_ids_size: cursor.read_u32()?,
            type_ids_off: cursor.read_u32()?,
            proto_ids_size: cursor.read_u32()?,
            proto_ids_off: cursor.read_u32()?,
            field_ids_size: cursor.read_u32()?,
            field_ids_off: cursor.read_u32()?,
            method_ids_size: cursor.read_u32()?,
            method_ids_off: cursor.read_u32()?,
            class_defs_size: cursor.read_u32()?,
            class_defs_off: cursor.read_u32()?,
            data_size: cursor.read_u32()?,
            data_off: cursor.read_u32()?,
        })
    }
}

impl Header {
    /// `dex\n` followed by a three digit version and a NUL.
    pub fn has_valid_magic(&self) -> bool {
        self.magic[..4] == DEX_FILE_MAGIC[..4] && self.magic[4..7].iter().all(u8::is_ascii_digit) && self.magic[7] == 0
    }

    pub fn version(&self) -> Option<u32> {
        if !self.has_valid_magic() {
            return None;
        }
        std::str::from_utf8(&self.magic[4..7]).ok()?.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtoIdItem {
    pub shorty_idx: u32,
    pub return_type_idx: u32,
    /// 0 when the method takes no parameters
    pub parameters_off: u32,
}

impl ReadStruct for ProtoIdItem {
    const SIZE: usize = 12;

    fn read(cursor: &mut Cursor<'_>) -> Result<Self, DexError> {
        Ok(ProtoIdItem {
            shorty_idx: cursor.read_u32()?,
            return_type_idx: cursor.read_u32()?,
            parameters_off: cursor.read_u32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldIdItem {
    pub class_idx: u16,
    pub type_idx: u16,
    pub name_idx: u32,
}

impl ReadStruct for FieldIdItem {
    const SIZE: usize = 8;

    fn read(cursor: &mut Cursor<'_>) -> Result<Self, DexError> {
        Ok(FieldIdItem {
            class_idx: cursor.read_u16()?,
            type_idx: cursor.read_u16()?,
            name_idx: cursor.read_u32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodIdItem {
    pub class_idx: u16,
    pub proto_idx: u16,
    pub name_idx: u32,
}

impl ReadStruct for MethodIdItem {
    const SIZE: usize = 8;

    fn read(cursor: &mut Cursor<'_>) -> Result<Self, DexError> {
        Ok(MethodIdItem {
            class_idx: cursor.read_u16()?,
            proto_idx: cursor.read_u16()?,
            name_idx: cursor.read_u32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassDefItem {
    pub class_idx: u32,
    pub access_flags: u32,
    pub superclass_idx: u32,
    pub interfaces_off: u32,
    pub source_file_idx: u32,
    pub annotations_off: u32,
    pub class_data_off: u32,
    pub static_values_off: u32,
}

impl ReadStruct for ClassDefItem {
    const SIZE: usize = 32;

    fn read(cursor: &mut Cursor<'_>) -> Result<Self, DexError> {
        Ok(ClassDefItem {
            class_idx: cursor.read_u32()?,
            access_flags: cursor.read_u32()?,
            superclass_idx: cursor.read_u32()?,
            interfaces_off: cursor.read_u32()?,
            source_file_idx: cursor.read_u32()?,
            annotations_off: cursor.read_u32()?,
            class_data_off: cursor.read_u32()?,
            static_values_off: cursor.read_u32()?,
        })
    }
}

/// A method prototype with its types resolved to descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prototype {
    pub shorty: String,
    pub return_type: String,
    pub parameters: Vec<String>,
    /// The parameter descriptors concatenated, as they appear between the parentheses of a signature.
    pub parameters_descriptor: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MethodSlot {
    Direct(usize),
    Virtual(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldSlot {
    Static(usize),
    Instance(usize),
}

#[derive(Debug)]
pub struct DexFile {
    pub header: Header,
    /// Name of the archive entry or file this DEX was read from
    pub filename: Option<String>,
    pub strings: Vec<String>,
    /// type_ids: indices into `strings`
    pub type_ids: Vec<u32>,
    pub prototypes: Vec<Prototype>,
    pub field_ids: Vec<FieldIdItem>,
    pub method_ids: Vec<MethodIdItem>,
    pub class_defs: Vec<ClassDefItem>,
    /// Classes in class_def order
    pub classes: Vec<DexClass>,

    auxiliary_strings: HashSet<u32>,
    class_lookup: HashMap<String, usize>,
    method_lookup: HashMap<String, (usize, MethodSlot)>,
    field_lookup: HashMap<String, (usize, FieldSlot)>,
    method_signatures: Vec<String>,
    field_descriptors: Vec<String>,
}

/// Seek to a table and read `size` records from it.
fn read_table<T: ReadStruct>(cursor: &mut Cursor<'_>, offset: u32, size: u32, name: &str) -> Result<Vec<T>, DexError> {
    if size == 0 {
        return Ok(vec![]);
    }
    let mut read = || -> Result<Vec<T>, DexError> {
        cursor.seek(offset as usize)?;
        cursor.read_structs(size as usize)
    };
    read().map_err(|e| DexError::with_context(e, format!("{} table at 0x{:x}", name, offset)))
}

/// string_data_item: a ULEB128 UTF-16 length, then MUTF-8 bytes up to a NUL.
fn read_string_data(cursor: &mut Cursor<'_>, offset: u32) -> Result<String, DexError> {
    cursor.seek(offset as usize)?;
    let _utf16_size = cursor.read_uleb128()?;
    let rest = &cursor.data()[cursor.position()..];
    let len = rest
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| err!(Bounds => "Unterminated string data at 0x{:x}", offset))?;
    let bytes = cursor.read_bytes(len)?;
    cursor.skip(1)?;

    Ok(match cesu8::from_java_cesu8(bytes) {
        Ok(s) => s.into_owned(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    })
}

/// type_list: a u32 count followed by u16 type indices.
fn read_type_list(cursor: &mut Cursor<'_>, offset: u32) -> Result<Vec<u16>, DexError> {
    cursor.seek(offset as usize)?;
    let size = cursor.read_u32()? as usize;
    cursor.check_count(size, 2)?;
    let mut types = Vec::with_capacity(size);
    for _ in 0..size {
        types.push(cursor.read_u16()?);
    }
    Ok(types)
}

impl DexFile {
    pub fn from_bytes(bytes: &[u8]) -> Result<DexFile, DexError> {
        DexFile::from_bytes_with_config(bytes, &ParseConfig::default())
    }

    pub fn from_file(path: &Path) -> Result<DexFile, DexError> {
        let bytes = fs::read(path).map_err(|e| DexError::new(&format!("io Error: {}", e)))?;
        let mut dex = DexFile::from_bytes(&bytes)?;
        dex.filename = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Ok(dex)
    }

    pub fn from_bytes_with_config(bytes: &[u8], config: &ParseConfig) -> Result<DexFile, DexError> {
        let mut cursor = Cursor::new(bytes);
        let header: Header = cursor
            .read_struct()
            .map_err(|e| DexError::with_context(e, "header"))?;

        if header.header_size != HEADER_SIZE {
            fail!("Invalid header size 0x{:x}, expected 0x{:x}", header.header_size, HEADER_SIZE);
        }
        if !header.has_valid_magic() {
            warn!("Unexpected DEX magic {:02x?}", header.magic);
        }
        if header.endian_tag != ENDIAN_CONSTANT {
            warn!("Unexpected DEX endian tag 0x{:08x}", header.endian_tag);
        }

        let string_offsets: Vec<u32> = read_table(&mut cursor, header.string_ids_off, header.string_ids_size, "string ids")?;
        let mut strings = Vec::with_capacity(string_offsets.len());
        for (i, offset) in string_offsets.iter().enumerate() {
            let s = read_string_data(&mut cursor, *offset)
                .map_err(|e| DexError::with_context(e, format!("string id #{}", i)))?;
            strings.push(s);
        }

        let type_ids: Vec<u32> = read_table(&mut cursor, header.type_ids_off, header.type_ids_size, "type ids")?;
        if let Some((i, idx)) = type_ids.iter().enumerate().find(|(_, idx)| **idx as usize >= strings.len()) {
            fail!("Type id #{} references string {} of {}", i, idx, strings.len());
        }

        let proto_ids: Vec<ProtoIdItem> = read_table(&mut cursor, header.proto_ids_off, header.proto_ids_size, "proto ids")?;
        let field_ids = read_table(&mut cursor, header.field_ids_off, header.field_ids_size, "field ids")?;
        let method_ids = read_table(&mut cursor, header.method_ids_off, header.method_ids_size, "method ids")?;
        let class_defs = read_table(&mut cursor, header.class_defs_off, header.class_defs_size, "class defs")?;

        let mut dex = DexFile {
            header,
            filename: None,
            strings,
            type_ids,
            prototypes: vec![],
            field_ids,
            method_ids,
            class_defs,
            classes: vec![],
            auxiliary_strings: HashSet::new(),
            class_lookup: HashMap::new(),
            method_lookup: HashMap::new(),
            field_lookup: HashMap::new(),
            method_signatures: vec![],
            field_descriptors: vec![],
        };

        let mut prototypes = Vec::with_capacity(proto_ids.len());
        for (i, proto) in proto_ids.iter().enumerate() {
            let p = dex
                .read_prototype(&mut cursor, proto)
                .map_err(|e| DexError::with_context(e, format!("proto id #{}", i)))?;
            prototypes.push(p);
        }
        dex.prototypes = prototypes;
        dex.mark_auxiliary_strings(&proto_ids);

        dex.method_signatures = (0..dex.method_ids.len())
            .map(|i| dex.build_method_signature(i).map_err(|e| DexError::with_context(e, format!("method id #{}", i))))
            .collect::<Result<_, _>>()?;
        dex.field_descriptors = (0..dex.field_ids.len())
            .map(|i| dex.build_field_descriptor(i).map_err(|e| DexError::with_context(e, format!("field id #{}", i))))
            .collect::<Result<_, _>>()?;

        for i in 0..dex.class_defs.len() {
            let def = dex.class_defs[i];
            let class = dex
                .read_class(&mut cursor, &def)
                .map_err(|e| DexError::with_context(e, format!("class def #{}", i)))?;
            dex.register_class(class);
        }

        if config.sanitize_annotations {
            dex.sanitize_annotations(&mut cursor)?;
        }

        debug!(
            "Read DEX: {} strings, {} types, {} protos, {} fields, {} methods, {} classes",
            dex.strings.len(),
            dex.type_ids.len(),
            dex.prototypes.len(),
            dex.field_ids.len(),
            dex.method_ids.len(),
            dex.classes.len()
        );

        Ok(dex)
    }

    fn string_checked(&self, idx: u32) -> Result<&str, DexError> {
        self.string(idx)
            .ok_or_else(|| err!("String index {} out of range ({} strings)", idx, self.strings.len()))
    }

    fn type_checked(&self, type_idx: u32) -> Result<&str, DexError> {
        self.type_name(type_idx)
            .ok_or_else(|| err!("Type index {} out of range ({} types)", type_idx, self.type_ids.len()))
    }

    fn read_prototype(&self, cursor: &mut Cursor<'_>, proto: &ProtoIdItem) -> Result<Prototype, DexError> {
        let shorty = self.string_checked(proto.shorty_idx)?.to_string();
        let return_type = self.type_checked(proto.return_type_idx)?.to_string();
        let parameters = if proto.parameters_off == 0 {
            vec![]
        } else {
            read_type_list(cursor, proto.parameters_off)?
                .into_iter()
                .map(|t| self.type_checked(t as u32).map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?
        };
        let parameters_descriptor = parameters.concat();

        Ok(Prototype { shorty, return_type, parameters, parameters_descriptor })
    }

    /// Strings used as type names, shorties, field names or method names are
    /// not program literals.
    fn mark_auxiliary_strings(&mut self, proto_ids: &[ProtoIdItem]) {
        let aux = &mut self.auxiliary_strings;
        aux.extend(self.type_ids.iter().copied());
        aux.extend(proto_ids.iter().map(|p| p.shorty_idx));
        aux.extend(self.field_ids.iter().map(|f| f.name_idx));
        aux.extend(self.method_ids.iter().map(|m| m.name_idx));
    }

    fn sanitize_annotations(&mut self, cursor: &mut Cursor<'_>) -> Result<(), DexError> {
        let mut found = HashSet::new();
        for (i, def) in self.class_defs.iter().enumerate() {
            if def.source_file_idx != NO_INDEX {
                found.insert(def.source_file_idx);
            }
            collect_annotation_strings(cursor, def.annotations_off, &mut found)
                .map_err(|e| DexError::with_context(e, format!("class def #{}", i)))?;
        }
        debug!("Annotation pass marked {} strings", found.len());
        self.auxiliary_strings.extend(found);
        Ok(())
    }

    fn build_method_signature(&self, method_idx: usize) -> Result<String, DexError> {
        let id = &self.method_ids[method_idx];
        let class_name = self.type_checked(id.class_idx as u32)?;
        let name = self.string_checked(id.name_idx)?;
        let proto = self
            .prototypes
            .get(id.proto_idx as usize)
            .ok_or_else(|| err!("Proto index {} out of range ({} protos)", id.proto_idx, self.prototypes.len()))?;

        Ok(format!("{}->{}({}){}", class_name, name, proto.parameters_descriptor, proto.return_type))
    }

    fn build_field_descriptor(&self, field_idx: usize) -> Result<String, DexError> {
        let id = &self.field_ids[field_idx];
        let class_name = self.type_checked(id.class_idx as u32)?;
        let name = self.string_checked(id.name_idx)?;
        let type_descriptor = self.type_checked(id.type_idx as u32)?;

        Ok(format!("{}->{}:{}", class_name, name, type_descriptor))
    }

    fn read_class(&self, cursor: &mut Cursor<'_>, def: &ClassDefItem) -> Result<DexClass, DexError> {
        let mut class = DexClass::new(self.type_checked(def.class_idx)?.to_string());
        class.access_flags = AccessFlags::from_bits_retain(def.access_flags);
        class.super_class = match self.type_name(def.superclass_idx) {
            Some(name) => Some(name.to_string()),
            None => {
                if def.superclass_idx != NO_INDEX {
                    warn!("{}: superclass index {} out of range, treating as none", class.name, def.superclass_idx);
                }
                None
            }
        };
        if def.interfaces_off != 0 {
            class.interfaces = read_type_list(cursor, def.interfaces_off)
                .and_then(|types| {
                    types
                        .into_iter()
                        .map(|t| self.type_checked(t as u32).map(str::to_string))
                        .collect::<Result<Vec<_>, _>>()
                })
                .map_err(|e| DexError::with_context(e, "interfaces"))?;
        }
        if def.source_file_idx != NO_INDEX {
            class.source_file = self.string(def.source_file_idx).map(str::to_string);
        }

        // No class data is a valid marker class
        if def.class_data_off == 0 {
            return Ok(class);
        }

        cursor.seek(def.class_data_off as usize)?;
        let data = ClassDataItem::read(cursor).map_err(|e| DexError::with_context(e, "class data"))?;

        let static_values = if def.static_values_off != 0 {
            cursor.seek(def.static_values_off as usize)?;
            read_encoded_array(cursor).map_err(|e| DexError::with_context(e, "static values"))?
        } else {
            vec![]
        };

        for (i, field) in data.static_fields.iter().enumerate() {
            class.static_fields.push(self.materialize_field(field, static_values.get(i).cloned())?);
        }
        for field in &data.instance_fields {
            class.instance_fields.push(self.materialize_field(field, None)?);
        }
        for method in &data.direct_methods {
            class.direct_methods.push(self.materialize_method(cursor, method)?);
        }
        for method in &data.virtual_methods {
            class.virtual_methods.push(self.materialize_method(cursor, method)?);
        }

        Ok(class)
    }

    fn materialize_field(&self, field: &EncodedField, initial_value: Option<EncodedValue>) -> Result<DexField, DexError> {
        let idx = field.field_idx as usize;
        let id = self
            .field_ids
            .get(idx)
            .ok_or_else(|| err!("Field index {} out of range ({} field ids)", idx, self.field_ids.len()))?;

        Ok(DexField {
            name: self.string_checked(id.name_idx)?.to_string(),
            type_descriptor: self.type_checked(id.type_idx as u32)?.to_string(),
            class_name: self.type_checked(id.class_idx as u32)?.to_string(),
            descriptor: self.field_descriptors[idx].clone(),
            field_idx: field.field_idx,
            access_flags: AccessFlags::from_bits_retain(field.access_flags),
            initial_value,
        })
    }

    fn materialize_method(&self, cursor: &mut Cursor<'_>, method: &EncodedMethod) -> Result<DexMethod, DexError> {
        let idx = method.method_idx as usize;
        let id = self
            .method_ids
            .get(idx)
            .ok_or_else(|| err!("Method index {} out of range ({} method ids)", idx, self.method_ids.len()))?;
        let signature = self.method_signatures[idx].clone();
        let proto = &self.prototypes[id.proto_idx as usize];

        let code = if method.code_off == 0 {
            None
        } else {
            cursor.seek(method.code_off as usize)?;
            let code = CodeItem::read(cursor)
                .map_err(|e| DexError::with_context(e, format!("code item of {}", signature)))?;
            Some(code)
        };

        Ok(DexMethod::new(
            self.string_checked(id.name_idx)?.to_string(),
            self.type_checked(id.class_idx as u32)?.to_string(),
            proto.parameters.clone(),
            proto.return_type.clone(),
            signature,
            method.method_idx,
            AccessFlags::from_bits_retain(method.access_flags),
            code,
        ))
    }

    fn register_class(&mut self, class: DexClass) {
        let class_pos = self.classes.len();
        for (i, m) in class.direct_methods.iter().enumerate() {
            self.method_lookup.entry(m.signature.clone()).or_insert((class_pos, MethodSlot::Direct(i)));
        }
        for (i, m) in class.virtual_methods.iter().enumerate() {
            self.method_lookup.entry(m.signature.clone()).or_insert((class_pos, MethodSlot::Virtual(i)));
        }
        for (i, f) in class.static_fields.iter().enumerate() {
            self.field_lookup.entry(f.descriptor.clone()).or_insert((class_pos, FieldSlot::Static(i)));
        }
        for (i, f) in class.instance_fields.iter().enumerate() {
            self.field_lookup.entry(f.descriptor.clone()).or_insert((class_pos, FieldSlot::Instance(i)));
        }
        self.class_lookup.entry(class.name.clone()).or_insert(class_pos);
        self.classes.push(class);
    }

    pub fn string(&self, idx: u32) -> Option<&str> {
        self.strings.get(idx as usize).map(String::as_str)
    }

    pub fn type_name(&self, type_idx: u32) -> Option<&str> {
        let string_idx = *self.type_ids.get(type_idx as usize)?;
        self.string(string_idx)
    }

    pub fn class(&self, name: &str) -> Option<&DexClass> {
        self.class_lookup.get(name).map(|i| &self.classes[*i])
    }

    /// A method defined in this DEX, by signature.
    pub fn method(&self, signature: &str) -> Option<&DexMethod> {
        let (class_pos, slot) = self.method_lookup.get(signature)?;
        let class = &self.classes[*class_pos];
        match slot {
            MethodSlot::Direct(i) => class.direct_methods.get(*i),
            MethodSlot::Virtual(i) => class.virtual_methods.get(*i),
        }
    }

    /// A field defined in this DEX, by descriptor.
    pub fn field(&self, descriptor: &str) -> Option<&DexField> {
        let (class_pos, slot) = self.field_lookup.get(descriptor)?;
        let class = &self.classes[*class_pos];
        match slot {
            FieldSlot::Static(i) => class.static_fields.get(*i),
            FieldSlot::Instance(i) => class.instance_fields.get(*i),
        }
    }

    /// Signature of any method id, defined here or only referenced.
    pub fn method_signature(&self, method_idx: u32) -> Option<&str> {
        self.method_signatures.get(method_idx as usize).map(String::as_str)
    }

    pub fn field_descriptor(&self, field_idx: u32) -> Option<&str> {
        self.field_descriptors.get(field_idx as usize).map(String::as_str)
    }

    /// The field behind a field_ids index, when a class in this DEX defines it.
    pub fn field_by_index(&self, field_idx: u32) -> Option<&DexField> {
        self.field(self.field_descriptor(field_idx)?)
    }

    pub fn methods(&self) -> impl Iterator<Item = &DexMethod> {
        self.classes.iter().flat_map(DexClass::methods)
    }

    pub fn is_auxiliary_string(&self, idx: u32) -> bool {
        self.auxiliary_strings.contains(&idx)
    }

    /// Strings that are not type names, member names, shorties (and, after
    /// the annotation pass, annotation metadata), in table order.
    pub fn const_strings(&self) -> Vec<&str> {
        self.strings
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.auxiliary_strings.contains(&(*i as u32)))
            .map(|(_, s)| s.as_str())
            .collect()
    }

    /// The strings loaded by `const-string` instructions in a method body.
    pub fn method_strings(&self, method: &DexMethod) -> Result<Vec<&str>, DexError> {
        let mut out = vec![];
        for instruction in method.instructions()? {
            if instruction.is(Opcode::ConstString) || instruction.is(Opcode::ConstStringJumbo) {
                out.push(self.string_checked(instruction.operands[1] as u32)?);
            }
        }
        Ok(out)
    }
}
