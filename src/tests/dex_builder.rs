//! Test-only writer for small, well-formed DEX images.
//!
//! Ids are interned in first-use order rather than the sorted order a real
//! dexer produces; the reader does not depend on sort order.

use std::collections::HashMap;

use crate::dex::dex_file::{DEX_FILE_MAGIC, ENDIAN_CONSTANT, HEADER_SIZE, NO_INDEX};
use crate::dex::leb::encode_uleb128;

pub const ACC_PUBLIC: u32 = 0x1;
pub const ACC_STATIC: u32 = 0x8;
pub const ACC_FINAL: u32 = 0x10;
pub const ACC_CONSTRUCTOR: u32 = 0x10000;

#[derive(Debug, Clone, Default)]
pub struct TestField {
    pub field_idx: u32,
    pub access_flags: u32,
    /// An encoded_value, see [`value`]
    pub value: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct TestMethod {
    pub method_idx: u32,
    pub access_flags: u32,
    pub registers: u16,
    pub insns: Option<Vec<u16>>,
}

#[derive(Debug, Clone, Default)]
pub struct TestAnnotation {
    pub type_descriptor: String,
    /// (element name, string value)
    pub elements: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct TestClass {
    pub name: String,
    pub super_class: Option<String>,
    pub access_flags: u32,
    pub interfaces: Vec<String>,
    pub source_file: Option<String>,
    pub static_fields: Vec<TestField>,
    pub instance_fields: Vec<TestField>,
    pub direct_methods: Vec<TestMethod>,
    pub virtual_methods: Vec<TestMethod>,
    pub annotation: Option<TestAnnotation>,
    /// Emit class_data even when every list is empty
    pub force_class_data: bool,
}

impl TestClass {
    pub fn new(name: &str) -> TestClass {
        TestClass {
            name: name.to_string(),
            super_class: Some("Ljava/lang/Object;".to_string()),
            access_flags: ACC_PUBLIC,
            ..Default::default()
        }
    }

    pub fn extends(mut self, super_class: &str) -> TestClass {
        self.super_class = Some(super_class.to_string());
        self
    }

    pub fn direct(mut self, method_idx: u32, registers: u16, insns: Vec<u16>) -> TestClass {
        self.direct_methods.push(TestMethod {
            method_idx,
            access_flags: ACC_PUBLIC | ACC_STATIC,
            registers,
            insns: Some(insns),
        });
        self
    }

    pub fn virtual_method(mut self, method_idx: u32, registers: u16, insns: Vec<u16>) -> TestClass {
        self.virtual_methods.push(TestMethod { method_idx, access_flags: ACC_PUBLIC, registers, insns: Some(insns) });
        self
    }

    pub fn static_field(mut self, field_idx: u32, value: Option<Vec<u8>>) -> TestClass {
        self.static_fields.push(TestField { field_idx, access_flags: ACC_PUBLIC | ACC_STATIC | ACC_FINAL, value });
        self
    }
}

struct PendingClass {
    class_idx: u32,
    superclass_idx: u32,
    interfaces: Vec<u16>,
    source_file_idx: u32,
    annotation: Option<(u32, Vec<(u32, u32)>)>,
    def: TestClass,
}

#[derive(Default)]
pub struct DexBuilder {
    strings: Vec<String>,
    string_lookup: HashMap<String, u32>,
    types: Vec<u32>,
    type_lookup: HashMap<String, u32>,
    protos: Vec<(u32, u32, Vec<u16>)>,
    proto_lookup: HashMap<String, u32>,
    fields: Vec<(u16, u16, u32)>,
    field_lookup: HashMap<String, u32>,
    methods: Vec<(u16, u16, u32)>,
    method_lookup: HashMap<String, u32>,
    classes: Vec<PendingClass>,
}

fn shorty_char(descriptor: &str) -> char {
    match descriptor.chars().next() {
        Some('L') | Some('[') => 'L',
        Some(c) => c,
        None => 'V',
    }
}

impl DexBuilder {
    pub fn new() -> DexBuilder {
        DexBuilder::default()
    }

    pub fn string(&mut self, value: &str) -> u32 {
        if let Some(idx) = self.string_lookup.get(value) {
            return *idx;
        }
        let idx = self.strings.len() as u32;
        self.strings.push(value.to_string());
        self.string_lookup.insert(value.to_string(), idx);
        idx
    }

    pub fn type_id(&mut self, descriptor: &str) -> u32 {
        if let Some(idx) = self.type_lookup.get(descriptor) {
            return *idx;
        }
        let string_idx = self.string(descriptor);
        let idx = self.types.len() as u32;
        self.types.push(string_idx);
        self.type_lookup.insert(descriptor.to_string(), idx);
        idx
    }

    pub fn proto(&mut self, params: &[&str], ret: &str) -> u32 {
        let key = format!("({}){}", params.concat(), ret);
        if let Some(idx) = self.proto_lookup.get(&key) {
            return *idx;
        }
        let shorty: String = std::iter::once(ret).chain(params.iter().copied()).map(shorty_char).collect();
        let shorty_idx = self.string(&shorty);
        let return_idx = self.type_id(ret);
        let param_idx: Vec<u16> = params.iter().map(|p| self.type_id(p) as u16).collect();
        let idx = self.protos.len() as u32;
        self.protos.push((shorty_idx, return_idx, param_idx));
        self.proto_lookup.insert(key, idx);
        idx
    }

    pub fn field(&mut self, class: &str, name: &str, type_descriptor: &str) -> u32 {
        let key = format!("{}->{}:{}", class, name, type_descriptor);
        if let Some(idx) = self.field_lookup.get(&key) {
            return *idx;
        }
        let class_idx = self.type_id(class) as u16;
        let type_idx = self.type_id(type_descriptor) as u16;
        let name_idx = self.string(name);
        let idx = self.fields.len() as u32;
        self.fields.push((class_idx, type_idx, name_idx));
        self.field_lookup.insert(key, idx);
        idx
    }

    pub fn method(&mut self, class: &str, name: &str, params: &[&str], ret: &str) -> u32 {
        let key = format!("{}->{}({}){}", class, name, params.concat(), ret);
        if let Some(idx) = self.method_lookup.get(&key) {
            return *idx;
        }
        let class_idx = self.type_id(class) as u16;
        let proto_idx = self.proto(params, ret) as u16;
        let name_idx = self.string(name);
        let idx = self.methods.len() as u32;
        self.methods.push((class_idx, proto_idx, name_idx));
        self.method_lookup.insert(key, idx);
        idx
    }

    pub fn class(&mut self, def: TestClass) -> &mut Self {
        let class_idx = self.type_id(&def.name);
        let superclass_idx = match &def.super_class {
            Some(name) => self.type_id(name),
            None => NO_INDEX,
        };
        let interfaces: Vec<u16> = def.interfaces.iter().map(|i| self.type_id(i) as u16).collect();
        let source_file_idx = match &def.source_file {
            Some(name) => self.string(name),
            None => NO_INDEX,
        };
        let annotation = def.annotation.as_ref().map(|a| {
            let type_idx = self.type_id(&a.type_descriptor);
            let elements: Vec<(u32, u32)> = a.elements.iter().map(|(k, v)| (self.string(k), self.string(v))).collect();
            (type_idx, elements)
        });
        self.classes.push(PendingClass { class_idx, superclass_idx, interfaces, source_file_idx, annotation, def });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let string_ids_off = HEADER_SIZE as usize;
        let type_ids_off = string_ids_off + self.strings.len() * 4;
        let proto_ids_off = type_ids_off + self.types.len() * 4;
        let field_ids_off = proto_ids_off + self.protos.len() * 12;
        let method_ids_off = field_ids_off + self.fields.len() * 8;
        let class_defs_off = method_ids_off + self.methods.len() * 8;
        let data_off = class_defs_off + self.classes.len() * 32;

        let mut data = Data { base: data_off, bytes: vec![] };

        let string_offsets: Vec<u32> = self
            .strings
            .iter()
            .map(|s| {
                let off = data.offset();
                data.put(&encode_uleb128(s.encode_utf16().count() as u64));
                data.put(&cesu8::to_java_cesu8(s));
                data.put(&[0]);
                off
            })
            .collect();

        let proto_params: Vec<u32> = self
            .protos
            .iter()
            .map(|(_, _, params)| if params.is_empty() { 0 } else { data.type_list(params) })
            .collect();

        let mut class_defs = vec![];
        for class in &self.classes {
            let interfaces_off = if class.interfaces.is_empty() { 0 } else { data.type_list(&class.interfaces) };
            let annotations_off = match &class.annotation {
                Some((type_idx, elements)) => data.annotations_directory(*type_idx, elements),
                None => 0,
            };
            let static_values_off = data.static_values(&class.def.static_fields);
            let class_data_off = data.class_data(&class.def);
            class_defs.push([
                class.class_idx,
                class.def.access_flags,
                class.superclass_idx,
                interfaces_off,
                class.source_file_idx,
                annotations_off,
                class_data_off,
                static_values_off,
            ]);
        }

        let file_size = data_off + data.bytes.len();
        let mut out = Vec::with_capacity(file_size);
        out.extend_from_slice(&DEX_FILE_MAGIC);
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&[0u8; 20]);
        for v in [file_size as u32, HEADER_SIZE, ENDIAN_CONSTANT, 0, 0, 0] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for (size, off) in [
            (self.strings.len(), string_ids_off),
            (self.types.len(), type_ids_off),
            (self.protos.len(), proto_ids_off),
            (self.fields.len(), field_ids_off),
            (self.methods.len(), method_ids_off),
            (self.classes.len(), class_defs_off),
            (data.bytes.len(), data_off),
        ] {
            out.extend_from_slice(&(size as u32).to_le_bytes());
            out.extend_from_slice(&(if size == 0 { 0 } else { off as u32 }).to_le_bytes());
        }
        assert_eq!(out.len(), HEADER_SIZE as usize);

        for off in string_offsets {
            out.extend_from_slice(&off.to_le_bytes());
        }
        for t in &self.types {
            out.extend_from_slice(&t.to_le_bytes());
        }
        for ((shorty, ret, _), params_off) in self.protos.iter().zip(proto_params) {
            for v in [*shorty, *ret, params_off] {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        for (a, b, name) in self.fields.iter().chain(self.methods.iter()) {
            out.extend_from_slice(&a.to_le_bytes());
            out.extend_from_slice(&b.to_le_bytes());
            out.extend_from_slice(&name.to_le_bytes());
        }
        for def in class_defs {
            for v in def {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        assert_eq!(out.len(), data_off);
        out.extend_from_slice(&data.bytes);
        out
    }
}

struct Data {
    base: usize,
    bytes: Vec<u8>,
}

impl Data {
    fn offset(&self) -> u32 {
        (self.base + self.bytes.len()) as u32
    }

    fn put(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    fn put_u32(&mut self, v: u32) {
        self.put(&v.to_le_bytes());
    }

    fn uleb(&mut self, v: u32) {
        self.put(&encode_uleb128(v as u64));
    }

    fn align4(&mut self) {
        while (self.base + self.bytes.len()) % 4 != 0 {
            self.bytes.push(0);
        }
    }

    fn type_list(&mut self, types: &[u16]) -> u32 {
        self.align4();
        let off = self.offset();
        self.put_u32(types.len() as u32);
        for t in types {
            self.put(&t.to_le_bytes());
        }
        off
    }

    fn annotations_directory(&mut self, type_idx: u32, elements: &[(u32, u32)]) -> u32 {
        let item_off = self.offset();
        self.put(&[0x01]);
        self.uleb(type_idx);
        self.uleb(elements.len() as u32);
        for (name, text) in elements {
            self.uleb(*name);
            self.put(&value::string(*text));
        }

        self.align4();
        let set_off = self.offset();
        self.put_u32(1);
        self.put_u32(item_off);

        let dir_off = self.offset();
        for v in [set_off, 0, 0, 0] {
            self.put_u32(v);
        }
        dir_off
    }

    fn static_values(&mut self, fields: &[TestField]) -> u32 {
        let mut sorted: Vec<&TestField> = fields.iter().collect();
        sorted.sort_by_key(|f| f.field_idx);
        let Some(last) = sorted.iter().rposition(|f| f.value.is_some()) else {
            return 0;
        };
        let off = self.offset();
        self.uleb(last as u32 + 1);
        for field in &sorted[..=last] {
            match &field.value {
                Some(v) => self.put(v),
                None => self.put(&value::null()),
            }
        }
        off
    }

    fn class_data(&mut self, def: &TestClass) -> u32 {
        let empty = def.static_fields.is_empty()
            && def.instance_fields.is_empty()
            && def.direct_methods.is_empty()
            && def.virtual_methods.is_empty();
        if empty && !def.force_class_data {
            return 0;
        }

        // code items first, class_data refers to them
        let direct: Vec<(u32, u32, u32)> = self.code_items(&def.direct_methods);
        let virtuals: Vec<(u32, u32, u32)> = self.code_items(&def.virtual_methods);

        let off = self.offset();
        for n in [def.static_fields.len(), def.instance_fields.len(), direct.len(), virtuals.len()] {
            self.uleb(n as u32);
        }
        for fields in [&def.static_fields, &def.instance_fields] {
            let mut sorted: Vec<&TestField> = fields.iter().collect();
            sorted.sort_by_key(|f| f.field_idx);
            let mut prev = 0;
            for f in sorted {
                self.uleb(f.field_idx - prev);
                self.uleb(f.access_flags);
                prev = f.field_idx;
            }
        }
        for methods in [direct, virtuals] {
            let mut prev = 0;
            for (idx, flags, code_off) in methods {
                self.uleb(idx - prev);
                self.uleb(flags);
                self.uleb(code_off);
                prev = idx;
            }
        }
        off
    }

    fn code_items(&mut self, methods: &[TestMethod]) -> Vec<(u32, u32, u32)> {
        let mut sorted: Vec<&TestMethod> = methods.iter().collect();
        sorted.sort_by_key(|m| m.method_idx);
        sorted
            .into_iter()
            .map(|m| {
                let code_off = match &m.insns {
                    Some(insns) => {
                        self.align4();
                        let off = self.offset();
                        for v in [m.registers, 0, 0, 0] {
                            self.put(&v.to_le_bytes());
                        }
                        self.put_u32(0);
                        self.put_u32(insns.len() as u32);
                        for unit in insns {
                            self.put(&unit.to_le_bytes());
                        }
                        off
                    }
                    None => 0,
                };
                (m.method_idx, m.access_flags, code_off)
            })
            .collect()
    }
}

/// encoded_value builders, always at full width.
pub mod value {
    pub fn int(v: i32) -> Vec<u8> {
        let mut out = vec![(3 << 5) | 0x04];
        out.extend_from_slice(&v.to_le_bytes());
        out
    }

    pub fn long(v: i64) -> Vec<u8> {
        let mut out = vec![(7 << 5) | 0x06];
        out.extend_from_slice(&v.to_le_bytes());
        out
    }

    pub fn string(idx: u32) -> Vec<u8> {
        let mut out = vec![(3 << 5) | 0x17];
        out.extend_from_slice(&idx.to_le_bytes());
        out
    }

    pub fn boolean(v: bool) -> Vec<u8> {
        vec![((v as u8) << 5) | 0x1f]
    }

    pub fn null() -> Vec<u8> {
        vec![0x1e]
    }
}

/// Code unit builders for the instructions the scenarios use.
pub mod asm {
    fn op_aa(op: u8, a: u8) -> u16 {
        op as u16 | (a as u16) << 8
    }

    pub fn nop() -> Vec<u16> {
        vec![0x0000]
    }

    pub fn return_void() -> Vec<u16> {
        vec![0x000e]
    }

    pub fn const4(reg: u8, literal: i8) -> Vec<u16> {
        vec![0x12 | ((reg & 0x0f) as u16) << 8 | ((literal as u8 & 0x0f) as u16) << 12]
    }

    pub fn const16(reg: u8, literal: i16) -> Vec<u16> {
        vec![op_aa(0x13, reg), literal as u16]
    }

    pub fn const32(reg: u8, literal: i32) -> Vec<u16> {
        vec![op_aa(0x14, reg), literal as u32 as u16, ((literal as u32) >> 16) as u16]
    }

    pub fn const_string(reg: u8, string_idx: u16) -> Vec<u16> {
        vec![op_aa(0x1a, reg), string_idx]
    }

    pub fn const_class(reg: u8, type_idx: u16) -> Vec<u16> {
        vec![op_aa(0x1c, reg), type_idx]
    }

    pub fn new_instance(reg: u8, type_idx: u16) -> Vec<u16> {
        vec![op_aa(0x22, reg), type_idx]
    }

    pub fn move_result(reg: u8) -> Vec<u16> {
        vec![op_aa(0x0a, reg)]
    }

    pub fn move_result_object(reg: u8) -> Vec<u16> {
        vec![op_aa(0x0c, reg)]
    }

    pub fn aget(dst: u8, array: u8, index: u8) -> Vec<u16> {
        vec![op_aa(0x44, dst), array as u16 | (index as u16) << 8]
    }

    pub fn iget(dst: u8, object: u8, field_idx: u16) -> Vec<u16> {
        vec![0x52 | ((dst & 0x0f) as u16) << 8 | ((object & 0x0f) as u16) << 12, field_idx]
    }

    pub fn sget(reg: u8, field_idx: u16) -> Vec<u16> {
        vec![op_aa(0x60, reg), field_idx]
    }

    pub fn sget_object(reg: u8, field_idx: u16) -> Vec<u16> {
        vec![op_aa(0x62, reg), field_idx]
    }

    pub fn add_int_lit8(dst: u8, src: u8, literal: i8) -> Vec<u16> {
        vec![op_aa(0xd8, dst), src as u16 | (literal as u8 as u16) << 8]
    }

    fn invoke(op: u8, args: &[u8], method_idx: u16) -> Vec<u16> {
        assert!(args.len() <= 5);
        let g = args.get(4).copied().unwrap_or(0) as u16;
        let mut word = 0u16;
        for (i, r) in args.iter().take(4).enumerate() {
            word |= ((*r & 0x0f) as u16) << (4 * i);
        }
        vec![op as u16 | g << 8 | (args.len() as u16) << 12, method_idx, word]
    }

    pub fn invoke_virtual(args: &[u8], method_idx: u16) -> Vec<u16> {
        invoke(0x6e, args, method_idx)
    }

    pub fn invoke_direct(args: &[u8], method_idx: u16) -> Vec<u16> {
        invoke(0x70, args, method_idx)
    }

    pub fn invoke_static(args: &[u8], method_idx: u16) -> Vec<u16> {
        invoke(0x71, args, method_idx)
    }

    pub fn invoke_static_range(first: u16, count: u8, method_idx: u16) -> Vec<u16> {
        vec![op_aa(0x77, count), method_idx, first]
    }

    pub fn body(parts: &[Vec<u16>]) -> Vec<u16> {
        parts.concat()
    }
}
