/* Materialized classes, fields and methods of a DEX file */
/* Type names are kept as raw descriptors e.g. Ljava/lang/String; */

use bitflags::bitflags;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fmt;

use crate::dex::class_data::CodeItem;
use crate::dex::encoded_values::EncodedValue;
use crate::dex::error::DexError;
use crate::dex::instructions::{decode_method_body, Instruction};

pub const STRING_DESCRIPTOR: &str = "Ljava/lang/String;";

bitflags! {
    /// Access flags shared by classes, fields and methods. Some bits mean
    /// different things depending on the member kind (`VOLATILE`/`BRIDGE`,
    /// `TRANSIENT`/`VARARGS`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    pub struct AccessFlags: u32 {
        const PUBLIC = 0x1;
        const PRIVATE = 0x2;
        const PROTECTED = 0x4;
        const STATIC = 0x8;
        const FINAL = 0x10;
        const SYNCHRONIZED = 0x20;
        const VOLATILE = 0x40;
        const BRIDGE = 0x40;
        const TRANSIENT = 0x80;
        const VARARGS = 0x80;
        const NATIVE = 0x100;
        const INTERFACE = 0x200;
        const ABSTRACT = 0x400;
        const STRICT = 0x800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const CONSTRUCTOR = 0x10000;
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

impl AccessFlags {
    pub fn is_static(&self) -> bool {
        self.contains(AccessFlags::STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        self.contains(AccessFlags::ABSTRACT)
    }

    pub fn is_native(&self) -> bool {
        self.contains(AccessFlags::NATIVE)
    }

    pub fn is_interface(&self) -> bool {
        self.contains(AccessFlags::INTERFACE)
    }

    pub fn is_constructor(&self) -> bool {
        self.contains(AccessFlags::CONSTRUCTOR)
    }
}

/// Struct representing a field defined by a class in this DEX
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DexField {
    /// Field name
    pub name: String,
    /// Type descriptor e.g. `I` or `Ljava/lang/String;`
    pub type_descriptor: String,
    /// Descriptor of the declaring class
    pub class_name: String,
    /// `Lcls;->name:type`
    pub descriptor: String,
    /// Index into field_ids
    pub field_idx: u32,
    pub access_flags: AccessFlags,
    /// Static initializer from the class' static values, if one was encoded
    pub initial_value: Option<EncodedValue>,
}

impl DexField {
    pub fn is_static(&self) -> bool {
        self.access_flags.is_static()
    }

    pub fn is_string(&self) -> bool {
        self.type_descriptor == STRING_DESCRIPTOR
    }

    /// The static value as a 64-bit integer; fields without an encoded
    /// initializer hold the zero value of their type.
    pub fn numeric_value(&self) -> i64 {
        self.initial_value.as_ref().map(EncodedValue::as_i64).unwrap_or(0)
    }

    /// String table index of a `String` initializer.
    pub fn string_index(&self) -> Option<u32> {
        match self.initial_value {
            Some(EncodedValue::String(idx)) => Some(idx),
            _ => None,
        }
    }
}

impl fmt::Display for DexField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.descriptor)
    }
}

/// Struct representing a method, with its code item when it has one
///
/// The instruction stream is decoded on first use and kept, so repeated
/// calls to [`DexMethod::instructions`] are cheap.
#[derive(Debug, Clone, Serialize)]
pub struct DexMethod {
    /// Method name
    pub name: String,
    /// Descriptor of the declaring class
    pub class_name: String,
    /// Parameter type descriptors in declaration order
    pub parameters: Vec<String>,
    pub return_type: String,
    /// `Lcls;->name(params)ret`
    pub signature: String,
    /// Index into method_ids
    pub method_idx: u32,
    pub access_flags: AccessFlags,
    /// None for abstract and native methods
    pub code: Option<CodeItem>,
    #[serde(skip)]
    decoded: OnceCell<Vec<Instruction>>,
}

impl DexMethod {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        class_name: String,
        parameters: Vec<String>,
        return_type: String,
        signature: String,
        method_idx: u32,
        access_flags: AccessFlags,
        code: Option<CodeItem>,
    ) -> DexMethod {
        DexMethod {
            name,
            class_name,
            parameters,
            return_type,
            signature,
            method_idx,
            access_flags,
            code,
            decoded: OnceCell::new(),
        }
    }

    pub fn has_code(&self) -> bool {
        self.code.is_some()
    }

    /// Decoded instruction stream; empty for methods without code.
    pub fn instructions(&self) -> Result<&[Instruction], DexError> {
        let Some(code) = &self.code else {
            return Ok(&[]);
        };
        let decoded = self
            .decoded
            .get_or_try_init(|| decode_method_body(&code.insns))
            .map_err(|e| DexError::with_context(e, format!("body of {}", self.signature)))?;
        Ok(decoded.as_slice())
    }
}

impl PartialEq for DexMethod {
    fn eq(&self, other: &Self) -> bool {
        self.method_idx == other.method_idx && self.signature == other.signature
    }
}

impl fmt::Display for DexMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.signature)
    }
}

/// Represents a class defined in a DEX file
///
#[derive(Debug, Clone, Serialize)]
pub struct DexClass {
    /// Class descriptor e.g. `Lcom/example/Main;`
    pub name: String,
    pub access_flags: AccessFlags,
    /// None for `java.lang.Object` and for unresolvable superclass indices
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub source_file: Option<String>,
    pub static_fields: Vec<DexField>,
    pub instance_fields: Vec<DexField>,
    pub direct_methods: Vec<DexMethod>,
    pub virtual_methods: Vec<DexMethod>,
}

impl DexClass {
    pub fn new(name: String) -> DexClass {
        DexClass {
            name,
            access_flags: AccessFlags::empty(),
            super_class: None,
            interfaces: vec![],
            source_file: None,
            static_fields: vec![],
            instance_fields: vec![],
            direct_methods: vec![],
            virtual_methods: vec![],
        }
    }

    /// Direct methods, then virtual methods.
    pub fn methods(&self) -> impl Iterator<Item = &DexMethod> {
        self.direct_methods.iter().chain(self.virtual_methods.iter())
    }

    /// Static fields, then instance fields.
    pub fn fields(&self) -> impl Iterator<Item = &DexField> {
        self.static_fields.iter().chain(self.instance_fields.iter())
    }

    /// The class name in dotted java form, e.g. `com.example.Main`.
    pub fn java_name(&self) -> String {
        let inner = self
            .name
            .strip_prefix('L')
            .and_then(|n| n.strip_suffix(';'))
            .unwrap_or(&self.name);
        inner.replace('/', ".")
    }
}

impl PartialEq for DexClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for DexClass {}
