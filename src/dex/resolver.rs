//! Backward register dataflow over a decoded method body.
//!
//! Starting just before a call site, the walk moves towards the start of the
//! body and records, for each register of interest, the value written by the
//! nearest preceding instruction that writes it. Branches are not followed:
//! the scan is over the linear instruction order only.
//!
//! One call hop is followed: a `move-result-object` that takes the result of
//! `Context.getString(int)` resolves the resource id argument of that call
//! and yields a [`ResolvedValue::ResourcePlaceholder`] for later substitution
//! against the resource table.

use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::dex::dex_file::DexFile;
use crate::dex::encoded_values::EncodedValue;
use crate::dex::error::DexError;
use crate::dex::instructions::Instruction;
use crate::dex::opcodes::{InstructionType, Opcode};

/// Rendering of a register that holds a value we cannot express as a literal.
pub const OPAQUE_SENTINEL: &str = "{{DIRTY}}";
/// Prefix of a placeholder that stands for a string resource.
pub const RESOLVE_FROM_RESOURCE: &str = "{{resolve_from_resource}}";
pub const GET_STRING_SIGNATURE: &str = "Landroid/content/Context;->getString(I)Ljava/lang/String;";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ResolvedValue {
    /// No write was found before the start of the body.
    Unresolved,
    /// A string constant, or a number rendered as decimal text.
    Literal(String),
    /// Written, but not by anything we can render.
    Opaque,
    /// The string resource with this id, as decimal text.
    ResourcePlaceholder(String),
}

impl ResolvedValue {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, ResolvedValue::Unresolved)
    }

    /// The value as an argument string: literals as-is, placeholders as
    /// `{{resolve_from_resource}}:<id>`, and nothing for the rest.
    pub fn into_argument(self) -> String {
        match self {
            ResolvedValue::Literal(s) => s,
            ResolvedValue::ResourcePlaceholder(id) => format!("{}:{}", RESOLVE_FROM_RESOURCE, id),
            ResolvedValue::Unresolved | ResolvedValue::Opaque => String::new(),
        }
    }
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedValue::Unresolved => Ok(()),
            ResolvedValue::Literal(s) => write!(f, "{}", s),
            ResolvedValue::Opaque => write!(f, "{}", OPAQUE_SENTINEL),
            ResolvedValue::ResourcePlaceholder(id) => write!(f, "{}:{}", RESOLVE_FROM_RESOURCE, id),
        }
    }
}

/// Parse the resource id out of an argument string produced by
/// [`ResolvedValue::into_argument`].
pub fn placeholder_resource_id(argument: &str) -> Option<u32> {
    let id = argument.strip_prefix(RESOLVE_FROM_RESOURCE)?.strip_prefix(':')?;
    let value: i64 = id.parse().ok()?;
    match value {
        v if (0..=u32::MAX as i64).contains(&v) => Some(v as u32),
        // ids above 0x7fffffff rendered through a signed int
        v if v >= i32::MIN as i64 => Some(v as i32 as u32),
        _ => None,
    }
}

pub struct RegisterResolver<'a> {
    dex: &'a DexFile,
}

impl<'a> RegisterResolver<'a> {
    pub fn new(dex: &'a DexFile) -> RegisterResolver<'a> {
        RegisterResolver { dex }
    }

    /// Resolve `registers` as they stand just before `body[target]`.
    /// Values are returned in the order the registers were given.
    pub fn resolve(&self, body: &[Instruction], target: usize, registers: &[i64]) -> Result<Vec<ResolvedValue>, DexError> {
        let mut values: HashMap<i64, ResolvedValue> =
            registers.iter().map(|r| (*r, ResolvedValue::Unresolved)).collect();
        self.walk(body, target.min(body.len()), &mut values, true)?;
        Ok(registers
            .iter()
            .map(|r| values.get(r).cloned().unwrap_or(ResolvedValue::Unresolved))
            .collect())
    }

    fn walk(
        &self,
        body: &[Instruction],
        from: usize,
        values: &mut HashMap<i64, ResolvedValue>,
        follow_calls: bool,
    ) -> Result<(), DexError> {
        for j in (0..from).rev() {
            if !values.values().any(ResolvedValue::is_unresolved) {
                break;
            }
            let instruction = &body[j];
            let Some(register) = instruction.operands.first() else {
                continue;
            };
            if !matches!(values.get(register), Some(ResolvedValue::Unresolved)) {
                continue;
            }
            if let Some(value) = self.value_written(body, j, follow_calls)? {
                values.insert(*register, value);
            }
        }
        Ok(())
    }

    /// What `body[j]` writes into its first operand register, or None when
    /// it is not a write the walk tracks.
    fn value_written(&self, body: &[Instruction], j: usize, follow_calls: bool) -> Result<Option<ResolvedValue>, DexError> {
        let instruction = &body[j];
        let Some(op) = instruction.op() else {
            return Ok(None);
        };

        let value = match instruction.instruction_type {
            InstructionType::Const => match op {
                Opcode::ConstString | Opcode::ConstStringJumbo => ResolvedValue::Literal(self.string(instruction.operands[1])?),
                Opcode::ConstClass | Opcode::ConstMethodHandle | Opcode::ConstMethodType => ResolvedValue::Opaque,
                _ => match instruction.literal() {
                    Some(v) => ResolvedValue::Literal(v.to_string()),
                    None => ResolvedValue::Opaque,
                },
            },
            InstructionType::StaticOp => match op {
                Opcode::SgetObject => self.static_string(instruction.operands[1])?,
                Opcode::Sget
                | Opcode::SgetWide
                | Opcode::SgetBoolean
                | Opcode::SgetByte
                | Opcode::SgetChar
                | Opcode::SgetShort => self.static_number(instruction.operands[1]),
                _ => return Ok(None),
            },
            InstructionType::MoveResult => match op {
                Opcode::MoveResultObject if follow_calls => self.resource_string(body, j)?,
                _ => ResolvedValue::Opaque,
            },
            InstructionType::Arithmetic | InstructionType::Comparison => ResolvedValue::Opaque,
            InstructionType::InstanceOp | InstructionType::ArrayOp => match op {
                Opcode::Iget
                | Opcode::IgetWide
                | Opcode::IgetObject
                | Opcode::IgetBoolean
                | Opcode::IgetByte
                | Opcode::IgetChar
                | Opcode::IgetShort
                | Opcode::NewInstance
                | Opcode::InstanceOf
                | Opcode::ArrayLength
                | Opcode::Aget
                | Opcode::AgetWide
                | Opcode::AgetObject
                | Opcode::AgetBoolean
                | Opcode::AgetByte
                | Opcode::AgetChar
                | Opcode::AgetShort
                | Opcode::NewArray => ResolvedValue::Opaque,
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    fn string(&self, idx: i64) -> Result<String, DexError> {
        match u32::try_from(idx).ok().and_then(|i| self.dex.string(i)) {
            Some(s) => Ok(s.to_string()),
            None => fail!("String index {} out of range ({} strings)", idx, self.dex.strings.len()),
        }
    }

    fn static_string(&self, field_idx: i64) -> Result<ResolvedValue, DexError> {
        let field = match self.dex.field_by_index(field_idx as u32) {
            Some(field) if field.is_string() => field,
            _ => return Ok(ResolvedValue::Opaque),
        };
        match &field.initial_value {
            Some(EncodedValue::String(idx)) => Ok(ResolvedValue::Literal(self.string(*idx as i64)?)),
            _ => Ok(ResolvedValue::Opaque),
        }
    }

    fn static_number(&self, field_idx: i64) -> ResolvedValue {
        match self.dex.field_by_index(field_idx as u32) {
            Some(field) => ResolvedValue::Literal(field.numeric_value().to_string()),
            None => ResolvedValue::Opaque,
        }
    }

    /// `move-result-object` at `j`: a placeholder when `body[j - 1]` is a
    /// `getString` call with a literal resource id.
    fn resource_string(&self, body: &[Instruction], j: usize) -> Result<ResolvedValue, DexError> {
        if j == 0 {
            return Ok(ResolvedValue::Opaque);
        }
        let call = &body[j - 1];
        let is_get_string = call
            .method_index()
            .and_then(|idx| self.dex.method_signature(idx))
            .map_or(false, |sig| sig == GET_STRING_SIGNATURE);
        if !is_get_string || call.operands.len() < 3 {
            return Ok(ResolvedValue::Opaque);
        }

        let id_register = call.operands[1];
        let mut values = HashMap::from([(id_register, ResolvedValue::Unresolved)]);
        self.walk(body, j - 1, &mut values, false)?;
        match values.remove(&id_register) {
            Some(ResolvedValue::Literal(id)) => Ok(ResolvedValue::ResourcePlaceholder(id)),
            _ => Ok(ResolvedValue::Opaque),
        }
    }
}

impl DexFile {
    /// Argument tuples of every call whose target signature matches `pattern`.
    ///
    /// The receiver of non-static calls is left out. Calls where no argument
    /// resolved to a literal are dropped, and each distinct tuple is kept once,
    /// in class and method order.
    pub fn method_arguments(&self, pattern: &Regex) -> Result<Vec<Vec<String>>, DexError> {
        let mut seen = HashSet::new();
        let mut out = vec![];
        self.collect_method_arguments(pattern, &mut seen, &mut out)?;
        Ok(out)
    }

    pub(crate) fn collect_method_arguments(
        &self,
        pattern: &Regex,
        seen: &mut HashSet<Vec<String>>,
        out: &mut Vec<Vec<String>>,
    ) -> Result<(), DexError> {
        let resolver = RegisterResolver::new(self);
        for method in self.methods() {
            let body = method.instructions()?;
            for (i, instruction) in body.iter().enumerate() {
                let Some(signature) = instruction.method_index().and_then(|idx| self.method_signature(idx)) else {
                    continue;
                };
                if !pattern.is_match(signature) {
                    continue;
                }

                let start = match instruction.op() {
                    Some(Opcode::InvokeStatic | Opcode::InvokeStaticRange) => 0,
                    _ => 1,
                };
                let registers = instruction.argument_registers();
                if registers.len() < start {
                    continue;
                }

                let arguments: Vec<String> = resolver
                    .resolve(body, i, &registers[start..])
                    .map_err(|e| DexError::with_context(e, format!("call to {} in {}", signature, method.signature)))?
                    .into_iter()
                    .map(ResolvedValue::into_argument)
                    .collect();
                if arguments.iter().all(String::is_empty) {
                    continue;
                }
                if seen.insert(arguments.clone()) {
                    out.push(arguments);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_rendering() {
        assert_eq!(ResolvedValue::Literal("x".into()).into_argument(), "x");
        assert_eq!(ResolvedValue::Opaque.into_argument(), "");
        assert_eq!(ResolvedValue::Unresolved.into_argument(), "");
        assert_eq!(
            ResolvedValue::ResourcePlaceholder("2131755038".into()).into_argument(),
            "{{resolve_from_resource}}:2131755038"
        );
        assert_eq!(ResolvedValue::Opaque.to_string(), OPAQUE_SENTINEL);
    }

    #[test]
    fn placeholder_ids() {
        assert_eq!(placeholder_resource_id("{{resolve_from_resource}}:2131755038"), Some(0x7f10001e));
        assert_eq!(placeholder_resource_id("{{resolve_from_resource}}:"), None);
        assert_eq!(placeholder_resource_id("{{resolve_from_resource}}:-1"), Some(0xffffffff));
        assert_eq!(placeholder_resource_id("hello"), None);
    }
}
