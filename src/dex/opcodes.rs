//! Dalvik opcodes and their classification.
//!
//! Every defined opcode maps to exactly one [`InstructionType`] and one
//! [`OperandType`]. The mapping is a pair of exhaustive matches over the
//! closed [`Opcode`] enum, flattened into a 256-entry table indexed by the raw
//! opcode byte. Bytes with no assigned opcode classify as
//! `(InstructionType::Unknown, OperandType::None)`.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;

/// https://source.android.com/docs/core/runtime/dalvik-bytecode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Serialize)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0x00,
    Move = 0x01,
    MoveFrom16 = 0x02,
    Move16 = 0x03,
    MoveWide = 0x04,
    MoveWideFrom16 = 0x05,
    MoveWide16 = 0x06,
    MoveObject = 0x07,
    MoveObjectFrom16 = 0x08,
    MoveObject16 = 0x09,
    MoveResult = 0x0a,
    MoveResultWide = 0x0b,
    MoveResultObject = 0x0c,
    MoveException = 0x0d,
    ReturnVoid = 0x0e,
    Return = 0x0f,
    ReturnWide = 0x10,
    ReturnObject = 0x11,
    Const4 = 0x12,
    Const16 = 0x13,
    Const = 0x14,
    ConstHigh16 = 0x15,
    ConstWide16 = 0x16,
    ConstWide32 = 0x17,
    ConstWide = 0x18,
    ConstWideHigh16 = 0x19,
    ConstString = 0x1a,
    ConstStringJumbo = 0x1b,
    ConstClass = 0x1c,
    MonitorEnter = 0x1d,
    MonitorExit = 0x1e,
    CheckCast = 0x1f,
    InstanceOf = 0x20,
    ArrayLength = 0x21,
    NewInstance = 0x22,
    NewArray = 0x23,
    FilledNewArray = 0x24,
    FilledNewArrayRange = 0x25,
    FillArrayData = 0x26,
    Throw = 0x27,
    Goto = 0x28,
    Goto16 = 0x29,
    Goto32 = 0x2a,
    PackedSwitch = 0x2b,
    SparseSwitch = 0x2c,
    CmplFloat = 0x2d,
    CmpgFloat = 0x2e,
    CmplDouble = 0x2f,
    CmpgDouble = 0x30,
    CmpLong = 0x31,
    IfEq = 0x32,
    IfNe = 0x33,
    IfLt = 0x34,
    IfGe = 0x35,
    IfGt = 0x36,
    IfLe = 0x37,
    IfEqz = 0x38,
    IfNez = 0x39,
    IfLtz = 0x3a,
    IfGez = 0x3b,
    IfGtz = 0x3c,
    IfLez = 0x3d,
    Aget = 0x44,
    AgetWide = 0x45,
    AgetObject = 0x46,
    AgetBoolean = 0x47,
    AgetByte = 0x48,
    AgetChar = 0x49,
    AgetShort = 0x4a,
    Aput = 0x4b,
    AputWide = 0x4c,
    AputObject = 0x4d,
    AputBoolean = 0x4e,
    AputByte = 0x4f,
    AputChar = 0x50,
    AputShort = 0x51,
    Iget = 0x52,
    IgetWide = 0x53,
    IgetObject = 0x54,
    IgetBoolean = 0x55,
    IgetByte = 0x56,
    IgetChar = 0x57,
    IgetShort = 0x58,
    Iput = 0x59,
    IputWide = 0x5a,
    IputObject = 0x5b,
    IputBoolean = 0x5c,
    IputByte = 0x5d,
    IputChar = 0x5e,
    IputShort = 0x5f,
    Sget = 0x60,
    SgetWide = 0x61,
    SgetObject = 0x62,
    SgetBoolean = 0x63,
    SgetByte = 0x64,
    SgetChar = 0x65,
    SgetShort = 0x66,
    Sput = 0x67,
    SputWide = 0x68,
    SputObject = 0x69,
    SputBoolean = 0x6a,
    SputByte = 0x6b,
    SputChar = 0x6c,
    SputShort = 0x6d,
    InvokeVirtual = 0x6e,
    InvokeSuper = 0x6f,
    InvokeDirect = 0x70,
    InvokeStatic = 0x71,
    InvokeInterface = 0x72,
    InvokeVirtualRange = 0x74,
    InvokeSuperRange = 0x75,
    InvokeDirectRange = 0x76,
    InvokeStaticRange = 0x77,
    InvokeInterfaceRange = 0x78,
    NegInt = 0x7b,
    NotInt = 0x7c,
    NegLong = 0x7d,
    NotLong = 0x7e,
    NegFloat = 0x7f,
    NegDouble = 0x80,
    IntToLong = 0x81,
    IntToFloat = 0x82,
    IntToDouble = 0x83,
    LongToInt = 0x84,
    LongToFloat = 0x85,
    LongToDouble = 0x86,
    FloatToInt = 0x87,
    FloatToLong = 0x88,
    FloatToDouble = 0x89,
    DoubleToInt = 0x8a,
    DoubleToLong = 0x8b,
    DoubleToFloat = 0x8c,
    IntToByte = 0x8d,
    IntToChar = 0x8e,
    IntToShort = 0x8f,
    AddInt = 0x90,
    SubInt = 0x91,
    MulInt = 0x92,
    DivInt = 0x93,
    RemInt = 0x94,
    AndInt = 0x95,
    OrInt = 0x96,
    XorInt = 0x97,
    ShlInt = 0x98,
    ShrInt = 0x99,
    UshrInt = 0x9a,
    AddLong = 0x9b,
    SubLong = 0x9c,
    MulLong = 0x9d,
    DivLong = 0x9e,
    RemLong = 0x9f,
    AndLong = 0xa0,
    OrLong = 0xa1,
    XorLong = 0xa2,
    ShlLong = 0xa3,
    ShrLong = 0xa4,
    UshrLong = 0xa5,
    AddFloat = 0xa6,
    SubFloat = 0xa7,
    MulFloat = 0xa8,
    DivFloat = 0xa9,
    RemFloat = 0xaa,
    AddDouble = 0xab,
    SubDouble = 0xac,
    MulDouble = 0xad,
    DivDouble = 0xae,
    RemDouble = 0xaf,
    AddInt2addr = 0xb0,
    SubInt2addr = 0xb1,
    MulInt2addr = 0xb2,
    DivInt2addr = 0xb3,
    RemInt2addr = 0xb4,
    AndInt2addr = 0xb5,
    OrInt2addr = 0xb6,
    XorInt2addr = 0xb7,
    ShlInt2addr = 0xb8,
    ShrInt2addr = 0xb9,
    UshrInt2addr = 0xba,
    AddLong2addr = 0xbb,
    SubLong2addr = 0xbc,
    MulLong2addr = 0xbd,
    DivLong2addr = 0xbe,
    RemLong2addr = 0xbf,
    AndLong2addr = 0xc0,
    OrLong2addr = 0xc1,
    XorLong2addr = 0xc2,
    ShlLong2addr = 0xc3,
    ShrLong2addr = 0xc4,
    UshrLong2addr = 0xc5,
    AddFloat2addr = 0xc6,
    SubFloat2addr = 0xc7,
    MulFloat2addr = 0xc8,
    DivFloat2addr = 0xc9,
    RemFloat2addr = 0xca,
    AddDouble2addr = 0xcb,
    SubDouble2addr = 0xcc,
    MulDouble2addr = 0xcd,
    DivDouble2addr = 0xce,
    RemDouble2addr = 0xcf,
    AddIntLit16 = 0xd0,
    RsubIntLit16 = 0xd1,
    MulIntLit16 = 0xd2,
    DivIntLit16 = 0xd3,
    RemIntLit16 = 0xd4,
    AndIntLit16 = 0xd5,
    OrIntLit16 = 0xd6,
    XorIntLit16 = 0xd7,
    AddIntLit8 = 0xd8,
    RsubIntLit8 = 0xd9,
    MulIntLit8 = 0xda,
    DivIntLit8 = 0xdb,
    RemIntLit8 = 0xdc,
    AndIntLit8 = 0xdd,
    OrIntLit8 = 0xde,
    XorIntLit8 = 0xdf,
    ShlIntLit8 = 0xe0,
    ShrIntLit8 = 0xe1,
    UshrIntLit8 = 0xe2,
    InvokePolymorphic = 0xfa,
    InvokePolymorphicRange = 0xfb,
    InvokeCustom = 0xfc,
    InvokeCustomRange = 0xfd,
    ConstMethodHandle = 0xfe,
    ConstMethodType = 0xff,
}

/// Coarse semantic category of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InstructionType {
    Unknown,
    Move,
    Cond,
    Goto,
    Noop,
    Cast,
    Const,
    Return,
    ArrayOp,
    StaticOp,
    SwitchOp,
    Exception,
    Invocation,
    Comparison,
    InstanceOp,
    MoveResult,
    Arithmetic,
}

/// Layout of the operand bytes that follow the opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperandType {
    /// One ignored byte.
    None,
    /// `AA`
    Reg,
    /// `B|A`, two nibbles.
    TwoReg,
    /// `AA BBBB`
    RegShort,
    /// `00 AAAA`
    Short,
    /// `00 AAAA BBBB`
    TwoShort,
    /// `B|A CCCC`
    TwoRegShort,
    /// `00 AAAAAAAA`
    Uint,
    /// `AA BBBBBBBB`
    RegUint,
    /// `AA BBBBBBBBBBBBBBBB`
    RegUlong,
    /// `AA BB CC`
    ThreeReg,
    /// `A|G BBBB F|E|D|C`
    RegisterArray,
    /// `AA BBBB CCCC`
    RegisterRange,
    /// `AA BBBB`, literal shifted into bits 16..32.
    RegHigh32,
    /// `AA BBBB`, literal shifted into bits 48..64.
    RegHigh64,
    /// `AA BBBB`, sign-extended 16-bit literal.
    RegWide16,
    /// `AA BBBBBBBB`, sign-extended 32-bit literal.
    RegWide32,
}

impl OperandType {
    /// Total encoded length in bytes, opcode byte included.
    pub fn instruction_len(self) -> usize {
        match self {
            OperandType::None | OperandType::Reg | OperandType::TwoReg => 2,
            OperandType::RegShort
            | OperandType::Short
            | OperandType::TwoRegShort
            | OperandType::ThreeReg
            | OperandType::RegHigh32
            | OperandType::RegHigh64
            | OperandType::RegWide16 => 4,
            OperandType::TwoShort
            | OperandType::Uint
            | OperandType::RegUint
            | OperandType::RegisterArray
            | OperandType::RegisterRange
            | OperandType::RegWide32 => 6,
            OperandType::RegUlong => 10,
        }
    }
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        FromPrimitive::from_u8(byte)
    }

    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Mnemonic as written in smali.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Move => "move",
            Opcode::MoveFrom16 => "move/from16",
            Opcode::Move16 => "move/16",
            Opcode::MoveWide => "move-wide",
            Opcode::MoveWideFrom16 => "move-wide/from16",
            Opcode::MoveWide16 => "move-wide/16",
            Opcode::MoveObject => "move-object",
            Opcode::MoveObjectFrom16 => "move-object/from16",
            Opcode::MoveObject16 => "move-object/16",
            Opcode::MoveResult => "move-result",
            Opcode::MoveResultWide => "move-result-wide",
            Opcode::MoveResultObject => "move-result-object",
            Opcode::MoveException => "move-exception",
            Opcode::ReturnVoid => "return-void",
            Opcode::Return => "return",
            Opcode::ReturnWide => "return-wide",
            Opcode::ReturnObject => "return-object",
            Opcode::Const4 => "const/4",
            Opcode::Const16 => "const/16",
            Opcode::Const => "const",
            Opcode::ConstHigh16 => "const/high16",
            Opcode::ConstWide16 => "const-wide/16",
            Opcode::ConstWide32 => "const-wide/32",
            Opcode::ConstWide => "const-wide",
            Opcode::ConstWideHigh16 => "const-wide/high16",
            Opcode::ConstString => "const-string",
            Opcode::ConstStringJumbo => "const-string/jumbo",
            Opcode::ConstClass => "const-class",
            Opcode::MonitorEnter => "monitor-enter",
            Opcode::MonitorExit => "monitor-exit",
            Opcode::CheckCast => "check-cast",
            Opcode::InstanceOf => "instance-of",
            Opcode::ArrayLength => "array-length",
            Opcode::NewInstance => "new-instance",
            Opcode::NewArray => "new-array",
            Opcode::FilledNewArray => "filled-new-array",
            Opcode::FilledNewArrayRange => "filled-new-array/range",
            Opcode::FillArrayData => "fill-array-data",
            Opcode::Throw => "throw",
            Opcode::Goto => "goto",
            Opcode::Goto16 => "goto/16",
            Opcode::Goto32 => "goto/32",
            Opcode::PackedSwitch => "packed-switch",
            Opcode::SparseSwitch => "sparse-switch",
            Opcode::CmplFloat => "cmpl-float",
            Opcode::CmpgFloat => "cmpg-float",
            Opcode::CmplDouble => "cmpl-double",
            Opcode::CmpgDouble => "cmpg-double",
            Opcode::CmpLong => "cmp-long",
            Opcode::IfEq => "if-eq",
            Opcode::IfNe => "if-ne",
            Opcode::IfLt => "if-lt",
            Opcode::IfGe => "if-ge",
            Opcode::IfGt => "if-gt",
            Opcode::IfLe => "if-le",
            Opcode::IfEqz => "if-eqz",
            Opcode::IfNez => "if-nez",
            Opcode::IfLtz => "if-ltz",
            Opcode::IfGez => "if-gez",
            Opcode::IfGtz => "if-gtz",
            Opcode::IfLez => "if-lez",
            Opcode::Aget => "aget",
            Opcode::AgetWide => "aget-wide",
            Opcode::AgetObject => "aget-object",
            Opcode::AgetBoolean => "aget-boolean",
            Opcode::AgetByte => "aget-byte",
            Opcode::AgetChar => "aget-char",
            Opcode::AgetShort => "aget-short",
            Opcode::Aput => "aput",
            Opcode::AputWide => "aput-wide",
            Opcode::AputObject => "aput-object",
            Opcode::AputBoolean => "aput-boolean",
            Opcode::AputByte => "aput-byte",
            Opcode::AputChar => "aput-char",
            Opcode::AputShort => "aput-short",
            Opcode::Iget => "iget",
            Opcode::IgetWide => "iget-wide",
            Opcode::IgetObject => "iget-object",
            Opcode::IgetBoolean => "iget-boolean",
            Opcode::IgetByte => "iget-byte",
            Opcode::IgetChar => "iget-char",
            Opcode::IgetShort => "iget-short",
            Opcode::Iput => "iput",
            Opcode::IputWide => "iput-wide",
            Opcode::IputObject => "iput-object",
            Opcode::IputBoolean => "iput-boolean",
            Opcode::IputByte => "iput-byte",
            Opcode::IputChar => "iput-char",
            Opcode::IputShort => "iput-short",
            Opcode::Sget => "sget",
            Opcode::SgetWide => "sget-wide",
            Opcode::SgetObject => "sget-object",
            Opcode::SgetBoolean => "sget-boolean",
            Opcode::SgetByte => "sget-byte",
            Opcode::SgetChar => "sget-char",
            Opcode::SgetShort => "sget-short",
            Opcode::Sput => "sput",
            Opcode::SputWide => "sput-wide",
            Opcode::SputObject => "sput-object",
            Opcode::SputBoolean => "sput-boolean",
            Opcode::SputByte => "sput-byte",
            Opcode::SputChar => "sput-char",
            Opcode::SputShort => "sput-short",
            Opcode::InvokeVirtual => "invoke-virtual",
            Opcode::InvokeSuper => "invoke-super",
            Opcode::InvokeDirect => "invoke-direct",
            Opcode::InvokeStatic => "invoke-static",
            Opcode::InvokeInterface => "invoke-interface",
            Opcode::InvokeVirtualRange => "invoke-virtual/range",
            Opcode::InvokeSuperRange => "invoke-super/range",
            Opcode::InvokeDirectRange => "invoke-direct/range",
            Opcode::InvokeStaticRange => "invoke-static/range",
            Opcode::InvokeInterfaceRange => "invoke-interface/range",
            Opcode::NegInt => "neg-int",
            Opcode::NotInt => "not-int",
            Opcode::NegLong => "neg-long",
            Opcode::NotLong => "not-long",
            Opcode::NegFloat => "neg-float",
            Opcode::NegDouble => "neg-double",
            Opcode::IntToLong => "int-to-long",
            Opcode::IntToFloat => "int-to-float",
            Opcode::IntToDouble => "int-to-double",
            Opcode::LongToInt => "long-to-int",
            Opcode::LongToFloat => "long-to-float",
            Opcode::LongToDouble => "long-to-double",
            Opcode::FloatToInt => "float-to-int",
            Opcode::FloatToLong => "float-to-long",
            Opcode::FloatToDouble => "float-to-double",
            Opcode::DoubleToInt => "double-to-int",
            Opcode::DoubleToLong => "double-to-long",
            Opcode::DoubleToFloat => "double-to-float",
            Opcode::IntToByte => "int-to-byte",
            Opcode::IntToChar => "int-to-char",
            Opcode::IntToShort => "int-to-short",
            Opcode::AddInt => "add-int",
            Opcode::SubInt => "sub-int",
            Opcode::MulInt => "mul-int",
            Opcode::DivInt => "div-int",
            Opcode::RemInt => "rem-int",
            Opcode::AndInt => "and-int",
            Opcode::OrInt => "or-int",
            Opcode::XorInt => "xor-int",
            Opcode::ShlInt => "shl-int",
            Opcode::ShrInt => "shr-int",
            Opcode::UshrInt => "ushr-int",
            Opcode::AddLong => "add-long",
            Opcode::SubLong => "sub-long",
            Opcode::MulLong => "mul-long",
            Opcode::DivLong => "div-long",
            Opcode::RemLong => "rem-long",
            Opcode::AndLong => "and-long",
            Opcode::OrLong => "or-long",
            Opcode::XorLong => "xor-long",
            Opcode::ShlLong => "shl-long",
            Opcode::ShrLong => "shr-long",
            Opcode::UshrLong => "ushr-long",
            Opcode::AddFloat => "add-float",
            Opcode::SubFloat => "sub-float",
            Opcode::MulFloat => "mul-float",
            Opcode::DivFloat => "div-float",
            Opcode::RemFloat => "rem-float",
            Opcode::AddDouble => "add-double",
            Opcode::SubDouble => "sub-double",
            Opcode::MulDouble => "mul-double",
            Opcode::DivDouble => "div-double",
            Opcode::RemDouble => "rem-double",
            Opcode::AddInt2addr => "add-int/2addr",
            Opcode::SubInt2addr => "sub-int/2addr",
            Opcode::MulInt2addr => "mul-int/2addr",
            Opcode::DivInt2addr => "div-int/2addr",
            Opcode::RemInt2addr => "rem-int/2addr",
            Opcode::AndInt2addr => "and-int/2addr",
            Opcode::OrInt2addr => "or-int/2addr",
            Opcode::XorInt2addr => "xor-int/2addr",
            Opcode::ShlInt2addr => "shl-int/2addr",
            Opcode::ShrInt2addr => "shr-int/2addr",
            Opcode::UshrInt2addr => "ushr-int/2addr",
            Opcode::AddLong2addr => "add-long/2addr",
            Opcode::SubLong2addr => "sub-long/2addr",
            Opcode::MulLong2addr => "mul-long/2addr",
            Opcode::DivLong2addr => "div-long/2addr",
            Opcode::RemLong2addr => "rem-long/2addr",
            Opcode::AndLong2addr => "and-long/2addr",
            Opcode::OrLong2addr => "or-long/2addr",
            Opcode::XorLong2addr => "xor-long/2addr",
            Opcode::ShlLong2addr => "shl-long/2addr",
            Opcode::ShrLong2addr => "shr-long/2addr",
            Opcode::UshrLong2addr => "ushr-long/2addr",
            Opcode::AddFloat2addr => "add-float/2addr",
            Opcode::SubFloat2addr => "sub-float/2addr",
            Opcode::MulFloat2addr => "mul-float/2addr",
            Opcode::DivFloat2addr => "div-float/2addr",
            Opcode::RemFloat2addr => "rem-float/2addr",
            Opcode::AddDouble2addr => "add-double/2addr",
            Opcode::SubDouble2addr => "sub-double/2addr",
            Opcode::MulDouble2addr => "mul-double/2addr",
            Opcode::DivDouble2addr => "div-double/2addr",
            Opcode::RemDouble2addr => "rem-double/2addr",
            Opcode::AddIntLit16 => "add-int/lit16",
            Opcode::RsubIntLit16 => "rsub-int",
            Opcode::MulIntLit16 => "mul-int/lit16",
            Opcode::DivIntLit16 => "div-int/lit16",
            Opcode::RemIntLit16 => "rem-int/lit16",
            Opcode::AndIntLit16 => "and-int/lit16",
            Opcode::OrIntLit16 => "or-int/lit16",
            Opcode::XorIntLit16 => "xor-int/lit16",
            Opcode::AddIntLit8 => "add-int/lit8",
            Opcode::RsubIntLit8 => "rsub-int/lit8",
            Opcode::MulIntLit8 => "mul-int/lit8",
            Opcode::DivIntLit8 => "div-int/lit8",
            Opcode::RemIntLit8 => "rem-int/lit8",
            Opcode::AndIntLit8 => "and-int/lit8",
            Opcode::OrIntLit8 => "or-int/lit8",
            Opcode::XorIntLit8 => "xor-int/lit8",
            Opcode::ShlIntLit8 => "shl-int/lit8",
            Opcode::ShrIntLit8 => "shr-int/lit8",
            Opcode::UshrIntLit8 => "ushr-int/lit8",
            Opcode::InvokePolymorphic => "invoke-polymorphic",
            Opcode::InvokePolymorphicRange => "invoke-polymorphic/range",
            Opcode::InvokeCustom => "invoke-custom",
            Opcode::InvokeCustomRange => "invoke-custom/range",
            Opcode::ConstMethodHandle => "const-method-handle",
            Opcode::ConstMethodType => "const-method-type",
        }
    }

    pub fn operand_type(self) -> OperandType {
        match self {
            Opcode::Nop | Opcode::ReturnVoid => OperandType::None,
            Opcode::AddInt2addr
            | Opcode::SubInt2addr
            | Opcode::MulInt2addr
            | Opcode::DivInt2addr
            | Opcode::RemInt2addr
            | Opcode::AndInt2addr
            | Opcode::OrInt2addr
            | Opcode::XorInt2addr
            | Opcode::ShlInt2addr
            | Opcode::ShrInt2addr
            | Opcode::UshrInt2addr
            | Opcode::AddLong2addr
            | Opcode::SubLong2addr
            | Opcode::MulLong2addr
            | Opcode::DivLong2addr
            | Opcode::RemLong2addr
            | Opcode::AndLong2addr
            | Opcode::OrLong2addr
            | Opcode::XorLong2addr
            | Opcode::ShlLong2addr
            | Opcode::ShrLong2addr
            | Opcode::UshrLong2addr
            | Opcode::AddFloat2addr
            | Opcode::SubFloat2addr
            | Opcode::MulFloat2addr
            | Opcode::DivFloat2addr
            | Opcode::RemFloat2addr
            | Opcode::AddDouble2addr
            | Opcode::SubDouble2addr
            | Opcode::MulDouble2addr
            | Opcode::DivDouble2addr
            | Opcode::RemDouble2addr
            | Opcode::NegInt
            | Opcode::NotInt
            | Opcode::NegLong
            | Opcode::NotLong
            | Opcode::NegFloat
            | Opcode::NegDouble
            | Opcode::IntToLong
            | Opcode::IntToFloat
            | Opcode::IntToDouble
            | Opcode::LongToInt
            | Opcode::LongToFloat
            | Opcode::LongToDouble
            | Opcode::FloatToInt
            | Opcode::FloatToLong
            | Opcode::FloatToDouble
            | Opcode::DoubleToInt
            | Opcode::DoubleToLong
            | Opcode::DoubleToFloat
            | Opcode::IntToByte
            | Opcode::IntToChar
            | Opcode::IntToShort
            | Opcode::ArrayLength
            | Opcode::Const4
            | Opcode::Move
            | Opcode::MoveObject
            | Opcode::MoveWide => OperandType::TwoReg,
            Opcode::ConstMethodType
            | Opcode::ConstMethodHandle
            | Opcode::Sget
            | Opcode::SgetWide
            | Opcode::SgetObject
            | Opcode::SgetBoolean
            | Opcode::SgetByte
            | Opcode::SgetChar
            | Opcode::SgetShort
            | Opcode::Sput
            | Opcode::SputWide
            | Opcode::SputObject
            | Opcode::SputBoolean
            | Opcode::SputByte
            | Opcode::SputChar
            | Opcode::SputShort
            | Opcode::Const16
            | Opcode::ConstString
            | Opcode::ConstClass
            | Opcode::MoveFrom16
            | Opcode::MoveWideFrom16
            | Opcode::MoveObjectFrom16
            | Opcode::NewInstance
            | Opcode::CheckCast
            | Opcode::IfEqz
            | Opcode::IfNez
            | Opcode::IfLtz
            | Opcode::IfGez
            | Opcode::IfGtz
            | Opcode::IfLez => OperandType::RegShort,
            Opcode::Move16 | Opcode::MoveWide16 | Opcode::MoveObject16 => OperandType::TwoShort,
            Opcode::Throw
            | Opcode::MonitorEnter
            | Opcode::MonitorExit
            | Opcode::ReturnWide
            | Opcode::ReturnObject
            | Opcode::Return
            | Opcode::MoveResult
            | Opcode::MoveResultWide
            | Opcode::MoveResultObject
            | Opcode::Goto
            | Opcode::MoveException => OperandType::Reg,
            Opcode::Const
            | Opcode::ConstStringJumbo
            | Opcode::FillArrayData
            | Opcode::PackedSwitch
            | Opcode::SparseSwitch => OperandType::RegUint,
            Opcode::AddIntLit16
            | Opcode::RsubIntLit16
            | Opcode::MulIntLit16
            | Opcode::DivIntLit16
            | Opcode::RemIntLit16
            | Opcode::AndIntLit16
            | Opcode::OrIntLit16
            | Opcode::XorIntLit16
            | Opcode::Iget
            | Opcode::IgetWide
            | Opcode::IgetObject
            | Opcode::IgetBoolean
            | Opcode::IgetByte
            | Opcode::IgetChar
            | Opcode::IgetShort
            | Opcode::Iput
            | Opcode::IputWide
            | Opcode::IputObject
            | Opcode::IputBoolean
            | Opcode::IputByte
            | Opcode::IputChar
            | Opcode::IputShort
            | Opcode::InstanceOf
            | Opcode::NewArray
            | Opcode::IfEq
            | Opcode::IfNe
            | Opcode::IfLt
            | Opcode::IfGe
            | Opcode::IfGt
            | Opcode::IfLe => OperandType::TwoRegShort,
            Opcode::AddIntLit8
            | Opcode::RsubIntLit8
            | Opcode::MulIntLit8
            | Opcode::DivIntLit8
            | Opcode::RemIntLit8
            | Opcode::AndIntLit8
            | Opcode::OrIntLit8
            | Opcode::XorIntLit8
            | Opcode::ShlIntLit8
            | Opcode::ShrIntLit8
            | Opcode::UshrIntLit8
            | Opcode::AddInt
            | Opcode::SubInt
            | Opcode::MulInt
            | Opcode::DivInt
            | Opcode::RemInt
            | Opcode::AndInt
            | Opcode::OrInt
            | Opcode::XorInt
            | Opcode::ShlInt
            | Opcode::ShrInt
            | Opcode::UshrInt
            | Opcode::AddLong
            | Opcode::SubLong
            | Opcode::MulLong
            | Opcode::DivLong
            | Opcode::RemLong
            | Opcode::AndLong
            | Opcode::OrLong
            | Opcode::XorLong
            | Opcode::ShlLong
            | Opcode::ShrLong
            | Opcode::UshrLong
            | Opcode::AddFloat
            | Opcode::SubFloat
            | Opcode::MulFloat
            | Opcode::DivFloat
            | Opcode::RemFloat
            | Opcode::AddDouble
            | Opcode::SubDouble
            | Opcode::MulDouble
            | Opcode::DivDouble
            | Opcode::RemDouble
            | Opcode::Aget
            | Opcode::AgetWide
            | Opcode::AgetObject
            | Opcode::AgetBoolean
            | Opcode::AgetByte
            | Opcode::AgetChar
            | Opcode::AgetShort
            | Opcode::Aput
            | Opcode::AputWide
            | Opcode::AputObject
            | Opcode::AputBoolean
            | Opcode::AputByte
            | Opcode::AputChar
            | Opcode::AputShort
            | Opcode::CmplFloat
            | Opcode::CmpgFloat
            | Opcode::CmplDouble
            | Opcode::CmpgDouble
            | Opcode::CmpLong => OperandType::ThreeReg,
            Opcode::Goto16 => OperandType::Short,
            Opcode::Goto32 => OperandType::Uint,
            Opcode::ConstWide => OperandType::RegUlong,
            Opcode::FilledNewArray
            | Opcode::InvokePolymorphic
            | Opcode::InvokeCustom
            | Opcode::InvokeVirtual
            | Opcode::InvokeSuper
            | Opcode::InvokeDirect
            | Opcode::InvokeStatic
            | Opcode::InvokeInterface => OperandType::RegisterArray,
            Opcode::FilledNewArrayRange
            | Opcode::InvokePolymorphicRange
            | Opcode::InvokeCustomRange
            | Opcode::InvokeVirtualRange
            | Opcode::InvokeSuperRange
            | Opcode::InvokeDirectRange
            | Opcode::InvokeStaticRange
            | Opcode::InvokeInterfaceRange => OperandType::RegisterRange,
            Opcode::ConstHigh16 => OperandType::RegHigh32,
            Opcode::ConstWideHigh16 => OperandType::RegHigh64,
            Opcode::ConstWide16 => OperandType::RegWide16,
            Opcode::ConstWide32 => OperandType::RegWide32,
        }
    }

    pub fn instruction_type(self) -> InstructionType {
        match self {
            Opcode::Nop => InstructionType::Noop,
            Opcode::ReturnVoid
            | Opcode::ReturnWide
            | Opcode::ReturnObject
            | Opcode::Return => InstructionType::Return,
            Opcode::AddInt2addr
            | Opcode::SubInt2addr
            | Opcode::MulInt2addr
            | Opcode::DivInt2addr
            | Opcode::RemInt2addr
            | Opcode::AndInt2addr
            | Opcode::OrInt2addr
            | Opcode::XorInt2addr
            | Opcode::ShlInt2addr
            | Opcode::ShrInt2addr
            | Opcode::UshrInt2addr
            | Opcode::AddLong2addr
            | Opcode::SubLong2addr
            | Opcode::MulLong2addr
            | Opcode::DivLong2addr
            | Opcode::RemLong2addr
            | Opcode::AndLong2addr
            | Opcode::OrLong2addr
            | Opcode::XorLong2addr
            | Opcode::ShlLong2addr
            | Opcode::ShrLong2addr
            | Opcode::UshrLong2addr
            | Opcode::AddFloat2addr
            | Opcode::SubFloat2addr
            | Opcode::MulFloat2addr
            | Opcode::DivFloat2addr
            | Opcode::RemFloat2addr
            | Opcode::AddDouble2addr
            | Opcode::SubDouble2addr
            | Opcode::MulDouble2addr
            | Opcode::DivDouble2addr
            | Opcode::RemDouble2addr
            | Opcode::NegInt
            | Opcode::NotInt
            | Opcode::NegLong
            | Opcode::NotLong
            | Opcode::NegFloat
            | Opcode::NegDouble
            | Opcode::AddIntLit16
            | Opcode::RsubIntLit16
            | Opcode::MulIntLit16
            | Opcode::DivIntLit16
            | Opcode::RemIntLit16
            | Opcode::AndIntLit16
            | Opcode::OrIntLit16
            | Opcode::XorIntLit16
            | Opcode::AddIntLit8
            | Opcode::RsubIntLit8
            | Opcode::MulIntLit8
            | Opcode::DivIntLit8
            | Opcode::RemIntLit8
            | Opcode::AndIntLit8
            | Opcode::OrIntLit8
            | Opcode::XorIntLit8
            | Opcode::ShlIntLit8
            | Opcode::ShrIntLit8
            | Opcode::UshrIntLit8
            | Opcode::AddInt
            | Opcode::SubInt
            | Opcode::MulInt
            | Opcode::DivInt
            | Opcode::RemInt
            | Opcode::AndInt
            | Opcode::OrInt
            | Opcode::XorInt
            | Opcode::ShlInt
            | Opcode::ShrInt
            | Opcode::UshrInt
            | Opcode::AddLong
            | Opcode::SubLong
            | Opcode::MulLong
            | Opcode::DivLong
            | Opcode::RemLong
            | Opcode::AndLong
            | Opcode::OrLong
            | Opcode::XorLong
            | Opcode::ShlLong
            | Opcode::ShrLong
            | Opcode::UshrLong
            | Opcode::AddFloat
            | Opcode::SubFloat
            | Opcode::MulFloat
            | Opcode::DivFloat
            | Opcode::RemFloat
            | Opcode::AddDouble
            | Opcode::SubDouble
            | Opcode::MulDouble
            | Opcode::DivDouble
            | Opcode::RemDouble => InstructionType::Arithmetic,
            Opcode::IntToLong
            | Opcode::IntToFloat
            | Opcode::IntToDouble
            | Opcode::LongToInt
            | Opcode::LongToFloat
            | Opcode::LongToDouble
            | Opcode::FloatToInt
            | Opcode::FloatToLong
            | Opcode::FloatToDouble
            | Opcode::DoubleToInt
            | Opcode::DoubleToLong
            | Opcode::DoubleToFloat
            | Opcode::IntToByte
            | Opcode::IntToChar
            | Opcode::IntToShort => InstructionType::Cast,
            Opcode::ArrayLength
            | Opcode::NewArray
            | Opcode::Aget
            | Opcode::AgetWide
            | Opcode::AgetObject
            | Opcode::AgetBoolean
            | Opcode::AgetByte
            | Opcode::AgetChar
            | Opcode::AgetShort
            | Opcode::Aput
            | Opcode::AputWide
            | Opcode::AputObject
            | Opcode::AputBoolean
            | Opcode::AputByte
            | Opcode::AputChar
            | Opcode::AputShort
            | Opcode::FillArrayData
            | Opcode::FilledNewArray
            | Opcode::FilledNewArrayRange => InstructionType::ArrayOp,
            Opcode::Const4
            | Opcode::Const16
            | Opcode::ConstClass
            | Opcode::ConstString
            | Opcode::ConstMethodType
            | Opcode::ConstMethodHandle
            | Opcode::Const
            | Opcode::ConstStringJumbo
            | Opcode::ConstWide
            | Opcode::ConstHigh16
            | Opcode::ConstWideHigh16
            | Opcode::ConstWide16
            | Opcode::ConstWide32 => InstructionType::Const,
            Opcode::Move
            | Opcode::MoveObject
            | Opcode::MoveWide
            | Opcode::MoveFrom16
            | Opcode::MoveWideFrom16
            | Opcode::MoveObjectFrom16
            | Opcode::Move16
            | Opcode::MoveWide16
            | Opcode::MoveObject16 => InstructionType::Move,
            Opcode::MoveResult
            | Opcode::MoveResultWide
            | Opcode::MoveResultObject => InstructionType::MoveResult,
            Opcode::Sget
            | Opcode::SgetWide
            | Opcode::SgetObject
            | Opcode::SgetBoolean
            | Opcode::SgetByte
            | Opcode::SgetChar
            | Opcode::SgetShort
            | Opcode::Sput
            | Opcode::SputWide
            | Opcode::SputObject
            | Opcode::SputBoolean
            | Opcode::SputByte
            | Opcode::SputChar
            | Opcode::SputShort => InstructionType::StaticOp,
            Opcode::NewInstance
            | Opcode::Iget
            | Opcode::IgetWide
            | Opcode::IgetObject
            | Opcode::IgetBoolean
            | Opcode::IgetByte
            | Opcode::IgetChar
            | Opcode::IgetShort
            | Opcode::Iput
            | Opcode::IputWide
            | Opcode::IputObject
            | Opcode::IputBoolean
            | Opcode::IputByte
            | Opcode::IputChar
            | Opcode::IputShort
            | Opcode::InstanceOf => InstructionType::InstanceOp,
            Opcode::CheckCast
            | Opcode::CmplFloat
            | Opcode::CmpgFloat
            | Opcode::CmplDouble
            | Opcode::CmpgDouble
            | Opcode::CmpLong => InstructionType::Comparison,
            Opcode::Throw
            | Opcode::MonitorEnter
            | Opcode::MonitorExit
            | Opcode::MoveException => InstructionType::Exception,
            Opcode::IfEq
            | Opcode::IfNe
            | Opcode::IfLt
            | Opcode::IfGe
            | Opcode::IfGt
            | Opcode::IfLe
            | Opcode::IfEqz
            | Opcode::IfNez
            | Opcode::IfLtz
            | Opcode::IfGez
            | Opcode::IfGtz
            | Opcode::IfLez => InstructionType::Cond,
            Opcode::Goto | Opcode::Goto16 | Opcode::Goto32 => InstructionType::Goto,
            Opcode::PackedSwitch | Opcode::SparseSwitch => InstructionType::SwitchOp,
            Opcode::InvokePolymorphic
            | Opcode::InvokeCustom
            | Opcode::InvokeVirtual
            | Opcode::InvokeSuper
            | Opcode::InvokeDirect
            | Opcode::InvokeStatic
            | Opcode::InvokeInterface
            | Opcode::InvokePolymorphicRange
            | Opcode::InvokeCustomRange
            | Opcode::InvokeVirtualRange
            | Opcode::InvokeSuperRange
            | Opcode::InvokeDirectRange
            | Opcode::InvokeStaticRange
            | Opcode::InvokeInterfaceRange => InstructionType::Invocation,
        }
    }

    /// `invoke-polymorphic` forms carry a trailing prototype index word after the register operands.
    pub fn trailing_units(self) -> usize {
        match self {
            Opcode::InvokePolymorphic | Opcode::InvokePolymorphicRange => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    pub opcode: Option<Opcode>,
    pub instruction_type: InstructionType,
    pub operand_type: OperandType,
}

static OPCODES: Lazy<[OpcodeInfo; 256]> = Lazy::new(|| {
    let mut table = [OpcodeInfo {
        opcode: None,
        instruction_type: InstructionType::Unknown,
        operand_type: OperandType::None,
    }; 256];
    for (byte, info) in table.iter_mut().enumerate() {
        if let Some(opcode) = Opcode::from_byte(byte as u8) {
            *info = OpcodeInfo {
                opcode: Some(opcode),
                instruction_type: opcode.instruction_type(),
                operand_type: opcode.operand_type(),
            };
        }
    }
    table
});

/// Classification of a raw opcode byte.
pub fn opcode_info(byte: u8) -> &'static OpcodeInfo {
    &OPCODES[byte as usize]
}
