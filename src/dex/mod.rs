#[macro_use]
pub mod error;

pub mod annotations;
pub mod class_data;
pub mod cursor;
pub mod dex_file;
pub mod encoded_values;
pub mod instructions;
pub mod leb;
pub mod opcodes;
pub mod resolver;

pub use cursor::{Cursor, ReadStruct};
pub use dex_file::DexFile;
pub use error::{DexError, ErrorKind};
pub use instructions::Instruction;
pub use opcodes::{InstructionType, Opcode, OperandType};
pub use resolver::ResolvedValue;
