//! CIL instruction set and method body codec

mod assembler;
mod binary_format;
mod body;
mod code_builder;
mod diagnostics;
mod disassembler;
mod errors;
mod exception_handler;
mod instruction;
pub mod jump_encoding;
mod label;
mod method_body;
mod opcode;
pub mod opcodes;
mod operands;
pub mod reassembler;
mod token;
mod verifier;

pub use assembler::*;
pub use binary_format::*;
pub use body::*;
pub use code_builder::*;
pub use diagnostics::*;
pub use disassembler::*;
pub use errors::*;
pub use exception_handler::*;
pub use instruction::*;
pub use label::*;
pub use method_body::*;
pub use opcode::*;
pub use operands::*;
pub use token::*;
pub use verifier::*;
