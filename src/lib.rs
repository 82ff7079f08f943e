//! Encoder and decoder for CIL method bodies
//!
//! The [`cil`] module turns raw method body bytes into instruction sequences and back again:
//!
//!   - [`cil::RawMethodBody`] strips or attaches the tiny/fat header and trailing extra sections
//!   - [`cil::Disassembler`] decodes instruction bytes into [`cil::Instruction`] values
//!   - [`cil::Assembler`] encodes instructions back to bytes, reporting overflows
//!   - [`cil::reassembler`] patches metadata tokens in place without decoding into instructions
//!   - [`cil::jump_encoding`] switches instructions between their short and long encodings
//!   - [`cil::verify_labels`] checks that branches and exception handlers land on instructions
//!
//! Metadata is out of scope: tokens are resolved and rebuilt through the
//! [`cil::OperandResolver`] and [`cil::OperandBuilder`] traits.

pub mod cil;
mod util;
