use super::{
    calculate_offsets, expected_operand, Diagnostic, DiagnosticKind, Error, ErrorListener,
    EscalateMismatches, Instruction, Operand, OperandBuilder, OperandType, Resolvable, Serialize,
    Token,
};
use byteorder::{LittleEndian, WriteBytesExt};
use std::borrow::Borrow;
use std::io;
use std::io::Write;

/// Settings for assembling a method body
#[derive(Clone, Debug)]
pub struct AssemblerSettings {
    /// Name of the method body being assembled (only used to make diagnostics readable)
    pub body_name: Option<String>,

    /// Lay out instructions back to back from offset 0 before encoding
    ///
    /// Branch deltas are computed from the offsets of target instructions, so this should only
    /// be turned off if the offsets are already correct.
    pub recalculate_offsets: bool,
}

impl AssemblerSettings {
    pub fn new(body_name: impl Into<String>) -> AssemblerSettings {
        AssemblerSettings {
            body_name: Some(body_name.into()),
            ..AssemblerSettings::default()
        }
    }
}

impl Default for AssemblerSettings {
    fn default() -> AssemblerSettings {
        AssemblerSettings {
            body_name: None,
            recalculate_offsets: true,
        }
    }
}

/// Output of the assembler
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledCode {
    pub code: Vec<u8>,

    /// Problems that the error listener chose not to escalate, in the order they were found
    pub diagnostics: Vec<Diagnostic>,
}

impl AssembledCode {
    /// Was some branch or index truncated? If so, the code needs long forms to be correct.
    pub fn has_overflow(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_overflow)
    }
}

/// Encodes [`Instruction`]s into bytes
///
/// Every instruction is written with exactly [`Instruction::size`] bytes, even when its operand
/// doesn't fit. Those problems are reported to the [`ErrorListener`] (which may abort assembly)
/// and otherwise accumulated as diagnostics:
///
///   - operands of the wrong kind are written as zeroes
///   - branch deltas and local/argument indices that are too large are truncated
///
pub struct Assembler<B, L = EscalateMismatches> {
    builder: B,
    listener: L,
    settings: AssemblerSettings,
}

impl<B: OperandBuilder> Assembler<B> {
    pub fn new(builder: B) -> Self {
        Assembler::with_listener(builder, EscalateMismatches)
    }
}

impl<B: OperandBuilder, L: ErrorListener> Assembler<B, L> {
    pub fn with_listener(builder: B, listener: L) -> Self {
        Assembler {
            builder,
            listener,
            settings: AssemblerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: AssemblerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &AssemblerSettings {
        &self.settings
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn into_builder(self) -> B {
        self.builder
    }

    /// Encode instructions into a fresh buffer
    pub fn assemble<'a, I>(&mut self, instructions: &[I]) -> Result<AssembledCode, Error>
    where
        I: Borrow<Instruction<'a, B::Member, B::Variable, B::Parameter>>,
        B::Member: 'a,
        B::Variable: 'a,
        B::Parameter: 'a,
    {
        let mut code = vec![];
        let diagnostics = self.write_instructions(&mut code, instructions)?;
        Ok(AssembledCode { code, diagnostics })
    }

    /// Encode instructions into `writer`, returning the diagnostics that weren't escalated
    pub fn write_instructions<'a, W, I>(
        &mut self,
        writer: &mut W,
        instructions: &[I],
    ) -> Result<Vec<Diagnostic>, Error>
    where
        W: Write,
        I: Borrow<Instruction<'a, B::Member, B::Variable, B::Parameter>>,
        B::Member: 'a,
        B::Variable: 'a,
        B::Parameter: 'a,
    {
        let instructions: Vec<&Instruction<'a, B::Member, B::Variable, B::Parameter>> =
            instructions.iter().map(Borrow::borrow).collect();
        if self.settings.recalculate_offsets {
            calculate_offsets(instructions.iter().copied());
        }

        let mut writer = CountingWriter {
            inner: writer,
            position: 0,
        };
        let mut diagnostics = vec![];
        for instruction in instructions {
            if instruction.offset() as usize != writer.position {
                log::debug!(
                    "IL_{:04X}: {} is being written at offset {:#X}",
                    instruction.offset(),
                    instruction.opcode,
                    writer.position
                );
            }
            log::trace!("IL_{:04X}: {}", instruction.offset(), instruction.opcode);
            writer.write_all(instruction.opcode.bytes())?;
            self.write_operand(&mut writer, instruction, &mut diagnostics)?;
        }
        Ok(diagnostics)
    }

    fn write_operand<'a, W: Write>(
        &mut self,
        writer: &mut CountingWriter<W>,
        instruction: &Instruction<'a, B::Member, B::Variable, B::Parameter>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(), Error>
    where
        B::Member: 'a,
        B::Variable: 'a,
        B::Parameter: 'a,
    {
        let operand_type = instruction.opcode.operand_type();
        if !instruction.operand.fits(operand_type) {
            let kind = DiagnosticKind::OperandTypeMismatch {
                expected: expected_operand(operand_type),
                found: instruction.operand.kind(),
            };
            self.report(instruction, kind, diagnostics)?;
            writer.write_all(&[0u8; 8][..operand_type.size()])?;
            return Ok(());
        }

        match &instruction.operand {
            Operand::None => (),
            Operand::Int8(value) => writer.write_i8(*value)?,
            Operand::Int32(value) => writer.write_i32::<LittleEndian>(*value)?,
            Operand::Int64(value) => writer.write_i64::<LittleEndian>(*value)?,
            Operand::Float32(value) => writer.write_f32::<LittleEndian>(*value)?,
            Operand::Float64(value) => writer.write_f64::<LittleEndian>(*value)?,

            Operand::Branch(target) => {
                let short = operand_type == OperandType::ShortInlineBrTarget;
                let branch_end = writer.position + if short { 1 } else { 4 };
                let delta = target.offset() as i64 - branch_end as i64;
                let fits = if short {
                    i8::try_from(delta).is_ok()
                } else {
                    i32::try_from(delta).is_ok()
                };
                if !fits {
                    self.report(
                        instruction,
                        DiagnosticKind::BranchOverflow { delta },
                        diagnostics,
                    )?;
                }
                if short {
                    writer.write_i8(delta as i8)?;
                } else {
                    writer.write_i32::<LittleEndian>(delta as i32)?;
                }
            }

            // Case order matters: deltas go out in the same order as the labels
            Operand::Switch(targets) => {
                writer.write_u32::<LittleEndian>(targets.len() as u32)?;
                let table_end = writer.position + 4 * targets.len();
                for target in targets {
                    let delta = target.offset() as i64 - table_end as i64;
                    if i32::try_from(delta).is_err() {
                        self.report(
                            instruction,
                            DiagnosticKind::BranchOverflow { delta },
                            diagnostics,
                        )?;
                    }
                    writer.write_i32::<LittleEndian>(delta as i32)?;
                }
            }

            Operand::Local(local) => {
                let index = match local {
                    Resolvable::Raw(index) => *index,
                    Resolvable::Resolved(local) => self.builder.local_index(local),
                };
                let short = operand_type == OperandType::ShortInlineVar;
                self.write_index(writer, instruction, short, index, diagnostics)?;
            }
            Operand::Argument(parameter) => {
                let index = match parameter {
                    Resolvable::Raw(index) => *index,
                    Resolvable::Resolved(parameter) => self.builder.parameter_index(parameter),
                };
                let short = operand_type == OperandType::ShortInlineArgument;
                self.write_index(writer, instruction, short, index, diagnostics)?;
            }

            Operand::String(string) => {
                let token: Token = match string {
                    Resolvable::Raw(token) => *token,
                    Resolvable::Resolved(string) => self.builder.string_token(string),
                };
                token.serialize(writer)?;
            }
            Operand::Member(member) => {
                let token: Token = match member {
                    Resolvable::Raw(token) => *token,
                    Resolvable::Resolved(member) => self.builder.member_token(member),
                };
                token.serialize(writer)?;
            }
        }
        Ok(())
    }

    fn write_index<'a, W: Write>(
        &mut self,
        writer: &mut CountingWriter<W>,
        instruction: &Instruction<'a, B::Member, B::Variable, B::Parameter>,
        short: bool,
        index: u16,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(), Error>
    where
        B::Member: 'a,
        B::Variable: 'a,
        B::Parameter: 'a,
    {
        if short {
            if index > u8::MAX as u16 {
                self.report(
                    instruction,
                    DiagnosticKind::IndexOverflow { index },
                    diagnostics,
                )?;
            }
            writer.write_u8(index as u8)?;
        } else {
            writer.write_u16::<LittleEndian>(index)?;
        }
        Ok(())
    }

    fn report<'a>(
        &mut self,
        instruction: &Instruction<'a, B::Member, B::Variable, B::Parameter>,
        kind: DiagnosticKind,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(), Error>
    where
        B::Member: 'a,
        B::Variable: 'a,
        B::Parameter: 'a,
    {
        let diagnostic = Diagnostic {
            body_name: self.settings.body_name.clone(),
            offset: instruction.offset(),
            opcode: Some(instruction.opcode),
            kind,
        };
        log::warn!("{}", diagnostic);
        self.listener.report(&diagnostic)?;
        diagnostics.push(diagnostic);
        Ok(())
    }
}

/// Writer that tracks how many bytes have gone through it
struct CountingWriter<'w, W> {
    inner: &'w mut W,
    position: usize,
}

impl<'w, W: Write> Write for CountingWriter<'w, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.position += written;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cil::opcodes::*;
    use crate::cil::{disassemble, CollectAll, EscalateAll, Label, RawOperands};

    fn assemble(instructions: &[&Instruction]) -> AssembledCode {
        Assembler::new(RawOperands::new())
            .assemble(instructions)
            .unwrap()
    }

    #[test]
    fn short_branch_delta() {
        let br: Instruction = Instruction::branch(BR_S, Label::Offset(12));
        assert_eq!(assemble(&[&br]).code, vec![0x2B, 10]);
    }

    #[test]
    fn branches_to_instructions() {
        let ret: Instruction = Instruction::new(RET);
        let nop: Instruction = Instruction::new(NOP);
        let br = Instruction::branch(BR_S, Label::to(&ret));
        let back = Instruction::branch(BR, Label::to(&nop));
        let assembled = assemble(&[&nop, &br, &back, &ret]);
        assert_eq!(
            assembled.code,
            vec![0x00, 0x2B, 0x05, 0x38, 0xF8, 0xFF, 0xFF, 0xFF, 0x2A]
        );
        assert!(assembled.diagnostics.is_empty());
        assert_eq!(ret.offset(), 8);
    }

    #[test]
    fn switch_keeps_case_order() {
        let a: Instruction = Instruction::new(NOP);
        let b: Instruction = Instruction::new(NOP);
        let c: Instruction = Instruction::new(RET);

        let sw = Instruction::switch(vec![Label::to(&a), Label::to(&b), Label::to(&c)]);
        let code = assemble(&[&sw, &a, &b, &c]).code;
        assert_eq!(&code[..5], &[0x45, 3, 0, 0, 0]);
        assert_eq!(&code[5..17], &[0, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0]);

        let sw = Instruction::switch(vec![Label::to(&c), Label::to(&a), Label::to(&b)]);
        let code = assemble(&[&sw, &a, &b, &c]).code;
        assert_eq!(&code[5..17], &[2, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn short_index_overflow_is_reported_not_fatal() {
        let ldloc: Instruction =
            Instruction::with_operand(LDLOC_S, Operand::Local(Resolvable::Raw(300)));
        let assembled = assemble(&[&ldloc]);
        assert_eq!(assembled.code, vec![0x11, 0x2C]);
        assert!(assembled.has_overflow());
        assert_eq!(
            assembled.diagnostics[0].kind,
            DiagnosticKind::IndexOverflow { index: 300 }
        );
    }

    #[test]
    fn short_branch_overflow_is_truncated() {
        let br: Instruction = Instruction::branch(BR_S, Label::Offset(300));
        let assembled = assemble(&[&br]);
        assert_eq!(assembled.code, vec![0x2B, 0x2A]);
        assert_eq!(
            assembled.diagnostics[0].kind,
            DiagnosticKind::BranchOverflow { delta: 298 }
        );
    }

    #[test]
    fn strict_listener_rejects_overflow() {
        let br: Instruction = Instruction::branch(BR_S, Label::Offset(300));
        let result = Assembler::with_listener(RawOperands::new(), EscalateAll)
            .with_settings(AssemblerSettings::new("Program::Main"))
            .assemble(&[&br]);
        match result {
            Err(Error::Diagnostic(diagnostic)) => {
                assert_eq!(diagnostic.body_name.as_deref(), Some("Program::Main"));
                assert_eq!(diagnostic.opcode, Some(BR_S));
            }
            other => panic!("expected an overflow error, got {:?}", other),
        }
    }

    #[test]
    fn operand_mismatch() {
        let ldc: Instruction = Instruction::with_operand(LDC_I4, Operand::Float32(1.0));
        let ret: Instruction = Instruction::new(RET);

        let result = Assembler::new(RawOperands::new()).assemble(&[&ldc, &ret]);
        assert!(matches!(result, Err(Error::Diagnostic(_))));

        let assembled = Assembler::with_listener(RawOperands::new(), CollectAll)
            .assemble(&[&ldc, &ret])
            .unwrap();
        assert_eq!(assembled.code, vec![0x20, 0, 0, 0, 0, 0x2A]);
        assert_eq!(
            assembled.diagnostics[0].kind,
            DiagnosticKind::OperandTypeMismatch {
                expected: "int32",
                found: "float32"
            }
        );
        assert!(!assembled.has_overflow());
    }

    #[test]
    fn mismatched_switch_keeps_declared_size() {
        let sw: Instruction = Instruction::with_operand(SWITCH, Operand::Int32(3));
        let assembled = Assembler::with_listener(RawOperands::new(), CollectAll)
            .assemble(&[&sw])
            .unwrap();
        assert_eq!(assembled.code.len(), sw.size());
        assert_eq!(assembled.code, vec![0x45, 0, 0, 0, 0]);
    }

    #[test]
    fn resolved_operands_go_through_builder() {
        let ldstr: Instruction = Instruction::with_operand(
            LDSTR,
            Operand::String(Resolvable::Resolved("hello".to_owned())),
        );
        let mut assembler = Assembler::new(RawOperands::new());
        let code = assembler.assemble(&[&ldstr]).unwrap().code;
        assert_eq!(code, vec![0x72, 0x01, 0x00, 0x00, 0x70]);
        assert_eq!(
            assembler.into_builder().user_strings().next(),
            Some((Token(0x70000001), "hello"))
        );
    }

    #[test]
    fn owned_instructions_round_trip() {
        let code = vec![
            0x02, 0x7B, 0x01, 0x00, 0x00, 0x04, 0x0A, 0x06, 0x2C, 0x07, 0x06, 0x6F, 0x02, 0x00,
            0x00, 0x0A, 0x2A, 0xFE, 0x0E, 0x01, 0x01, 0x2A,
        ];
        let instructions = disassemble(&code, RawOperands::new()).unwrap();
        let assembled = Assembler::new(RawOperands::new())
            .assemble(&instructions)
            .unwrap();
        assert_eq!(assembled.code, code);
    }
}
