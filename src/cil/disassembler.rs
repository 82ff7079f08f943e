use super::{
    Error, Instruction, Label, OpCode, Operand, OperandResolver, OperandType, Resolvable, Token,
    EXTENDED_OPCODE_PREFIX,
};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io;
use std::io::Cursor;

/// Decodes instruction bytes into [`Instruction`]s
///
/// Branch and switch targets are decoded into [`Label::Offset`] labels. Tokens and indices are
/// passed through the resolver, falling back to the raw value when it returns `None`.
pub struct Disassembler<'c, R> {
    reader: Cursor<&'c [u8]>,
    resolver: R,
}

/// Instruction type produced by a disassembler using resolver `R`
pub type ResolvedInstruction<'a, R> = Instruction<
    'a,
    <R as OperandResolver>::Member,
    <R as OperandResolver>::Variable,
    <R as OperandResolver>::Parameter,
>;

impl<'c, R: OperandResolver> Disassembler<'c, R> {
    /// Disassembler over the instruction bytes of one method body
    pub fn new(code: &'c [u8], resolver: R) -> Self {
        Disassembler {
            reader: Cursor::new(code),
            resolver,
        }
    }

    /// Offset of the next instruction
    pub fn position(&self) -> usize {
        self.reader.position() as usize
    }

    pub fn is_finished(&self) -> bool {
        self.position() >= self.reader.get_ref().len()
    }

    /// Decode every remaining instruction
    pub fn read_all<'a>(&mut self) -> Result<Vec<ResolvedInstruction<'a, R>>, Error>
    where
        R::Member: 'a,
        R::Variable: 'a,
        R::Parameter: 'a,
    {
        let mut instructions = vec![];
        while !self.is_finished() {
            instructions.push(self.read_instruction()?);
        }
        Ok(instructions)
    }

    /// Decode the next instruction
    pub fn read_instruction<'a>(&mut self) -> Result<ResolvedInstruction<'a, R>, Error>
    where
        R::Member: 'a,
        R::Variable: 'a,
        R::Parameter: 'a,
    {
        let offset = self.position();
        let opcode = read_opcode(self.reader.get_ref(), offset)?;
        self.reader.set_position((offset + opcode.size()) as u64);

        let operand = self
            .read_operand(opcode.operand_type())
            .map_err(truncated_at(offset))?;
        log::trace!("IL_{:04X}: {}", offset, opcode);

        Ok(Instruction::at(offset as i32, opcode, operand))
    }

    fn read_operand<'a>(
        &mut self,
        operand_type: OperandType,
    ) -> io::Result<Operand<'a, R::Member, R::Variable, R::Parameter>>
    where
        R::Member: 'a,
        R::Variable: 'a,
        R::Parameter: 'a,
    {
        let operand = match operand_type {
            OperandType::InlineNone => Operand::None,
            OperandType::ShortInlineI => Operand::Int8(self.reader.read_i8()?),
            OperandType::InlineI => Operand::Int32(self.reader.read_i32::<LittleEndian>()?),
            OperandType::InlineI8 => Operand::Int64(self.reader.read_i64::<LittleEndian>()?),
            OperandType::ShortInlineR => Operand::Float32(self.reader.read_f32::<LittleEndian>()?),
            OperandType::InlineR => Operand::Float64(self.reader.read_f64::<LittleEndian>()?),

            // Branch deltas are relative to the end of the instruction
            OperandType::ShortInlineBrTarget => {
                let delta = self.reader.read_i8()? as i32;
                Operand::Branch(Label::Offset((self.position() as i32).wrapping_add(delta)))
            }
            OperandType::InlineBrTarget => {
                let delta = self.reader.read_i32::<LittleEndian>()?;
                Operand::Branch(Label::Offset((self.position() as i32).wrapping_add(delta)))
            }
            OperandType::InlineSwitch => {
                let count = self.reader.read_u32::<LittleEndian>()? as usize;
                let remaining = self.reader.get_ref().len() - self.position();
                if count > remaining / 4 {
                    return Err(io::ErrorKind::UnexpectedEof.into());
                }
                let mut deltas = Vec::with_capacity(count);
                for _ in 0..count {
                    deltas.push(self.reader.read_i32::<LittleEndian>()?);
                }
                let table_end = self.position() as i32;
                Operand::Switch(
                    deltas
                        .into_iter()
                        .map(|delta| Label::Offset(table_end.wrapping_add(delta)))
                        .collect(),
                )
            }

            OperandType::ShortInlineVar => {
                let index = self.reader.read_u8()? as u16;
                Operand::Local(self.local(index))
            }
            OperandType::InlineVar => {
                let index = self.reader.read_u16::<LittleEndian>()?;
                Operand::Local(self.local(index))
            }
            OperandType::ShortInlineArgument => {
                let index = self.reader.read_u8()? as u16;
                Operand::Argument(self.parameter(index))
            }
            OperandType::InlineArgument => {
                let index = self.reader.read_u16::<LittleEndian>()?;
                Operand::Argument(self.parameter(index))
            }

            OperandType::InlineString => {
                let token = Token(self.reader.read_u32::<LittleEndian>()?);
                Operand::String(match self.resolver.resolve_string(token) {
                    Some(string) => Resolvable::Resolved(string),
                    None => Resolvable::Raw(token),
                })
            }
            OperandType::InlineField
            | OperandType::InlineMethod
            | OperandType::InlineSig
            | OperandType::InlineTok
            | OperandType::InlineType => {
                let token = Token(self.reader.read_u32::<LittleEndian>()?);
                Operand::Member(match self.resolver.resolve_member(token) {
                    Some(member) => Resolvable::Resolved(member),
                    None => Resolvable::Raw(token),
                })
            }
        };
        Ok(operand)
    }

    fn local(&self, index: u16) -> Resolvable<R::Variable, u16> {
        match self.resolver.resolve_local(index) {
            Some(local) => Resolvable::Resolved(local),
            None => Resolvable::Raw(index),
        }
    }

    fn parameter(&self, index: u16) -> Resolvable<R::Parameter, u16> {
        match self.resolver.resolve_parameter(index) {
            Some(parameter) => Resolvable::Resolved(parameter),
            None => Resolvable::Raw(index),
        }
    }
}

/// Decode all of the instructions in `code`
pub fn disassemble<'a, R: OperandResolver>(
    code: &[u8],
    resolver: R,
) -> Result<Vec<ResolvedInstruction<'a, R>>, Error>
where
    R::Member: 'a,
    R::Variable: 'a,
    R::Parameter: 'a,
{
    Disassembler::new(code, resolver).read_all()
}

/// Decode the opcode starting at `offset`
pub(crate) fn read_opcode(code: &[u8], offset: usize) -> Result<OpCode, Error> {
    let truncated = Error::TruncatedInstruction { offset };
    let first = *code.get(offset).ok_or(truncated)?;
    if first == EXTENDED_OPCODE_PREFIX {
        let second = *code
            .get(offset + 1)
            .ok_or(Error::TruncatedInstruction { offset })?;
        OpCode::from_extended_byte(second).ok_or(Error::InvalidOpcode {
            offset,
            code: u16::from_be_bytes([first, second]),
        })
    } else {
        OpCode::from_byte(first).ok_or(Error::InvalidOpcode {
            offset,
            code: first as u16,
        })
    }
}

/// Reads that run out of bytes mean the instruction at `offset` is cut short
pub(crate) fn truncated_at(offset: usize) -> impl Fn(io::Error) -> Error {
    move |err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::TruncatedInstruction { offset }
        } else {
            Error::IoError(err)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cil::opcodes::*;
    use crate::cil::RawOperands;

    /// Resolves a couple of method tokens to names
    struct Names;

    impl OperandResolver for Names {
        type Member = &'static str;
        type Variable = u16;
        type Parameter = u16;

        fn resolve_member(&self, token: Token) -> Option<&'static str> {
            match token.0 {
                0x0A000001 => Some("Console::WriteLine"),
                _ => None,
            }
        }

        fn resolve_string(&self, token: Token) -> Option<String> {
            match token.0 {
                0x70000001 => Some("Hello".to_owned()),
                _ => None,
            }
        }

        fn resolve_local(&self, _index: u16) -> Option<u16> {
            None
        }

        fn resolve_parameter(&self, _index: u16) -> Option<u16> {
            None
        }
    }

    #[test]
    fn forward_branch() {
        let code = [0x16, 0x2D, 0x01, 0x2A, 0x14, 0x2A];
        let insns = disassemble(&code, RawOperands::new()).unwrap();

        let opcodes: Vec<OpCode> = insns.iter().map(|insn| insn.opcode).collect();
        assert_eq!(opcodes, vec![LDC_I4_0, BRTRUE_S, RET, LDNULL, RET]);
        let offsets: Vec<i32> = insns.iter().map(|insn| insn.offset()).collect();
        assert_eq!(offsets, vec![0, 1, 3, 4, 5]);
        assert_eq!(insns[1].operand, Operand::Branch(Label::Offset(4)));
    }

    #[test]
    fn backward_branch() {
        let code = [0x00, 0x2B, 0xFD];
        let insns = disassemble(&code, RawOperands::new()).unwrap();
        assert_eq!(insns[1].operand, Operand::Branch(Label::Offset(0)));

        let code = [0x00, 0x38, 0xFA, 0xFF, 0xFF, 0xFF];
        let insns = disassemble(&code, RawOperands::new()).unwrap();
        assert_eq!(insns[1].opcode, BR);
        assert_eq!(insns[1].operand, Operand::Branch(Label::Offset(0)));
    }

    #[test]
    fn extended_opcodes() {
        let code = [0xFE, 0x01, 0xFE, 0x0C, 0x05, 0x01, 0x2A];
        let insns = disassemble(&code, RawOperands::new()).unwrap();
        assert_eq!(insns[0].opcode, CEQ);
        assert_eq!(insns[1].opcode, LDLOC);
        assert_eq!(insns[1].operand, Operand::Local(Resolvable::Raw(0x0105)));
        assert_eq!(insns[2].offset(), 6);
    }

    #[test]
    fn switch_targets_relative_to_table_end() {
        let code = [
            0x45, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
            0x2A,
        ];
        let insns = disassemble(&code, RawOperands::new()).unwrap();
        assert_eq!(insns.len(), 3);
        assert_eq!(
            insns[0].operand,
            Operand::Switch(vec![Label::Offset(13), Label::Offset(14)])
        );
        assert_eq!(insns[0].size(), 13);
    }

    #[test]
    fn numeric_operands() {
        let mut code = vec![0x1F, 0x9C, 0x21];
        code.extend_from_slice(&(-5i64).to_le_bytes());
        code.push(0x22);
        code.extend_from_slice(&1.5f32.to_le_bytes());
        code.push(0x23);
        code.extend_from_slice(&(-0.25f64).to_le_bytes());
        let insns = disassemble(&code, RawOperands::new()).unwrap();
        assert_eq!(insns[0].operand, Operand::Int8(-100));
        assert_eq!(insns[1].operand, Operand::Int64(-5));
        assert_eq!(insns[2].operand, Operand::Float32(1.5));
        assert_eq!(insns[3].operand, Operand::Float64(-0.25));
    }

    #[test]
    fn resolution_falls_back_to_raw_tokens() {
        let code = [
            0x72, 0x01, 0x00, 0x00, 0x70, 0x28, 0x01, 0x00, 0x00, 0x0A, 0x28, 0x02, 0x00, 0x00,
            0x0A, 0x72, 0x05, 0x00, 0x00, 0x70, 0x2A,
        ];
        let insns = disassemble(&code, Names).unwrap();
        assert_eq!(
            insns[0].operand,
            Operand::String(Resolvable::Resolved("Hello".to_owned()))
        );
        assert_eq!(
            insns[1].operand,
            Operand::Member(Resolvable::Resolved("Console::WriteLine"))
        );
        assert_eq!(
            insns[2].operand,
            Operand::Member(Resolvable::Raw(Token(0x0A000002)))
        );
        assert_eq!(
            insns[3].operand,
            Operand::String(Resolvable::Raw(Token(0x70000005)))
        );
    }

    #[test]
    fn one_instruction_at_a_time() {
        let code = [0x00, 0x2A];
        let mut disassembler = Disassembler::new(&code, RawOperands::new());
        assert_eq!(disassembler.read_instruction().unwrap().opcode, NOP);
        assert_eq!(disassembler.position(), 1);
        assert!(!disassembler.is_finished());
        assert_eq!(disassembler.read_instruction().unwrap().opcode, RET);
        assert!(disassembler.is_finished());
    }

    #[test]
    fn truncated_instructions() {
        assert!(matches!(
            disassemble(&[0x00, 0x20, 0x01, 0x02], RawOperands::new()),
            Err(Error::TruncatedInstruction { offset: 1 })
        ));
        assert!(matches!(
            disassemble(&[0xFE], RawOperands::new()),
            Err(Error::TruncatedInstruction { offset: 0 })
        ));
        assert!(matches!(
            disassemble(&[0x45, 0xFF, 0xFF, 0xFF, 0xFF], RawOperands::new()),
            Err(Error::TruncatedInstruction { offset: 0 })
        ));
    }

    #[test]
    fn invalid_opcodes() {
        assert!(matches!(
            disassemble(&[0x00, 0x24], RawOperands::new()),
            Err(Error::InvalidOpcode {
                offset: 1,
                code: 0x24
            })
        ));
        assert!(matches!(
            disassemble(&[0xFE, 0xFF], RawOperands::new()),
            Err(Error::InvalidOpcode {
                offset: 0,
                code: 0xFEFF
            })
        ));
    }
}
