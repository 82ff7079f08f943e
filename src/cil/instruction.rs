use super::opcodes::*;
use super::{Label, OpCode, OperandType, Token};
use std::cell::Cell;
use std::fmt;

/// Operand that may or may not have been resolved into a higher-level value
///
/// Resolution is up to the [`OperandResolver`](super::OperandResolver), and when it can't (or
/// doesn't want to) resolve something, the raw token or index is kept instead.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolvable<T, R> {
    Raw(R),
    Resolved(T),
}

impl<T, R> Resolvable<T, R> {
    pub fn raw(&self) -> Option<&R> {
        match self {
            Resolvable::Raw(raw) => Some(raw),
            Resolvable::Resolved(_) => None,
        }
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            Resolvable::Raw(_) => None,
            Resolvable::Resolved(resolved) => Some(resolved),
        }
    }
}

/// Inline operand of an instruction
///
/// The variant is expected to match the opcode's [`OperandType`]:
///
///   - `ShortInlineI` and `InlineI`/`InlineI8` take `Int8`, `Int32`, and `Int64`
///   - `ShortInlineR`/`InlineR` take `Float32`/`Float64`
///   - branches take `Branch`, `InlineSwitch` takes `Switch`
///   - `*InlineVar` takes `Local`, `*InlineArgument` takes `Argument`
///   - `InlineString` takes `String`, every other token type takes `Member`
///
/// The assembler reports a mismatch instead of guessing at a conversion.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand<'a, M = Token, V = u16, P = u16> {
    None,
    Int8(i8),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Branch(Label<'a, M, V, P>),
    /// Targets are in case order: the first label is taken for a value of `0`
    Switch(Vec<Label<'a, M, V, P>>),
    Local(Resolvable<V, u16>),
    Argument(Resolvable<P, u16>),
    String(Resolvable<String, Token>),
    Member(Resolvable<M, Token>),
}

impl<'a, M, V, P> Operand<'a, M, V, P> {
    /// Short description of the variant, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Operand::None => "no operand",
            Operand::Int8(_) => "int8",
            Operand::Int32(_) => "int32",
            Operand::Int64(_) => "int64",
            Operand::Float32(_) => "float32",
            Operand::Float64(_) => "float64",
            Operand::Branch(_) => "label",
            Operand::Switch(_) => "label list",
            Operand::Local(_) => "local variable",
            Operand::Argument(_) => "parameter",
            Operand::String(_) => "string",
            Operand::Member(_) => "member",
        }
    }

    /// Does the variant match what the operand type expects?
    pub fn fits(&self, operand_type: OperandType) -> bool {
        matches!(
            (operand_type, self),
            (OperandType::InlineNone, Operand::None)
                | (OperandType::ShortInlineI, Operand::Int8(_))
                | (OperandType::InlineI, Operand::Int32(_))
                | (OperandType::InlineI8, Operand::Int64(_))
                | (OperandType::ShortInlineR, Operand::Float32(_))
                | (OperandType::InlineR, Operand::Float64(_))
                | (OperandType::ShortInlineBrTarget, Operand::Branch(_))
                | (OperandType::InlineBrTarget, Operand::Branch(_))
                | (OperandType::InlineSwitch, Operand::Switch(_))
                | (OperandType::ShortInlineVar, Operand::Local(_))
                | (OperandType::InlineVar, Operand::Local(_))
                | (OperandType::ShortInlineArgument, Operand::Argument(_))
                | (OperandType::InlineArgument, Operand::Argument(_))
                | (OperandType::InlineString, Operand::String(_))
                | (OperandType::InlineField, Operand::Member(_))
                | (OperandType::InlineMethod, Operand::Member(_))
                | (OperandType::InlineSig, Operand::Member(_))
                | (OperandType::InlineTok, Operand::Member(_))
                | (OperandType::InlineType, Operand::Member(_))
        )
    }
}

/// What the operand type expects, for diagnostics
pub fn expected_operand(operand_type: OperandType) -> &'static str {
    match operand_type {
        OperandType::InlineNone => "no operand",
        OperandType::ShortInlineI => "int8",
        OperandType::InlineI => "int32",
        OperandType::InlineI8 => "int64",
        OperandType::ShortInlineR => "float32",
        OperandType::InlineR => "float64",
        OperandType::ShortInlineBrTarget | OperandType::InlineBrTarget => "label",
        OperandType::InlineSwitch => "label list",
        OperandType::ShortInlineVar | OperandType::InlineVar => "local variable",
        OperandType::ShortInlineArgument | OperandType::InlineArgument => "parameter",
        OperandType::InlineString => "string",
        OperandType::InlineField
        | OperandType::InlineMethod
        | OperandType::InlineSig
        | OperandType::InlineTok
        | OperandType::InlineType => "member",
    }
}

/// Single CIL instruction
///
/// `M`, `V`, and `P` are the types that member tokens, local variable indices, and parameter
/// indices get resolved into. Left at their defaults, everything stays raw.
///
/// The offset is only meaningful once the code containing the instruction has been laid out (see
/// [`calculate_offsets`]). It is in a `Cell` so that layout can happen while [`Label`]s hold
/// references to instructions.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction<'a, M = Token, V = u16, P = u16> {
    offset: Cell<i32>,
    pub opcode: OpCode,
    pub operand: Operand<'a, M, V, P>,
}

impl<'a, M, V, P> Instruction<'a, M, V, P> {
    /// Instruction without an operand
    pub fn new(opcode: OpCode) -> Self {
        Instruction::with_operand(opcode, Operand::None)
    }

    pub fn with_operand(opcode: OpCode, operand: Operand<'a, M, V, P>) -> Self {
        Instruction::at(0, opcode, operand)
    }

    pub fn at(offset: i32, opcode: OpCode, operand: Operand<'a, M, V, P>) -> Self {
        Instruction {
            offset: Cell::new(offset),
            opcode,
            operand,
        }
    }

    pub fn branch(opcode: OpCode, target: Label<'a, M, V, P>) -> Self {
        Instruction::with_operand(opcode, Operand::Branch(target))
    }

    pub fn switch(targets: Vec<Label<'a, M, V, P>>) -> Self {
        Instruction::with_operand(SWITCH, Operand::Switch(targets))
    }

    /// Push a 32-bit constant using the shortest encoding
    pub fn ldc_i4(value: i32) -> Self {
        match value {
            -1 => Instruction::new(LDC_I4_M1),
            0..=8 => Instruction::new(LDC_I4_SMALL[value as usize]),
            -128..=127 => Instruction::with_operand(LDC_I4_S, Operand::Int8(value as i8)),
            _ => Instruction::with_operand(LDC_I4, Operand::Int32(value)),
        }
    }

    /// Load a local variable by index using the shortest encoding
    pub fn ldloc(index: u16) -> Self {
        Instruction::variable_access([LDLOC_0, LDLOC_1, LDLOC_2, LDLOC_3], LDLOC_S, LDLOC, index)
    }

    /// Store to a local variable by index using the shortest encoding
    pub fn stloc(index: u16) -> Self {
        Instruction::variable_access([STLOC_0, STLOC_1, STLOC_2, STLOC_3], STLOC_S, STLOC, index)
    }

    /// Load an argument by index using the shortest encoding
    pub fn ldarg(index: u16) -> Self {
        Instruction::variable_access([LDARG_0, LDARG_1, LDARG_2, LDARG_3], LDARG_S, LDARG, index)
    }

    fn variable_access(macros: [OpCode; 4], short: OpCode, long: OpCode, index: u16) -> Self {
        let opcode = match index {
            0..=3 => return Instruction::new(macros[index as usize]),
            4..=255 => short,
            _ => long,
        };
        let operand = match opcode.operand_type() {
            OperandType::ShortInlineArgument | OperandType::InlineArgument => {
                Operand::Argument(Resolvable::Raw(index))
            }
            _ => Operand::Local(Resolvable::Raw(index)),
        };
        Instruction::with_operand(opcode, operand)
    }

    /// Constant pushed by any of the `ldc.i4` variants
    pub fn ldc_i4_value(&self) -> Option<i32> {
        if self.opcode == LDC_I4_M1 {
            return Some(-1);
        }
        if let Some(value) = LDC_I4_SMALL.iter().position(|op| *op == self.opcode) {
            return Some(value as i32);
        }
        match &self.operand {
            Operand::Int8(value) if self.opcode == LDC_I4_S => Some(*value as i32),
            Operand::Int32(value) if self.opcode == LDC_I4 => Some(*value),
            _ => None,
        }
    }

    pub fn offset(&self) -> i32 {
        self.offset.get()
    }

    pub fn set_offset(&self, offset: i32) {
        self.offset.set(offset)
    }

    /// Offset of the next instruction
    pub fn end_offset(&self) -> i32 {
        self.offset() + self.size() as i32
    }

    /// Number of bytes the encoded instruction takes up
    pub fn size(&self) -> usize {
        let operand_size = match (self.opcode.operand_type(), &self.operand) {
            (OperandType::InlineSwitch, Operand::Switch(targets)) => 4 * (targets.len() + 1),
            (operand_type, _) => operand_type.size(),
        };
        self.opcode.size() + operand_size
    }

    /// Number of values popped, if it doesn't depend on a signature or the stack depth
    pub fn pop_count(&self) -> Option<usize> {
        self.opcode.stack_pop().count()
    }

    /// Number of values pushed, if it doesn't depend on a signature
    pub fn push_count(&self) -> Option<usize> {
        self.opcode.stack_push().count()
    }
}

const LDC_I4_SMALL: [OpCode; 9] = [
    LDC_I4_0, LDC_I4_1, LDC_I4_2, LDC_I4_3, LDC_I4_4, LDC_I4_5, LDC_I4_6, LDC_I4_7, LDC_I4_8,
];

/// Lay out instructions one after another starting at offset 0
///
/// Returns the total code size.
pub fn calculate_offsets<'i, 'a: 'i, M: 'a, V: 'a, P: 'a>(
    instructions: impl IntoIterator<Item = &'i Instruction<'a, M, V, P>>,
) -> usize {
    let mut offset: usize = 0;
    for instruction in instructions {
        instruction.set_offset(offset as i32);
        offset += instruction.size();
    }
    offset
}

/// Index of the instruction starting at `offset`
///
/// The instructions must already be laid out (see [`calculate_offsets`]).
pub fn index_by_offset<M, V, P>(
    instructions: &[Instruction<'_, M, V, P>],
    offset: i32,
) -> Option<usize> {
    instructions
        .binary_search_by_key(&offset, Instruction::offset)
        .ok()
}

/// Instruction starting at `offset`
pub fn instruction_by_offset<'i, 'a, M, V, P>(
    instructions: &'i [Instruction<'a, M, V, P>],
    offset: i32,
) -> Option<&'i Instruction<'a, M, V, P>> {
    index_by_offset(instructions, offset).map(|idx| &instructions[idx])
}

impl<'a, M: fmt::Debug, V: fmt::Debug, P: fmt::Debug> fmt::Display for Instruction<'a, M, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04X}: {}", self.offset(), self.opcode)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Int8(value) => write!(f, " {}", value),
            Operand::Int32(value) => write!(f, " {}", value),
            Operand::Int64(value) => write!(f, " {}", value),
            Operand::Float32(value) => write!(f, " {}", value),
            Operand::Float64(value) => write!(f, " {}", value),
            Operand::Branch(target) => write!(f, " {}", target),
            Operand::Switch(targets) => {
                f.write_str(" (")?;
                for (i, target) in targets.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", target)?;
                }
                f.write_str(")")
            }
            Operand::Local(Resolvable::Raw(index)) => write!(f, " V_{}", index),
            Operand::Local(Resolvable::Resolved(local)) => write!(f, " {:?}", local),
            Operand::Argument(Resolvable::Raw(index)) => write!(f, " A_{}", index),
            Operand::Argument(Resolvable::Resolved(param)) => write!(f, " {:?}", param),
            Operand::String(Resolvable::Raw(token)) => write!(f, " {}", token),
            Operand::String(Resolvable::Resolved(string)) => write!(f, " {:?}", string),
            Operand::Member(Resolvable::Raw(token)) => write!(f, " {}", token),
            Operand::Member(Resolvable::Resolved(member)) => write!(f, " {:?}", member),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn smallest_ldc_i4() {
        let expected = [
            (-1, LDC_I4_M1),
            (0, LDC_I4_0),
            (1, LDC_I4_1),
            (2, LDC_I4_2),
            (3, LDC_I4_3),
            (4, LDC_I4_4),
            (5, LDC_I4_5),
            (6, LDC_I4_6),
            (7, LDC_I4_7),
            (8, LDC_I4_8),
        ];
        for (value, opcode) in expected {
            let insn: Instruction = Instruction::ldc_i4(value);
            assert_eq!(insn.opcode, opcode);
            assert_eq!(insn.operand, Operand::None);
            assert_eq!(insn.ldc_i4_value(), Some(value));
        }

        let insn: Instruction = Instruction::ldc_i4(-100);
        assert_eq!(insn.opcode, LDC_I4_S);
        assert_eq!(insn.operand, Operand::Int8(-100));
        assert_eq!(insn.size(), 2);

        let insn: Instruction = Instruction::ldc_i4(9);
        assert_eq!(insn.opcode, LDC_I4_S);

        let insn: Instruction = Instruction::ldc_i4(100000);
        assert_eq!(insn.opcode, LDC_I4);
        assert_eq!(insn.operand, Operand::Int32(100000));
        assert_eq!(insn.size(), 5);
        assert_eq!(insn.ldc_i4_value(), Some(100000));
    }

    #[test]
    fn smallest_variable_access() {
        let insn: Instruction = Instruction::ldloc(2);
        assert_eq!(insn.opcode, LDLOC_2);
        let insn: Instruction = Instruction::stloc(200);
        assert_eq!(insn.opcode, STLOC_S);
        assert_eq!(insn.operand, Operand::Local(Resolvable::Raw(200)));
        let insn: Instruction = Instruction::ldarg(256);
        assert_eq!(insn.opcode, LDARG);
        assert_eq!(insn.operand, Operand::Argument(Resolvable::Raw(256)));
        assert_eq!(insn.size(), 4);
    }

    #[test]
    fn sizes() {
        let nop: Instruction = Instruction::new(NOP);
        assert_eq!(nop.size(), 1);

        let ceq: Instruction = Instruction::new(CEQ);
        assert_eq!(ceq.size(), 2);

        let ldc: Instruction = Instruction::with_operand(LDC_I8, Operand::Int64(1));
        assert_eq!(ldc.size(), 9);

        let call: Instruction =
            Instruction::with_operand(CALL, Operand::Member(Resolvable::Raw(Token(0x0A000001))));
        assert_eq!(call.size(), 5);

        let sw: Instruction = Instruction::switch(vec![
            Label::Offset(0),
            Label::Offset(1),
            Label::Offset(2),
        ]);
        assert_eq!(sw.size(), 1 + 4 * 4);
    }

    #[test]
    fn switch_equality_is_order_sensitive() {
        let sw1: Instruction = Instruction::switch(vec![Label::Offset(1), Label::Offset(2)]);
        let sw2: Instruction = Instruction::switch(vec![Label::Offset(1), Label::Offset(2)]);
        let sw3: Instruction = Instruction::switch(vec![Label::Offset(2), Label::Offset(1)]);
        assert_eq!(sw1, sw2);
        assert_ne!(sw1, sw3);
    }

    #[test]
    fn layout() {
        let code: Vec<Instruction> = vec![
            Instruction::ldc_i4(1000),
            Instruction::new(CEQ),
            Instruction::new(RET),
        ];
        assert_eq!(calculate_offsets(&code), 8);
        let offsets: Vec<i32> = code.iter().map(|insn| insn.offset()).collect();
        assert_eq!(offsets, vec![0, 5, 7]);
        assert_eq!(code[2].end_offset(), 8);

        assert_eq!(index_by_offset(&code, 5), Some(1));
        assert_eq!(index_by_offset(&code, 6), None);
        assert_eq!(index_by_offset(&code, 8), None);
        assert_eq!(instruction_by_offset(&code, 7).map(|insn| insn.opcode), Some(RET));
        assert!(instruction_by_offset(&code, -1).is_none());
    }

    #[test]
    fn formatting() {
        let code: Vec<Instruction> = vec![
            Instruction::at(0, BR_S, Operand::Branch(Label::Offset(12))),
            Instruction::at(2, LDSTR, Operand::String(Resolvable::Raw(Token(0x70000001)))),
            Instruction::at(7, LDLOC_S, Operand::Local(Resolvable::Raw(4))),
            Instruction::at(
                9,
                SWITCH,
                Operand::Switch(vec![Label::Offset(0x20), Label::Offset(0x30)]),
            ),
        ];
        let lines: Vec<String> = code.iter().map(|insn| insn.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "IL_0000: br.s IL_000C",
                "IL_0002: ldstr TOKEN<0x70000001>",
                "IL_0007: ldloc.s V_4",
                "IL_0009: switch (IL_0020, IL_0030)",
            ]
        );

        let resolved: Instruction<'_, String> =
            Instruction::with_operand(LDSTR, Operand::String(Resolvable::Resolved("hi".into())));
        assert_eq!(resolved.to_string(), "IL_0000: ldstr \"hi\"");
    }

    #[test]
    fn operand_fits() {
        let int: Operand = Operand::Int32(1);
        assert!(int.fits(OperandType::InlineI));
        assert!(!int.fits(OperandType::ShortInlineI));
        assert!(!int.fits(OperandType::InlineR));
        assert_eq!(expected_operand(OperandType::ShortInlineR), "float32");
        assert_eq!(int.kind(), "int32");
    }
}
