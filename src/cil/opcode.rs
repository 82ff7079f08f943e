use super::opcodes;
use std::fmt;

/// First byte of every two-byte opcode
pub const EXTENDED_OPCODE_PREFIX: u8 = 0xFE;

/// Shape of the inline operand that follows an opcode
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OperandType {
    InlineNone,
    ShortInlineI,
    InlineI,
    InlineI8,
    ShortInlineR,
    InlineR,
    ShortInlineBrTarget,
    InlineBrTarget,
    InlineSwitch,
    ShortInlineVar,
    InlineVar,
    ShortInlineArgument,
    InlineArgument,
    InlineString,
    InlineField,
    InlineMethod,
    InlineSig,
    InlineTok,
    InlineType,
}

impl OperandType {
    /// Encoded width of the operand in bytes
    ///
    /// For `InlineSwitch` this is only the width of the target count: the full operand is
    /// `4 * (count + 1)` bytes.
    pub const fn size(self) -> usize {
        match self {
            OperandType::InlineNone => 0,
            OperandType::ShortInlineI
            | OperandType::ShortInlineBrTarget
            | OperandType::ShortInlineVar
            | OperandType::ShortInlineArgument => 1,
            OperandType::InlineVar | OperandType::InlineArgument => 2,
            OperandType::InlineI
            | OperandType::ShortInlineR
            | OperandType::InlineBrTarget
            | OperandType::InlineSwitch
            | OperandType::InlineString
            | OperandType::InlineField
            | OperandType::InlineMethod
            | OperandType::InlineSig
            | OperandType::InlineTok
            | OperandType::InlineType => 4,
            OperandType::InlineI8 | OperandType::InlineR => 8,
        }
    }

    /// Whether the operand is a metadata token (user strings included)
    pub const fn is_token(self) -> bool {
        matches!(
            self,
            OperandType::InlineString
                | OperandType::InlineField
                | OperandType::InlineMethod
                | OperandType::InlineSig
                | OperandType::InlineTok
                | OperandType::InlineType
        )
    }

    pub const fn is_branch(self) -> bool {
        matches!(
            self,
            OperandType::ShortInlineBrTarget | OperandType::InlineBrTarget
        )
    }
}

/// How many values an opcode pops from or pushes onto the evaluation stack, and what they are
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StackBehaviour {
    Pop0,
    Pop1,
    Pop1Pop1,
    PopI,
    PopIPop1,
    PopIPopI,
    PopIPopI8,
    PopIPopIPopI,
    PopIPopR4,
    PopIPopR8,
    PopRef,
    PopRefPop1,
    PopRefPopI,
    PopRefPopIPopI,
    PopRefPopIPopI8,
    PopRefPopIPopR4,
    PopRefPopIPopR8,
    PopRefPopIPopRef,
    PopRefPopIPop1,
    PopAll,
    Push0,
    Push1,
    Push1Push1,
    PushI,
    PushI8,
    PushR4,
    PushR8,
    PushRef,
    VarPop,
    VarPush,
}

impl StackBehaviour {
    /// Number of stack slots popped or pushed, if that is fixed
    ///
    /// `VarPop`, `VarPush` and `PopAll` depend on the call signature or the current stack depth.
    pub const fn count(self) -> Option<usize> {
        use StackBehaviour::*;
        match self {
            Pop0 | Push0 => Some(0),
            Pop1 | PopI | PopRef | Push1 | PushI | PushI8 | PushR4 | PushR8 | PushRef => Some(1),
            Pop1Pop1 | PopIPop1 | PopIPopI | PopIPopI8 | PopIPopR4 | PopIPopR8 | PopRefPop1
            | PopRefPopI | Push1Push1 => Some(2),
            PopIPopIPopI | PopRefPopIPopI | PopRefPopIPopI8 | PopRefPopIPopR4
            | PopRefPopIPopR8 | PopRefPopIPopRef | PopRefPopIPop1 => Some(3),
            PopAll | VarPop | VarPush => None,
        }
    }
}

/// How an opcode affects control flow
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FlowControl {
    Branch,
    Break,
    Call,
    CondBranch,
    /// Prefix that modifies the following instruction
    Meta,
    Next,
    Return,
    Throw,
}

/// Broad classification of an opcode
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpCodeType {
    /// Shorter encoding of some other primitive instruction
    Macro,
    /// Encodings set aside for use by the runtime, never found in method bodies
    Internal,
    ObjectModel,
    Prefix,
    Primitive,
    /// Encodings set aside for future versions of the instruction set
    Reserved,
}

/// Description of one instruction of the CIL instruction set
///
/// The code is stored as it is encoded: single-byte opcodes are `0x00XX` and extended opcodes
/// are `0xFEXX`. All the known opcodes are constants in [`opcodes`].
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct OpCode {
    code: u16,
    mnemonic: &'static str,
    operand_type: OperandType,
    stack_pop: StackBehaviour,
    stack_push: StackBehaviour,
    flow_control: FlowControl,
    opcode_type: OpCodeType,
}

impl OpCode {
    pub(crate) const fn new(
        code: u16,
        mnemonic: &'static str,
        operand_type: OperandType,
        stack_pop: StackBehaviour,
        stack_push: StackBehaviour,
        flow_control: FlowControl,
        opcode_type: OpCodeType,
    ) -> OpCode {
        OpCode {
            code,
            mnemonic,
            operand_type,
            stack_pop,
            stack_push,
            flow_control,
            opcode_type,
        }
    }

    pub const fn code(&self) -> u16 {
        self.code
    }

    pub const fn mnemonic(&self) -> &'static str {
        self.mnemonic
    }

    pub const fn operand_type(&self) -> OperandType {
        self.operand_type
    }

    pub const fn stack_pop(&self) -> StackBehaviour {
        self.stack_pop
    }

    pub const fn stack_push(&self) -> StackBehaviour {
        self.stack_push
    }

    pub const fn flow_control(&self) -> FlowControl {
        self.flow_control
    }

    pub const fn opcode_type(&self) -> OpCodeType {
        self.opcode_type
    }

    /// Is this a two-byte opcode (starting with [`EXTENDED_OPCODE_PREFIX`])?
    pub const fn is_extended(&self) -> bool {
        (self.code >> 8) as u8 == EXTENDED_OPCODE_PREFIX
    }

    /// Number of bytes the opcode itself takes up (not counting the operand)
    pub const fn size(&self) -> usize {
        if self.is_extended() {
            2
        } else {
            1
        }
    }

    /// Byte that indexes the lookup table (the only byte for single-byte opcodes, the byte after
    /// the prefix for extended ones)
    pub const fn table_byte(&self) -> u8 {
        self.code as u8
    }

    /// Bytes as they appear in the instruction stream
    pub fn bytes(&self) -> &'static [u8] {
        let table_byte = self.table_byte() as usize;
        if self.is_extended() {
            &EXTENDED_BYTES[table_byte]
        } else {
            &SINGLE_BYTES[table_byte..table_byte + 1]
        }
    }

    /// Look up a single-byte opcode
    ///
    /// Returns `None` for unassigned bytes and for [`EXTENDED_OPCODE_PREFIX`].
    pub fn from_byte(byte: u8) -> Option<OpCode> {
        opcodes::SINGLE_BYTE_TABLE[byte as usize]
    }

    /// Look up a two-byte opcode from the byte that follows [`EXTENDED_OPCODE_PREFIX`]
    pub fn from_extended_byte(byte: u8) -> Option<OpCode> {
        opcodes::EXTENDED_TABLE[byte as usize]
    }

    /// Look up an opcode from its full code (`0x00XX` or `0xFEXX`)
    pub fn from_code(code: u16) -> Option<OpCode> {
        match (code >> 8) as u8 {
            0 => OpCode::from_byte(code as u8),
            EXTENDED_OPCODE_PREFIX => OpCode::from_extended_byte(code as u8),
            _ => None,
        }
    }

    /// Look up an opcode by mnemonic (eg. `ldc.i4.s`)
    pub fn from_mnemonic(mnemonic: &str) -> Option<OpCode> {
        opcodes::ALL
            .iter()
            .find(|opcode| opcode.mnemonic == mnemonic)
            .copied()
    }

    /// Equivalent opcode with a 4-byte branch offset or 2-byte index, if this is a short form
    pub fn long_form(&self) -> Option<OpCode> {
        SHORT_LONG_PAIRS
            .iter()
            .find(|(short, _)| short == self)
            .map(|(_, long)| *long)
    }

    /// Equivalent opcode with a 1-byte branch offset or index, if this is a long form
    pub fn short_form(&self) -> Option<OpCode> {
        SHORT_LONG_PAIRS
            .iter()
            .find(|(_, long)| long == self)
            .map(|(short, _)| *short)
    }
}

impl fmt::Debug for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.mnemonic)
    }
}

static SINGLE_BYTES: [u8; 256] = {
    let mut bytes = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        bytes[i] = i as u8;
        i += 1;
    }
    bytes
};

static EXTENDED_BYTES: [[u8; 2]; 256] = {
    let mut bytes = [[EXTENDED_OPCODE_PREFIX, 0]; 256];
    let mut i = 0;
    while i < 256 {
        bytes[i][1] = i as u8;
        i += 1;
    }
    bytes
};

static SHORT_LONG_PAIRS: [(OpCode, OpCode); 20] = [
    (opcodes::BR_S, opcodes::BR),
    (opcodes::BRFALSE_S, opcodes::BRFALSE),
    (opcodes::BRTRUE_S, opcodes::BRTRUE),
    (opcodes::BEQ_S, opcodes::BEQ),
    (opcodes::BGE_S, opcodes::BGE),
    (opcodes::BGT_S, opcodes::BGT),
    (opcodes::BLE_S, opcodes::BLE),
    (opcodes::BLT_S, opcodes::BLT),
    (opcodes::BNE_UN_S, opcodes::BNE_UN),
    (opcodes::BGE_UN_S, opcodes::BGE_UN),
    (opcodes::BGT_UN_S, opcodes::BGT_UN),
    (opcodes::BLE_UN_S, opcodes::BLE_UN),
    (opcodes::BLT_UN_S, opcodes::BLT_UN),
    (opcodes::LEAVE_S, opcodes::LEAVE),
    (opcodes::LDARG_S, opcodes::LDARG),
    (opcodes::LDARGA_S, opcodes::LDARGA),
    (opcodes::STARG_S, opcodes::STARG),
    (opcodes::LDLOC_S, opcodes::LDLOC),
    (opcodes::LDLOCA_S, opcodes::LDLOCA),
    (opcodes::STLOC_S, opcodes::STLOC),
];
