use super::{Instruction, Token};
use crate::util::RefId;
use std::fmt;

/// Target of a branch or switch
///
/// Freshly disassembled code refers to targets by offset. Code that is being built or edited
/// should instead point at the target instruction itself, since its offset only becomes known
/// (and can keep changing) as the code is laid out.
pub enum Label<'a, M = Token, V = u16, P = u16> {
    /// Offset of the target from the start of the code
    Offset(i32),

    /// Target instruction
    Instruction(RefId<'a, Instruction<'a, M, V, P>>),
}

impl<'a, M, V, P> Label<'a, M, V, P> {
    /// Label pointing at an instruction
    pub fn to(instruction: &'a Instruction<'a, M, V, P>) -> Self {
        Label::Instruction(RefId(instruction))
    }

    /// Current offset of the target
    pub fn offset(&self) -> i32 {
        match self {
            Label::Offset(offset) => *offset,
            Label::Instruction(instruction) => instruction.offset(),
        }
    }
}

impl<'a, M, V, P> Clone for Label<'a, M, V, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, M, V, P> Copy for Label<'a, M, V, P> {}

impl<'a, M, V, P> PartialEq for Label<'a, M, V, P> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Label::Offset(o1), Label::Offset(o2)) => o1 == o2,
            (Label::Instruction(i1), Label::Instruction(i2)) => i1 == i2,
            _ => false,
        }
    }
}

impl<'a, M, V, P> Eq for Label<'a, M, V, P> {}

impl<'a, M, V, P> fmt::Debug for Label<'a, M, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04X}", self.offset())
    }
}

impl<'a, M, V, P> fmt::Display for Label<'a, M, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04X}", self.offset())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cil::opcodes::*;

    #[test]
    fn offset_labels_compare_by_value() {
        let l1: Label = Label::Offset(12);
        let l2: Label = Label::Offset(12);
        assert_eq!(l1, l2);
        assert_ne!(l1, Label::Offset(13));
        assert_eq!(format!("{}", l1), "IL_000C");
    }

    #[test]
    fn instruction_labels_compare_by_identity() {
        let ret1: Instruction = Instruction::new(RET);
        let ret2: Instruction = Instruction::new(RET);
        assert_eq!(Label::to(&ret1), Label::to(&ret1));
        assert_ne!(Label::to(&ret1), Label::to(&ret2));

        // Same offset, but still different kinds of label
        assert_ne!(Label::to(&ret1), Label::Offset(0));
    }

    #[test]
    fn instruction_label_follows_target() {
        let ret: Instruction = Instruction::new(RET);
        let label = Label::to(&ret);
        assert_eq!(label.offset(), 0);
        ret.set_offset(7);
        assert_eq!(label.offset(), 7);
    }
}
