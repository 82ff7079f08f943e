use super::{
    calculate_offsets, AssembledCode, Assembler, Error, ErrorListener, Instruction, Label,
    Operand, OperandBuilder, Token,
};
use crate::util::RefId;
use std::collections::HashSet;
use typed_arena::Arena;

/// Storage for instructions that branch to one another
///
/// Instructions allocated here live as long as the arena, so [`Label::Instruction`] can point at
/// them before their final position (or even whether they end up placed) is known.
pub struct InstructionArena<'a, M = Token, V = u16, P = u16> {
    arena: Arena<Instruction<'a, M, V, P>>,
}

impl<'a, M: 'a, V: 'a, P: 'a> InstructionArena<'a, M, V, P> {
    pub fn new() -> Self {
        InstructionArena {
            arena: Arena::new(),
        }
    }

    pub fn alloc(
        &'a self,
        instruction: Instruction<'a, M, V, P>,
    ) -> &'a Instruction<'a, M, V, P> {
        self.arena.alloc(instruction)
    }

    /// Number of instructions allocated so far
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a, M: 'a, V: 'a, P: 'a> Default for InstructionArena<'a, M, V, P> {
    fn default() -> Self {
        InstructionArena::new()
    }
}

/// Builds up a sequence of instructions whose branches refer to other instructions
///
/// Instructions are first allocated, then placed. Allocating without placing is how forward
/// branches are written: allocate the target, branch to it, and place it once the code in between
/// has been pushed.
///
/// ```text,ignore,no_run
///   let end = builder.alloc(Instruction::new(RET));
///   builder.push(Instruction::branch(BRFALSE_S, Label::to(end)));
///   ...
///   builder.place(end);
/// ```
pub struct CodeBuilder<'a, M = Token, V = u16, P = u16> {
    arena: &'a InstructionArena<'a, M, V, P>,

    /// Instructions in the order they'll be encoded
    placed: Vec<&'a Instruction<'a, M, V, P>>,
    placed_set: HashSet<RefId<'a, Instruction<'a, M, V, P>>>,
}

impl<'a, M: 'a, V: 'a, P: 'a> CodeBuilder<'a, M, V, P> {
    pub fn new(arena: &'a InstructionArena<'a, M, V, P>) -> Self {
        CodeBuilder {
            arena,
            placed: vec![],
            placed_set: HashSet::new(),
        }
    }

    /// Allocate an instruction without placing it
    pub fn alloc(&self, instruction: Instruction<'a, M, V, P>) -> &'a Instruction<'a, M, V, P> {
        self.arena.alloc(instruction)
    }

    /// Allocate an instruction and place it right away
    pub fn push(
        &mut self,
        instruction: Instruction<'a, M, V, P>,
    ) -> &'a Instruction<'a, M, V, P> {
        let instruction = self.alloc(instruction);
        self.place(instruction);
        instruction
    }

    /// Place an instruction after the ones placed so far
    ///
    /// Returns `false` (and does nothing) if the instruction was already placed.
    pub fn place(&mut self, instruction: &'a Instruction<'a, M, V, P>) -> bool {
        if !self.placed_set.insert(RefId(instruction)) {
            log::warn!("{} was placed twice", instruction.opcode);
            return false;
        }
        self.placed.push(instruction);
        true
    }

    pub fn instructions(&self) -> &[&'a Instruction<'a, M, V, P>] {
        &self.placed
    }

    /// Lay out the placed instructions, returning the code size
    pub fn layout(&self) -> usize {
        calculate_offsets(self.placed.iter().copied())
    }

    /// Placed instructions whose branch or switch targets were never placed
    pub fn branches_to_unplaced(&self) -> Vec<&'a Instruction<'a, M, V, P>> {
        let is_unplaced = |label: &Label<'a, M, V, P>| match label {
            Label::Instruction(target) => !self.placed_set.contains(target),
            Label::Offset(_) => false,
        };
        self.placed
            .iter()
            .copied()
            .filter(|instruction| match &instruction.operand {
                Operand::Branch(target) => is_unplaced(target),
                Operand::Switch(targets) => targets.iter().any(is_unplaced),
                _ => false,
            })
            .collect()
    }

    /// Encode the placed instructions
    pub fn assemble<B, L>(&self, assembler: &mut Assembler<B, L>) -> Result<AssembledCode, Error>
    where
        B: OperandBuilder<Member = M, Variable = V, Parameter = P>,
        L: ErrorListener,
    {
        for instruction in self.branches_to_unplaced() {
            log::warn!(
                "{} branches to an instruction that was never placed",
                instruction.opcode
            );
        }
        assembler.assemble(&self.placed)
    }
}
