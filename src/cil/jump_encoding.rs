//! Switch instructions between their short and long encodings
//!
//! Many instructions come in several sizes. Short branches (`br.s`, `beq.s`, `leave.s`, ...)
//! encode a signed 8-bit delta where their long forms have 32 bits, the short local and argument
//! instructions (`ldloc.s`, `starg.s`, ...) an unsigned 8-bit index, and the macro forms
//! (`ldc.i4.2`, `ldloc.0`, ...) bake their operand into the opcode. Three passes pick between
//! them:
//!
//!   - [`expand_oversized_short_forms`] widens the short forms whose operands no longer fit
//!   - [`optimize_macros`] switches everything to the smallest encoding that fits
//!   - [`expand_macros`] switches everything to the long encoding with an explicit operand
//!
//! ### Termination
//!
//! Widening an instruction shifts everything after it, so branches crossing it get longer and
//! may need widening in turn. We just repeat until nothing changes. This finishes since a
//! round either widens at least one short form (and long forms never shrink back) or is the last.
//!
//! Shrinking is the mirror image: it only ever brings instructions closer together, so a branch
//! that was made short stays in range. [`optimize_macros`] shrinks until nothing changes and then
//! widens, so there is no back and forth between the two.
//!
//! ### Labels
//!
//! Offset labels refer to the layout the instructions had _before_ the pass. They are remapped
//! to the new layout, following the instruction that started at the old offset:
//!
//! ```text,ignore,no_run
//!   IL_0000: br.s IL_0090          IL_0000: br IL_0093
//!   IL_0002: ...          =>       IL_0005: ...
//!   IL_0090: ret                   IL_0093: ret
//! ```
//!
//! An offset inside an instruction keeps its distance from the start of that instruction, and the
//! end of the code maps to the new end of the code. Labels pointing at instructions are left as
//! they are: they already track offsets by themselves. Anything else holding offsets into the
//! code (exception handlers, for instance) can be moved along using the returned [`OffsetMap`].

use super::opcodes::*;
use super::{calculate_offsets, Instruction, Label, OpCode, Operand, OperandType, Resolvable};
use std::ops::RangeInclusive;

/// Range of deltas a short branch can encode
pub const SHORT_BRANCH_RANGE: RangeInclusive<i64> =
    RangeInclusive::new(i8::MIN as i64, i8::MAX as i64);

/// Where offsets of one layout of some instructions ended up in another layout
///
/// Both layouts have the same instructions in the same order, only their sizes differ.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OffsetMap {
    /// Start of every instruction in the old layout, followed by the end of the code
    original_starts: Vec<i32>,

    /// Same, in the new layout
    starts: Vec<i32>,
}

impl OffsetMap {
    pub(crate) fn new(original_starts: Vec<i32>, starts: Vec<i32>) -> OffsetMap {
        debug_assert_eq!(original_starts.len(), starts.len());
        OffsetMap {
            original_starts,
            starts,
        }
    }

    /// Does every offset stay where it was?
    pub fn is_identity(&self) -> bool {
        self.original_starts == self.starts
    }

    /// Change in code size
    pub fn growth(&self) -> i32 {
        match (self.original_starts.last(), self.starts.last()) {
            (Some(original_end), Some(end)) => end - original_end,
            _ => 0,
        }
    }

    /// Move an offset from the old layout to the new one
    ///
    /// Offsets before the code are unchanged, and offsets after its end are shifted by however
    /// much the code grew.
    pub fn translate(&self, offset: i32) -> i32 {
        let starts = &self.original_starts;
        let (Some(first), Some(last)) = (starts.first(), starts.last()) else {
            return offset;
        };
        if offset < *first {
            return offset;
        }
        if offset > *last {
            return offset + self.growth();
        }
        let idx = match starts.binary_search(&offset) {
            // Zero-width instructions don't exist, so there is at most one match
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        self.starts[idx] + (offset - starts[idx])
    }

    /// Move a label from the old layout to the new one
    pub fn translate_label<'a, M, V, P>(&self, label: Label<'a, M, V, P>) -> Label<'a, M, V, P> {
        match label {
            Label::Offset(offset) => Label::Offset(self.translate(offset)),
            label => label,
        }
    }

    /// Move a range given by its start and length, returning the new start and length
    ///
    /// Returns `None` if the range doesn't fit in the offset type or ends up reversed.
    pub fn translate_range(&self, start: u32, length: u32) -> Option<(u32, u32)> {
        let end = i32::try_from(start.checked_add(length)?).ok()?;
        let start = i32::try_from(start).ok()?;
        let new_start = self.translate(start);
        let new_end = self.translate(end);
        Some((
            u32::try_from(new_start).ok()?,
            u32::try_from(new_end.checked_sub(new_start)?).ok()?,
        ))
    }

    /// Apply `next` after this map
    pub fn then(self, next: OffsetMap) -> OffsetMap {
        OffsetMap::new(self.original_starts, next.starts)
    }

    /// Offset of a label's target in the new layout, with offset labels read in the old layout
    fn target<M, V, P>(&self, label: &Label<'_, M, V, P>) -> i32 {
        match label {
            Label::Offset(offset) => self.translate(*offset),
            Label::Instruction(instruction) => instruction.offset(),
        }
    }
}

/// Outcome of a pass over some instructions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reencoded {
    /// Number of instructions whose opcode changed
    pub changed: usize,

    /// Where offsets from before the pass ended up
    pub offsets: OffsetMap,
}

/// Replace short forms whose operands overflow with their long forms
///
/// The instructions are laid out back to back from offset 0 both before and after. Indices of
/// resolved locals and arguments are unknown here, so those are never widened.
pub fn expand_oversized_short_forms<'a, M: 'a, V: 'a, P: 'a>(
    instructions: &mut [Instruction<'a, M, V, P>],
) -> Reencoded {
    let before = opcodes_of(instructions);
    let offsets = rewrite_until_stable(instructions, widen);
    Reencoded {
        changed: count_changed(&before, instructions),
        offsets,
    }
}

/// Use the smallest encoding of every branch, `ldc.i4` constant, and local or argument access
///
/// Long branches become short when their target is close enough (and short ones that don't reach
/// become long), constants and indices move into macro opcodes when there is one, and the rest
/// use short forms when their operand fits. Resolved locals and arguments are left alone.
pub fn optimize_macros<'a, M: 'a, V: 'a, P: 'a>(
    instructions: &mut [Instruction<'a, M, V, P>],
) -> Reencoded {
    let before = opcodes_of(instructions);
    let shrunk = rewrite_until_stable(instructions, shrink);
    let widened = rewrite_until_stable(instructions, widen);
    Reencoded {
        changed: count_changed(&before, instructions),
        offsets: shrunk.then(widened),
    }
}

/// Use the long encoding of everything that has one, with the operand spelled out
///
/// This undoes [`optimize_macros`]: `ldc.i4.2` becomes `ldc.i4 2`, `ldloc.0` becomes
/// `ldloc V_0`, and `br.s` becomes `br`.
pub fn expand_macros<'a, M: 'a, V: 'a, P: 'a>(
    instructions: &mut [Instruction<'a, M, V, P>],
) -> Reencoded {
    let before = opcodes_of(instructions);
    let offsets = rewrite_until_stable(instructions, |instruction, _, _| expand(instruction));
    Reencoded {
        changed: count_changed(&before, instructions),
        offsets,
    }
}

/// Run `rewrite` over every instruction until a round goes by without changes, then remap offset
/// labels to the final layout
///
/// `rewrite` gets the index of the instruction and the map from the layout before the first
/// round to the layout at the start of the current one.
fn rewrite_until_stable<'a, M: 'a, V: 'a, P: 'a, F>(
    instructions: &mut [Instruction<'a, M, V, P>],
    mut rewrite: F,
) -> OffsetMap
where
    F: FnMut(&mut Instruction<'a, M, V, P>, usize, &OffsetMap) -> bool,
{
    let original_starts = layout(instructions);
    loop {
        let current = OffsetMap::new(original_starts.clone(), layout(instructions));
        let mut changed = false;
        for (idx, instruction) in instructions.iter_mut().enumerate() {
            changed |= rewrite(instruction, idx, &current);
        }
        if !changed {
            break;
        }
    }

    let offsets = OffsetMap::new(original_starts, layout(instructions));
    if !offsets.is_identity() {
        for instruction in instructions.iter_mut() {
            match &mut instruction.operand {
                Operand::Branch(target) => *target = offsets.translate_label(*target),
                Operand::Switch(targets) => {
                    for target in targets.iter_mut() {
                        *target = offsets.translate_label(*target);
                    }
                }
                _ => (),
            }
        }
    }
    offsets
}

/// Lay out the instructions, returning the start of each and the end of the code
fn layout<'a, M: 'a, V: 'a, P: 'a>(instructions: &[Instruction<'a, M, V, P>]) -> Vec<i32> {
    let end = calculate_offsets(instructions.iter());
    instructions
        .iter()
        .map(Instruction::offset)
        .chain(std::iter::once(end as i32))
        .collect()
}

fn opcodes_of<M, V, P>(instructions: &[Instruction<'_, M, V, P>]) -> Vec<OpCode> {
    instructions.iter().map(|instruction| instruction.opcode).collect()
}

fn count_changed<M, V, P>(before: &[OpCode], instructions: &[Instruction<'_, M, V, P>]) -> usize {
    before
        .iter()
        .zip(instructions)
        .filter(|(opcode, instruction)| **opcode != instruction.opcode)
        .count()
}

fn widen<M, V, P>(
    instruction: &mut Instruction<'_, M, V, P>,
    idx: usize,
    layout: &OffsetMap,
) -> bool {
    let Some(long_form) = instruction.opcode.long_form() else {
        return false;
    };
    let overflows = match (instruction.opcode.operand_type(), &instruction.operand) {
        (OperandType::ShortInlineBrTarget, Operand::Branch(target)) => {
            let delta = layout.target(target) as i64 - layout.starts[idx + 1] as i64;
            !SHORT_BRANCH_RANGE.contains(&delta)
        }
        (_, operand) => raw_index(operand).map_or(false, |index| index > u8::MAX as u16),
    };
    if !overflows {
        return false;
    }
    log::debug!(
        "IL_{:04X}: widening {} to {}",
        layout.starts[idx],
        instruction.opcode,
        long_form
    );
    instruction.opcode = long_form;
    true
}

fn shrink<M, V, P>(
    instruction: &mut Instruction<'_, M, V, P>,
    idx: usize,
    layout: &OffsetMap,
) -> bool {
    let opcode = instruction.opcode;
    match (opcode.operand_type(), &instruction.operand) {
        (OperandType::InlineBrTarget, Operand::Branch(target)) => {
            let Some(short_form) = opcode.short_form() else {
                return false;
            };
            let start = layout.starts[idx];
            let target = layout.target(target);

            // Targets past the branch move back along with the end of the branch
            let end = if target > start {
                layout.starts[idx + 1]
            } else {
                start + (short_form.size() + short_form.operand_type().size()) as i32
            };
            if !SHORT_BRANCH_RANGE.contains(&(target as i64 - end as i64)) {
                return false;
            }
            instruction.opcode = short_form;
            true
        }
        (_, operand) => {
            if let Some(index) = raw_index(operand) {
                return shrink_variable_access(instruction, index);
            }
            match instruction.ldc_i4_value() {
                Some(value) => {
                    let shortest: Instruction<M, V, P> = Instruction::ldc_i4(value);
                    if shortest.opcode == opcode {
                        return false;
                    }
                    instruction.opcode = shortest.opcode;
                    instruction.operand = shortest.operand;
                    true
                }
                None => false,
            }
        }
    }
}

fn shrink_variable_access<M, V, P>(instruction: &mut Instruction<'_, M, V, P>, index: u16) -> bool {
    let long_form = instruction.opcode.long_form().unwrap_or(instruction.opcode);
    let shortest: Instruction<M, V, P> = match long_form {
        LDLOC => Instruction::ldloc(index),
        STLOC => Instruction::stloc(index),
        LDARG => Instruction::ldarg(index),
        _ => match long_form.short_form() {
            Some(short_form) if index <= u8::MAX as u16 && short_form != instruction.opcode => {
                instruction.opcode = short_form;
                return true;
            }
            _ => return false,
        },
    };
    if shortest.opcode == instruction.opcode {
        return false;
    }
    instruction.opcode = shortest.opcode;
    instruction.operand = shortest.operand;
    true
}

fn expand<M, V, P>(instruction: &mut Instruction<'_, M, V, P>) -> bool {
    let opcode = instruction.opcode;
    if opcode != LDC_I4 {
        if let Some(value) = instruction.ldc_i4_value() {
            instruction.opcode = LDC_I4;
            instruction.operand = Operand::Int32(value);
            return true;
        }
    }
    if let Some(&(_, long_form, index)) = VARIABLE_MACROS.iter().find(|(op, _, _)| *op == opcode) {
        instruction.opcode = long_form;
        instruction.operand = if long_form == LDARG {
            Operand::Argument(Resolvable::Raw(index))
        } else {
            Operand::Local(Resolvable::Raw(index))
        };
        return true;
    }
    match opcode.long_form() {
        Some(long_form) => {
            instruction.opcode = long_form;
            true
        }
        None => false,
    }
}

/// Raw index of a local or argument operand
fn raw_index<M, V, P>(operand: &Operand<'_, M, V, P>) -> Option<u16> {
    match operand {
        Operand::Local(Resolvable::Raw(index)) | Operand::Argument(Resolvable::Raw(index)) => {
            Some(*index)
        }
        _ => None,
    }
}

/// Macro opcodes for locals and arguments, with their long form and the index they stand for
const VARIABLE_MACROS: [(OpCode, OpCode, u16); 12] = [
    (LDLOC_0, LDLOC, 0),
    (LDLOC_1, LDLOC, 1),
    (LDLOC_2, LDLOC, 2),
    (LDLOC_3, LDLOC, 3),
    (STLOC_0, STLOC, 0),
    (STLOC_1, STLOC, 1),
    (STLOC_2, STLOC, 2),
    (STLOC_3, STLOC, 3),
    (LDARG_0, LDARG, 0),
    (LDARG_1, LDARG, 1),
    (LDARG_2, LDARG, 2),
    (LDARG_3, LDARG, 3),
];

#[cfg(test)]
mod test {
    use super::*;
    use crate::cil::{disassemble, Assembler, RawOperands};

    /// `count` bytes worth of `nop`
    fn padding<'a>(count: usize) -> Vec<Instruction<'a>> {
        (0..count).map(|_| Instruction::new(NOP)).collect()
    }

    fn assemble(code: &[Instruction]) -> Vec<u8> {
        let assembled = Assembler::new(RawOperands::new()).assemble(code).unwrap();
        assert!(assembled.diagnostics.is_empty());
        assembled.code
    }

    #[test]
    fn nothing_to_widen() {
        let mut code: Vec<Instruction> = vec![
            Instruction::branch(BR_S, Label::Offset(3)),
            Instruction::new(NOP),
            Instruction::new(RET),
        ];
        calculate_offsets(&code);
        let before = code.clone();
        let reencoded = expand_oversized_short_forms(&mut code);
        assert_eq!(reencoded.changed, 0);
        assert!(reencoded.offsets.is_identity());
        assert_eq!(code, before);
    }

    #[test]
    fn forward_branch() {
        let mut code: Vec<Instruction> = vec![Instruction::branch(BR_S, Label::Offset(0x90))];
        code.extend(padding(0x8E));
        code.push(Instruction::new(RET));

        let reencoded = expand_oversized_short_forms(&mut code);
        assert_eq!(reencoded.changed, 1);
        assert_eq!(reencoded.offsets.growth(), 3);
        assert_eq!(reencoded.offsets.translate(0x90), 0x93);
        assert_eq!(code[0].opcode, BR);
        assert_eq!(code[0].operand, Operand::Branch(Label::Offset(0x93)));
        assert_eq!(code[1].offset(), 5);
        assert_eq!(code.last().unwrap().offset(), 0x93);
        assert_eq!(&assemble(&code)[..5], &[0x38, 0x8E, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn backward_branch_within_range_stays_short() {
        let mut code: Vec<Instruction> = padding(126);
        code.push(Instruction::branch(BRTRUE_S, Label::Offset(0)));
        assert_eq!(expand_oversized_short_forms(&mut code).changed, 0);
        assert_eq!(code[126].opcode, BRTRUE_S);
    }

    #[test]
    fn only_overflowing_branches_widen() {
        let mut code: Vec<Instruction> = vec![
            Instruction::branch(BR_S, Label::Offset(0x82)),
            Instruction::branch(BEQ_S, Label::Offset(0x82)),
        ];
        code.extend(padding(0x7E));
        code.push(Instruction::new(RET));

        assert_eq!(expand_oversized_short_forms(&mut code).changed, 1);
        assert_eq!(code[0].opcode, BR);
        assert_eq!(code[1].opcode, BEQ_S);
        assert_eq!(code[1].operand, Operand::Branch(Label::Offset(0x85)));
    }

    #[test]
    fn widening_cascades() {
        // The first branch fits until the second one gets longer
        let mut code: Vec<Instruction> = vec![
            Instruction::branch(BEQ_S, Label::Offset(0x81)),
            Instruction::branch(BR_S, Label::Offset(0x84)),
        ];
        code.extend(padding(0x7D));
        code.extend([
            Instruction::new(RET),
            Instruction::new(NOP),
            Instruction::new(NOP),
            Instruction::new(RET),
        ]);

        assert_eq!(expand_oversized_short_forms(&mut code).changed, 2);
        assert_eq!(code[0].opcode, BEQ);
        assert_eq!(code[1].opcode, BR);
        assert_eq!(code[0].operand, Operand::Branch(Label::Offset(0x87)));
        assert_eq!(code[1].operand, Operand::Branch(Label::Offset(0x8A)));
        assert_eq!(code[1].offset(), 5);
    }

    #[test]
    fn switch_targets_are_remapped() {
        let mut code: Vec<Instruction> = vec![
            Instruction::branch(BR_S, Label::Offset(0x8A)),
            Instruction::switch(vec![Label::Offset(0x89), Label::Offset(0x8A)]),
        ];
        code.extend(padding(0x7C));
        code.push(Instruction::new(RET));
        code.push(Instruction::new(RET));

        assert_eq!(expand_oversized_short_forms(&mut code).changed, 1);
        assert_eq!(
            code[1].operand,
            Operand::Switch(vec![Label::Offset(0x8C), Label::Offset(0x8D)])
        );
    }

    #[test]
    fn large_indices() {
        let mut code: Vec<Instruction> = vec![
            Instruction::with_operand(LDLOC_S, Operand::Local(Resolvable::Raw(300))),
            Instruction::with_operand(STARG_S, Operand::Argument(Resolvable::Raw(255))),
            Instruction::with_operand(LDARGA_S, Operand::Argument(Resolvable::Raw(256))),
        ];
        assert_eq!(expand_oversized_short_forms(&mut code).changed, 2);
        assert_eq!(code[0].opcode, LDLOC);
        assert_eq!(code[1].opcode, STARG_S);
        assert_eq!(code[2].opcode, LDARGA);
        assert_eq!(code[2].offset(), 6);
    }

    #[test]
    fn end_of_code_label() {
        let mut code: Vec<Instruction> = vec![
            Instruction::with_operand(LDLOC_S, Operand::Local(Resolvable::Raw(1000))),
            Instruction::branch(LEAVE_S, Label::Offset(4)),
        ];
        assert_eq!(expand_oversized_short_forms(&mut code).changed, 1);
        assert_eq!(code[1].operand, Operand::Branch(Label::Offset(6)));
    }

    #[test]
    fn translating_offsets() {
        let offsets = OffsetMap::new(vec![0, 2, 4], vec![0, 5, 7]);
        assert_eq!(offsets.translate(0), 0);
        assert_eq!(offsets.translate(1), 1);
        assert_eq!(offsets.translate(2), 5);
        assert_eq!(offsets.translate(3), 6);
        assert_eq!(offsets.translate(4), 7);
        assert_eq!(offsets.translate(10), 13);
        assert_eq!(offsets.translate(-1), -1);
        assert_eq!(offsets.translate_range(0, 4), Some((0, 7)));
        assert_eq!(offsets.translate_range(2, 0), Some((5, 0)));
        assert_eq!(offsets.translate_range(u32::MAX, 1), None);

        let back = OffsetMap::new(vec![0, 5, 7], vec![0, 2, 4]);
        assert!(offsets.clone().then(back).is_identity());
    }

    #[test]
    fn optimizing() {
        let mut code: Vec<Instruction> = vec![
            Instruction::with_operand(LDC_I4, Operand::Int32(3)),
            Instruction::with_operand(LDC_I4, Operand::Int32(-7)),
            Instruction::with_operand(LDC_I4_S, Operand::Int8(-1)),
            Instruction::with_operand(LDC_I4, Operand::Int32(1000)),
            Instruction::with_operand(STLOC, Operand::Local(Resolvable::Raw(1))),
            Instruction::with_operand(LDLOC_S, Operand::Local(Resolvable::Raw(4))),
            Instruction::with_operand(LDARG, Operand::Argument(Resolvable::Raw(2))),
            Instruction::with_operand(LDLOCA, Operand::Local(Resolvable::Raw(200))),
            Instruction::with_operand(STARG, Operand::Argument(Resolvable::Raw(300))),
            Instruction::with_operand(LDLOC, Operand::Local(Resolvable::Resolved(0))),
            Instruction::branch(BR, Label::Offset(0x2D)),
            Instruction::new(NOP),
            Instruction::new(RET),
        ];
        assert_eq!(calculate_offsets(&code), 0x2E);

        let reencoded = optimize_macros(&mut code);
        assert_eq!(reencoded.changed, 7);
        assert_eq!(reencoded.offsets.growth(), 0x1B - 0x2E);
        let opcodes: Vec<OpCode> = code.iter().map(|instruction| instruction.opcode).collect();
        assert_eq!(
            opcodes,
            vec![
                LDC_I4_3, LDC_I4_S, LDC_I4_M1, LDC_I4, STLOC_1, LDLOC_S, LDARG_2, LDLOCA_S, STARG,
                LDLOC, BR_S, NOP, RET,
            ]
        );
        assert_eq!(code[0].operand, Operand::None);
        assert_eq!(code[1].operand, Operand::Int8(-7));
        assert_eq!(code[2].operand, Operand::None);
        assert_eq!(code[10].operand, Operand::Branch(Label::Offset(0x1A)));
        assert_eq!(code[12].offset(), 0x1A);

        // Already as small as it gets
        assert_eq!(optimize_macros(&mut code).changed, 0);
    }

    #[test]
    fn optimizing_keeps_far_branches_long() {
        let mut code: Vec<Instruction> = vec![
            Instruction::branch(BR, Label::Offset(0x88)),
            Instruction::branch(BR_S, Label::Offset(0x88)),
        ];
        code.extend(padding(0x81));
        code.push(Instruction::new(RET));

        let reencoded = optimize_macros(&mut code);
        assert_eq!(reencoded.changed, 1);
        assert_eq!(code[0].opcode, BR);
        assert_eq!(code[1].opcode, BR);
        assert_eq!(code[0].operand, Operand::Branch(Label::Offset(0x8B)));
        assert_eq!(code[1].operand, Operand::Branch(Label::Offset(0x8B)));
    }

    #[test]
    fn backward_branches_shrink() {
        let mut code: Vec<Instruction> = padding(0x7D);
        code.push(Instruction::branch(BR, Label::Offset(0)));
        optimize_macros(&mut code);

        // 0x7D bytes back, plus the two bytes of the branch itself
        assert_eq!(code[0x7D].opcode, BR_S);
        assert_eq!(&assemble(&code)[0x7D..], &[0x2B, 0x81]);
    }

    #[test]
    fn expanding() {
        let mut code: Vec<Instruction> = vec![
            Instruction::ldc_i4(2),
            Instruction::ldc_i4(-50),
            Instruction::ldloc(0),
            Instruction::stloc(5),
            Instruction::ldarg(3),
            Instruction::with_operand(LDARGA_S, Operand::Argument(Resolvable::Raw(1))),
            Instruction::branch(BRFALSE_S, Label::Offset(0x0C)),
            Instruction::new(NOP),
            Instruction::new(RET),
        ];
        assert_eq!(calculate_offsets(&code), 0x0D);

        let reencoded = expand_macros(&mut code);
        assert_eq!(reencoded.changed, 7);
        assert_eq!(code[0].operand, Operand::Int32(2));
        assert_eq!(code[1].operand, Operand::Int32(-50));
        assert_eq!(code[2].opcode, LDLOC);
        assert_eq!(code[2].operand, Operand::Local(Resolvable::Raw(0)));
        assert_eq!(code[3].opcode, STLOC);
        assert_eq!(code[4].operand, Operand::Argument(Resolvable::Raw(3)));
        assert_eq!(code[5].opcode, LDARGA);
        assert_eq!(code[6].opcode, BRFALSE);
        assert_eq!(code[6].operand, Operand::Branch(Label::Offset(0x20)));

        let bytes = assemble(&code);
        let decoded = disassemble(&bytes, RawOperands::new()).unwrap();
        assert_eq!(decoded, code);

        // And back again
        let reencoded = optimize_macros(&mut code);
        assert_eq!(reencoded.changed, 7);
        assert_eq!(reencoded.offsets.growth(), -0x14);
        assert_eq!(code[6].operand, Operand::Branch(Label::Offset(0x0C)));
    }
}
