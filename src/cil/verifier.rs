use super::{
    calculate_offsets, instruction_by_offset, AssemblerSettings, Diagnostic, DiagnosticKind,
    Error, ErrorListener, ExceptionHandler, HandlerBoundary, Instruction, Label, OpCode, Operand,
};
use crate::util::RefId;

/// Check that every branch target and exception handler boundary is the start of an instruction
/// or the end of the code
///
/// Instructions are laid out first, unless `settings` says their offsets are already right.
/// Problems go through `listener`, and the ones it doesn't escalate are returned.
pub fn verify_labels<'a, M: 'a, V: 'a, P: 'a, L: ErrorListener>(
    instructions: &[Instruction<'a, M, V, P>],
    exception_handlers: &[ExceptionHandler],
    settings: &AssemblerSettings,
    mut listener: L,
) -> Result<Vec<Diagnostic>, Error> {
    let end = if settings.recalculate_offsets {
        calculate_offsets(instructions) as i64
    } else {
        instructions
            .last()
            .map_or(0, |last| last.end_offset() as i64)
    };
    let is_boundary = |offset: i64| {
        offset == end
            || i32::try_from(offset)
                .ok()
                .and_then(|offset| instruction_by_offset(instructions, offset))
                .is_some()
    };
    let is_placed = |target: &RefId<'a, Instruction<'a, M, V, P>>| {
        instruction_by_offset(instructions, target.offset())
            .map_or(false, |found| RefId(found) == *target)
    };

    let mut diagnostics = vec![];
    let mut report = |offset: i64, opcode: Option<OpCode>, kind| -> Result<(), Error> {
        let diagnostic = Diagnostic {
            body_name: settings.body_name.clone(),
            offset: i32::try_from(offset).unwrap_or(i32::MAX),
            opcode,
            kind,
        };
        log::warn!("{}", diagnostic);
        listener.report(&diagnostic)?;
        diagnostics.push(diagnostic);
        Ok(())
    };

    for instruction in instructions {
        let targets = match &instruction.operand {
            Operand::Branch(target) => std::slice::from_ref(target),
            Operand::Switch(targets) => targets.as_slice(),
            _ => continue,
        };
        for target in targets {
            let kind = match target {
                Label::Offset(offset) if !is_boundary(*offset as i64) => {
                    DiagnosticKind::InvalidBranchTarget { target: *offset }
                }
                Label::Instruction(target) if !is_placed(target) => {
                    DiagnosticKind::MissingBranchTarget
                }
                _ => continue,
            };
            report(instruction.offset() as i64, Some(instruction.opcode), kind)?;
        }
    }

    for (idx, handler) in exception_handlers.iter().enumerate() {
        let mut boundaries = vec![
            (HandlerBoundary::TryStart, u64::from(handler.try_offset)),
            (HandlerBoundary::TryEnd, handler.try_end()),
            (HandlerBoundary::HandlerStart, u64::from(handler.handler_offset)),
            (HandlerBoundary::HandlerEnd, handler.handler_end()),
        ];
        if let Some(filter) = handler.filter_offset() {
            boundaries.push((HandlerBoundary::FilterStart, u64::from(filter)));
        }
        for (boundary, offset) in boundaries {
            // Handler offsets are at most 33 bits wide
            let offset = offset as i64;
            if !is_boundary(offset) {
                let kind = DiagnosticKind::InvalidHandlerBoundary {
                    handler: idx,
                    boundary,
                };
                report(offset, None, kind)?;
            }
        }
    }

    Ok(diagnostics)
}
