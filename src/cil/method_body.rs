use super::jump_encoding::{self, OffsetMap, Reencoded};
use super::{
    disassemble, verify_labels, Assembler, AssemblerSettings, BodyFormat, Diagnostic, Error,
    ErrorListener, ExceptionHandler, ExtraSection, FatMethodBody, Instruction, OperandBuilder,
    OperandResolver, RawMethodBody, Token,
};

/// Decoded method body: header fields, instructions, and exception handlers
///
/// This is the editable counterpart of [`RawMethodBody`]. Framing details (tiny versus fat header,
/// section layout) are not kept: they are picked again from the contents by [`MethodBody::to_raw`].
#[derive(Clone, Debug, PartialEq)]
pub struct MethodBody<'a, M = Token, V = u16, P = u16> {
    pub max_stack: u16,
    pub init_locals: bool,
    pub local_var_sig: Option<Token>,
    pub instructions: Vec<Instruction<'a, M, V, P>>,
    pub exception_handlers: Vec<ExceptionHandler>,
}

impl<'a, M: 'a, V: 'a, P: 'a> MethodBody<'a, M, V, P> {
    pub fn new(max_stack: u16, instructions: Vec<Instruction<'a, M, V, P>>) -> Self {
        MethodBody {
            max_stack,
            init_locals: false,
            local_var_sig: None,
            instructions,
            exception_handlers: vec![],
        }
    }

    /// Decode a framed body, resolving operands with `resolver`
    ///
    /// Handlers from every exception handler table are gathered in order. Other extra sections
    /// are dropped.
    pub fn from_raw<R>(raw: &RawMethodBody, resolver: R) -> Result<Self, Error>
    where
        R: OperandResolver<Member = M, Variable = V, Parameter = P>,
    {
        let instructions = disassemble(raw.code(), resolver)?;
        let mut exception_handlers = vec![];
        for section in raw.extra_sections() {
            exception_handlers.extend(section.exception_handlers()?);
        }
        Ok(MethodBody {
            max_stack: raw.max_stack(),
            init_locals: raw.init_locals(),
            local_var_sig: raw.local_var_sig_token(),
            instructions,
            exception_handlers,
        })
    }

    /// Encode the instructions and frame them with the smallest header that fits
    ///
    /// Diagnostics the assembler's listener didn't escalate are returned alongside the body.
    pub fn to_raw<B, L>(
        &self,
        assembler: &mut Assembler<B, L>,
    ) -> Result<(RawMethodBody, Vec<Diagnostic>), Error>
    where
        B: OperandBuilder<Member = M, Variable = V, Parameter = P>,
        L: ErrorListener,
    {
        let assembled = assembler.assemble(&self.instructions)?;
        let has_extra_sections = !self.exception_handlers.is_empty();
        let format = BodyFormat::required_for(
            assembled.code.len(),
            self.max_stack,
            self.local_var_sig.is_some(),
            has_extra_sections,
        );

        // A tiny header has no room for the init locals flag either
        let body = if format == BodyFormat::Tiny && !self.init_locals {
            RawMethodBody::tiny(assembled.code)?
        } else {
            let local_var_sig = self.local_var_sig.unwrap_or_default();
            let mut fat = FatMethodBody::new(self.max_stack, local_var_sig, assembled.code);
            fat.set_init_locals(self.init_locals);
            if has_extra_sections {
                fat.extra_sections
                    .push(ExtraSection::from_exception_handlers(&self.exception_handlers)?);
            }
            RawMethodBody::Fat(fat)
        };
        log::debug!(
            "framed {} instruction(s) as a {:?} body of {} bytes",
            self.instructions.len(),
            body.format(),
            body.size()
        );
        Ok((body, assembled.diagnostics))
    }

    /// Widen short forms whose operands overflow, moving exception handlers along
    ///
    /// Returns the number of instructions that changed. See
    /// [`jump_encoding::expand_oversized_short_forms`].
    pub fn expand_oversized_short_forms(&mut self) -> usize {
        let reencoded = jump_encoding::expand_oversized_short_forms(&mut self.instructions);
        self.relocate_handlers(reencoded)
    }

    /// Switch every instruction to its smallest encoding, moving exception handlers along
    pub fn optimize_macros(&mut self) -> usize {
        let reencoded = jump_encoding::optimize_macros(&mut self.instructions);
        self.relocate_handlers(reencoded)
    }

    /// Switch every instruction to its long encoding, moving exception handlers along
    pub fn expand_macros(&mut self) -> usize {
        let reencoded = jump_encoding::expand_macros(&mut self.instructions);
        self.relocate_handlers(reencoded)
    }

    /// Check that branch targets and handler boundaries all land on instructions
    ///
    /// See [`verify_labels`](super::verify_labels).
    pub fn verify_labels<L: ErrorListener>(
        &self,
        settings: &AssemblerSettings,
        listener: L,
    ) -> Result<Vec<Diagnostic>, Error> {
        verify_labels(&self.instructions, &self.exception_handlers, settings, listener)
    }

    fn relocate_handlers(&mut self, reencoded: Reencoded) -> usize {
        let offsets: &OffsetMap = &reencoded.offsets;
        if !offsets.is_identity() {
            for handler in self.exception_handlers.iter_mut() {
                *handler = handler.relocate(offsets);
            }
        }
        reencoded.changed
    }
}
