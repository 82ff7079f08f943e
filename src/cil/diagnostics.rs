use super::{Error, OpCode};
use std::fmt;

/// Problem noticed while assembling an instruction or checking the labels of a body
///
/// None of these stop the assembler from producing output: the instruction is still written out
/// with its declared size. Whether they stop assembly is up to the [`ErrorListener`].
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    /// Name of the method body, if the assembler was given one
    pub body_name: Option<String>,

    /// Offset of the offending instruction, or of the offending exception handler boundary
    /// (saturated to `i32::MAX`)
    pub offset: i32,

    /// Opcode of the offending instruction, if there is one
    pub opcode: Option<OpCode>,
    pub kind: DiagnosticKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DiagnosticKind {
    /// Operand variant doesn't match the opcode's operand type (zero bytes were written instead)
    OperandTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Branch delta doesn't fit in the operand (the truncated value was written)
    BranchOverflow { delta: i64 },

    /// Local or argument index doesn't fit in the operand (the truncated value was written)
    IndexOverflow { index: u16 },

    /// Branch or switch target offset isn't the start of an instruction or the end of the code
    InvalidBranchTarget { target: i32 },

    /// Branch or switch target instruction isn't part of the body
    MissingBranchTarget,

    /// Boundary of the exception handler at index `handler` isn't the start of an instruction or
    /// the end of the code
    InvalidHandlerBoundary {
        handler: usize,
        boundary: HandlerBoundary,
    },
}

/// One of the offsets delimiting the blocks of an exception handler
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HandlerBoundary {
    TryStart,
    TryEnd,
    HandlerStart,
    HandlerEnd,
    FilterStart,
}

impl fmt::Display for HandlerBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandlerBoundary::TryStart => "try start",
            HandlerBoundary::TryEnd => "try end",
            HandlerBoundary::HandlerStart => "handler start",
            HandlerBoundary::HandlerEnd => "handler end",
            HandlerBoundary::FilterStart => "filter start",
        })
    }
}

impl Diagnostic {
    pub fn is_overflow(&self) -> bool {
        matches!(
            self.kind,
            DiagnosticKind::BranchOverflow { .. } | DiagnosticKind::IndexOverflow { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(body_name) = &self.body_name {
            write!(f, "{}: ", body_name)?;
        }
        write!(f, "IL_{:04X}: ", self.offset)?;
        if let Some(opcode) = self.opcode {
            write!(f, "{}: ", opcode)?;
        }
        match &self.kind {
            DiagnosticKind::OperandTypeMismatch { expected, found } => {
                write!(f, "expected {} operand but found {}", expected, found)
            }
            DiagnosticKind::BranchOverflow { delta } => {
                write!(f, "branch delta {} does not fit in the operand", delta)
            }
            DiagnosticKind::IndexOverflow { index } => {
                write!(f, "index {} does not fit in the operand", index)
            }
            DiagnosticKind::InvalidBranchTarget { target } => {
                write!(f, "target IL_{:04X} is not the start of an instruction", target)
            }
            DiagnosticKind::MissingBranchTarget => {
                f.write_str("target instruction is not in the method body")
            }
            DiagnosticKind::InvalidHandlerBoundary { handler, boundary } => write!(
                f,
                "{} of exception handler {} is not the start of an instruction",
                boundary, handler
            ),
        }
    }
}

/// Decides which diagnostics abort assembly
///
/// Returning an error from `report` stops the assembler and propagates that error. Diagnostics
/// that don't abort are collected in [`AssembledCode::diagnostics`](super::AssembledCode).
pub trait ErrorListener {
    fn report(&mut self, diagnostic: &Diagnostic) -> Result<(), Error>;
}

/// Overflows are only recorded, everything else (operand type mismatches, bad labels) is fatal
#[derive(Copy, Clone, Debug, Default)]
pub struct EscalateMismatches;

impl ErrorListener for EscalateMismatches {
    fn report(&mut self, diagnostic: &Diagnostic) -> Result<(), Error> {
        if diagnostic.is_overflow() {
            Ok(())
        } else {
            Err(Error::Diagnostic(diagnostic.clone()))
        }
    }
}

/// Every diagnostic is fatal
#[derive(Copy, Clone, Debug, Default)]
pub struct EscalateAll;

impl ErrorListener for EscalateAll {
    fn report(&mut self, diagnostic: &Diagnostic) -> Result<(), Error> {
        Err(Error::Diagnostic(diagnostic.clone()))
    }
}

/// Nothing is fatal
#[derive(Copy, Clone, Debug, Default)]
pub struct CollectAll;

impl ErrorListener for CollectAll {
    fn report(&mut self, _diagnostic: &Diagnostic) -> Result<(), Error> {
        Ok(())
    }
}

impl<L: ErrorListener + ?Sized> ErrorListener for &mut L {
    fn report(&mut self, diagnostic: &Diagnostic) -> Result<(), Error> {
        (**self).report(diagnostic)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cil::opcodes::*;

    fn overflow() -> Diagnostic {
        Diagnostic {
            body_name: Some("Program::Main".to_owned()),
            offset: 0x10,
            opcode: Some(BR_S),
            kind: DiagnosticKind::BranchOverflow { delta: 300 },
        }
    }

    fn mismatch() -> Diagnostic {
        Diagnostic {
            body_name: None,
            offset: 2,
            opcode: Some(LDC_I4),
            kind: DiagnosticKind::OperandTypeMismatch {
                expected: "int32",
                found: "float32",
            },
        }
    }

    fn bad_boundary() -> Diagnostic {
        Diagnostic {
            body_name: None,
            offset: 0x0B,
            opcode: None,
            kind: DiagnosticKind::InvalidHandlerBoundary {
                handler: 1,
                boundary: HandlerBoundary::TryEnd,
            },
        }
    }

    #[test]
    fn default_listener() {
        assert!(EscalateMismatches.report(&overflow()).is_ok());
        assert!(matches!(
            EscalateMismatches.report(&mismatch()),
            Err(Error::Diagnostic(_))
        ));
        assert!(EscalateMismatches.report(&bad_boundary()).is_err());
    }

    #[test]
    fn strict_and_lenient_listeners() {
        assert!(EscalateAll.report(&overflow()).is_err());
        assert!(CollectAll.report(&mismatch()).is_ok());
    }

    #[test]
    fn display() {
        assert_eq!(
            overflow().to_string(),
            "Program::Main: IL_0010: br.s: branch delta 300 does not fit in the operand"
        );
        assert_eq!(
            mismatch().to_string(),
            "IL_0002: ldc.i4: expected int32 operand but found float32"
        );
        assert_eq!(
            bad_boundary().to_string(),
            "IL_000B: try end of exception handler 1 is not the start of an instruction"
        );
    }
}
