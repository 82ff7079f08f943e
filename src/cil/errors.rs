use super::Diagnostic;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),

    /// Opcode byte(s) that do not name any instruction (two-byte codes include the `0xFE` escape)
    InvalidOpcode { offset: usize, code: u16 },

    /// Instruction at this offset runs past the end of the code
    TruncatedInstruction { offset: usize },

    /// First header byte is neither a tiny nor a fat method body tag
    InvalidMethodBodyHeader(u8),

    /// Fat header declares a header size smaller than the fixed 12 bytes
    InvalidFatHeaderSize(usize),

    /// Method body declares more code (or section data) than there are bytes available
    TruncatedMethodBody { expected: usize, available: usize },

    /// Extra section declares a size that can't even hold its own header
    InvalidExtraSectionSize(usize),

    /// Exception handler record with an unknown clause kind
    InvalidExceptionHandlerKind(u32),

    /// Tiny method bodies hold at most 63 bytes of code
    TinyBodyTooLarge(usize),

    /// Assembler diagnostic that the error listener chose to escalate
    Diagnostic(Diagnostic),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::InvalidOpcode { offset, code } => {
                write!(f, "invalid opcode {:#X} at IL_{:04X}", code, offset)
            }
            Error::TruncatedInstruction { offset } => {
                write!(f, "instruction at IL_{:04X} is truncated", offset)
            }
            Error::InvalidMethodBodyHeader(tag) => {
                write!(f, "invalid method body header byte {:#04X}", tag)
            }
            Error::InvalidFatHeaderSize(size) => {
                write!(f, "fat method body header size {} is too small", size)
            }
            Error::TruncatedMethodBody {
                expected,
                available,
            } => write!(
                f,
                "method body needs {} bytes but only {} are available",
                expected, available
            ),
            Error::InvalidExtraSectionSize(size) => {
                write!(f, "extra section size {} is invalid", size)
            }
            Error::InvalidExceptionHandlerKind(kind) => {
                write!(f, "invalid exception handler kind {:#X}", kind)
            }
            Error::TinyBodyTooLarge(len) => {
                write!(f, "{} bytes of code do not fit in a tiny method body", len)
            }
            Error::Diagnostic(diagnostic) => write!(f, "{}", diagnostic),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
