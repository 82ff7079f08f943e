use super::Serialize;
use byteorder::WriteBytesExt;
use std::fmt;

/// Metadata token: a table index in the top byte and a 1-based row id in the low three bytes
///
/// User strings (`ldstr` operands) use the pseudo-table `0x70`, where the row id is an offset
/// into the `#US` heap instead.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Token(pub u32);

impl Token {
    /// Table index used by user string tokens
    pub const USER_STRING_TABLE: u8 = 0x70;

    pub fn new(table: u8, rid: u32) -> Token {
        Token(((table as u32) << 24) | (rid & 0x00FF_FFFF))
    }

    pub fn table(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn rid(self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    pub fn is_user_string(self) -> bool {
        self.table() == Token::USER_STRING_TABLE
    }
}

impl From<u32> for Token {
    fn from(raw: u32) -> Token {
        Token(raw)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TOKEN<{:#010X}>", self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TOKEN<{:#010X}>", self.0)
    }
}

impl Serialize for Token {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}
