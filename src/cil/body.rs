//! Method body headers and extra sections
//!
//! A method body is either:
//!
//! ```text,ignore,no_run
//!   tiny:  [ code_size << 2 | 0b10 ] [ code ... ]
//!
//!   fat:   [ flags (12 bits) | header dwords (4 bits) : u16 ]
//!          [ max_stack : u16 ] [ code_size : u32 ] [ local_var_sig_token : u32 ]
//!          [ code ... ]
//!          ( [ padding to 4 bytes ] [ extra section ] )*
//! ```
//!
//! Extra sections (in practice, exception handler tables) follow the code if the fat header
//! has the `MORE_SECTIONS` flag. Each section starts with a kind byte saying whether it uses the
//! tiny or fat layout and whether another section follows it.

use super::binary_format::align4;
use super::{Error, Serialize, Token};
use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::Write;

bitflags! {
    /// Flags in the low 12 bits of a fat header (and the low 2 bits of a tiny one)
    pub struct MethodBodyAttributes: u16 {
        const TINY_FORMAT = 0x2;
        const FAT_FORMAT = 0x3;
        const MORE_SECTIONS = 0x8;
        const INIT_LOCALS = 0x10;
    }
}

bitflags! {
    /// Kind byte at the start of an extra section
    pub struct SectionAttributes: u8 {
        const EH_TABLE = 0x01;
        const OPT_IL_TABLE = 0x02;
        const FAT_FORMAT = 0x40;
        const MORE_SECTIONS = 0x80;
    }
}

const FORMAT_MASK: u8 = 0x3;

/// Size in bytes of the only fat header layout that gets written
pub const FAT_HEADER_SIZE: usize = 12;

/// Largest amount of code a tiny header can describe
pub const MAX_TINY_CODE_SIZE: usize = 0x3F;

/// Size of the header at the start of every extra section
pub const SECTION_HEADER_SIZE: usize = 4;

/// Which header layout a method body uses
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BodyFormat {
    Tiny,
    Fat,
}

impl BodyFormat {
    /// Pick the smallest header that can represent a body
    ///
    /// Tiny headers have no room for a local variable signature or extra sections, and imply a
    /// max stack of 8.
    pub fn required_for(
        code_size: usize,
        max_stack: u16,
        has_locals: bool,
        has_extra_sections: bool,
    ) -> BodyFormat {
        if has_extra_sections || has_locals || max_stack > 8 || code_size > MAX_TINY_CODE_SIZE {
            BodyFormat::Fat
        } else {
            BodyFormat::Tiny
        }
    }
}

/// Method body as it is framed on disk, with the code still encoded
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawMethodBody {
    Tiny(TinyMethodBody),
    Fat(FatMethodBody),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TinyMethodBody {
    code: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FatMethodBody {
    /// `FAT_FORMAT` and `MORE_SECTIONS` are set from the body contents when it is written
    pub attributes: MethodBodyAttributes,
    pub max_stack: u16,

    /// `Token(0)` when the method has no locals
    pub local_var_sig_token: Token,
    pub code: Vec<u8>,
    pub extra_sections: Vec<ExtraSection>,
}

/// Section following the code of a fat method body
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtraSection {
    /// `MORE_SECTIONS` is set from the position of the section when it is written
    pub attributes: SectionAttributes,

    /// Section contents, without the section header
    pub data: Vec<u8>,
}

impl TinyMethodBody {
    pub fn new(code: Vec<u8>) -> Result<TinyMethodBody, Error> {
        if code.len() > MAX_TINY_CODE_SIZE {
            return Err(Error::TinyBodyTooLarge(code.len()));
        }
        Ok(TinyMethodBody { code })
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn into_code(self) -> Vec<u8> {
        self.code
    }
}

impl FatMethodBody {
    pub fn new(max_stack: u16, local_var_sig_token: Token, code: Vec<u8>) -> FatMethodBody {
        FatMethodBody {
            attributes: MethodBodyAttributes::FAT_FORMAT,
            max_stack,
            local_var_sig_token,
            code,
            extra_sections: vec![],
        }
    }

    pub fn init_locals(&self) -> bool {
        self.attributes.contains(MethodBodyAttributes::INIT_LOCALS)
    }

    pub fn set_init_locals(&mut self, init_locals: bool) {
        self.attributes
            .set(MethodBodyAttributes::INIT_LOCALS, init_locals)
    }

    fn read(data: &[u8]) -> Result<FatMethodBody, Error> {
        if data.len() < FAT_HEADER_SIZE {
            return Err(Error::TruncatedMethodBody {
                expected: FAT_HEADER_SIZE,
                available: data.len(),
            });
        }
        let flags_and_size = LittleEndian::read_u16(&data[0..2]);
        let attributes = MethodBodyAttributes::from_bits_truncate(flags_and_size & 0x0FFF);
        let header_size = (flags_and_size >> 12) as usize * 4;
        if header_size < FAT_HEADER_SIZE {
            return Err(Error::InvalidFatHeaderSize(header_size));
        }
        let max_stack = LittleEndian::read_u16(&data[2..4]);
        let code_size = LittleEndian::read_u32(&data[4..8]) as usize;
        let local_var_sig_token = Token(LittleEndian::read_u32(&data[8..12]));

        let code_end = header_size.saturating_add(code_size);
        let code = data
            .get(header_size..code_end)
            .ok_or(Error::TruncatedMethodBody {
                expected: code_end,
                available: data.len(),
            })?
            .to_vec();

        let mut extra_sections = vec![];
        if attributes.contains(MethodBodyAttributes::MORE_SECTIONS) {
            let mut offset = code_end;
            loop {
                offset = align4(offset);
                let section = ExtraSection::read(data, offset)?;
                offset += section.size();
                let more = section
                    .attributes
                    .contains(SectionAttributes::MORE_SECTIONS);
                extra_sections.push(section);
                if !more {
                    break;
                }
            }
        }
        log::debug!(
            "fat method body: {} bytes of code, max stack {}, {} extra section(s)",
            code.len(),
            max_stack,
            extra_sections.len()
        );

        Ok(FatMethodBody {
            attributes,
            max_stack,
            local_var_sig_token,
            code,
            extra_sections,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        let mut attributes = self.attributes | MethodBodyAttributes::FAT_FORMAT;
        attributes.set(
            MethodBodyAttributes::MORE_SECTIONS,
            !self.extra_sections.is_empty(),
        );
        let flags_and_size = attributes.bits() | ((FAT_HEADER_SIZE as u16 / 4) << 12);
        flags_and_size.serialize(writer)?;
        self.max_stack.serialize(writer)?;
        (self.code.len() as u32).serialize(writer)?;
        self.local_var_sig_token.serialize(writer)?;
        writer.write_all(&self.code)?;

        let mut offset = FAT_HEADER_SIZE + self.code.len();
        for (i, section) in self.extra_sections.iter().enumerate() {
            let aligned = align4(offset);
            writer.write_all(&[0u8; 3][..aligned - offset])?;
            section.write(writer, i + 1 < self.extra_sections.len())?;
            offset = aligned + section.size();
        }
        Ok(())
    }

    fn size(&self) -> usize {
        self.extra_sections
            .iter()
            .fold(FAT_HEADER_SIZE + self.code.len(), |offset, section| {
                align4(offset) + section.size()
            })
    }
}

impl RawMethodBody {
    /// Tiny method body, if the code is small enough
    pub fn tiny(code: Vec<u8>) -> Result<RawMethodBody, Error> {
        Ok(RawMethodBody::Tiny(TinyMethodBody::new(code)?))
    }

    /// Read a method body starting at the first byte of `data`
    ///
    /// Trailing bytes after the body are ignored.
    pub fn read(data: &[u8]) -> Result<RawMethodBody, Error> {
        let first = *data.first().ok_or(Error::TruncatedMethodBody {
            expected: 1,
            available: 0,
        })?;
        match first & FORMAT_MASK {
            0x2 => {
                let code_size = (first >> 2) as usize;
                let code = data.get(1..1 + code_size).ok_or(Error::TruncatedMethodBody {
                    expected: 1 + code_size,
                    available: data.len(),
                })?;
                log::debug!("tiny method body: {} bytes of code", code_size);
                Ok(RawMethodBody::Tiny(TinyMethodBody {
                    code: code.to_vec(),
                }))
            }
            0x3 => Ok(RawMethodBody::Fat(FatMethodBody::read(data)?)),
            _ => Err(Error::InvalidMethodBodyHeader(first)),
        }
    }

    pub fn format(&self) -> BodyFormat {
        match self {
            RawMethodBody::Tiny(_) => BodyFormat::Tiny,
            RawMethodBody::Fat(_) => BodyFormat::Fat,
        }
    }

    pub fn code(&self) -> &[u8] {
        match self {
            RawMethodBody::Tiny(tiny) => &tiny.code,
            RawMethodBody::Fat(fat) => &fat.code,
        }
    }

    pub fn max_stack(&self) -> u16 {
        match self {
            RawMethodBody::Tiny(_) => 8,
            RawMethodBody::Fat(fat) => fat.max_stack,
        }
    }

    pub fn local_var_sig_token(&self) -> Option<Token> {
        match self {
            RawMethodBody::Fat(fat) if fat.local_var_sig_token.0 != 0 => {
                Some(fat.local_var_sig_token)
            }
            _ => None,
        }
    }

    pub fn init_locals(&self) -> bool {
        match self {
            RawMethodBody::Tiny(_) => false,
            RawMethodBody::Fat(fat) => fat.init_locals(),
        }
    }

    pub fn extra_sections(&self) -> &[ExtraSection] {
        match self {
            RawMethodBody::Tiny(_) => &[],
            RawMethodBody::Fat(fat) => &fat.extra_sections,
        }
    }

    /// Number of bytes the body takes up when written
    pub fn size(&self) -> usize {
        match self {
            RawMethodBody::Tiny(tiny) => 1 + tiny.code.len(),
            RawMethodBody::Fat(fat) => fat.size(),
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        match self {
            RawMethodBody::Tiny(tiny) => {
                let header = ((tiny.code.len() as u8) << 2) | 0x2;
                header.serialize(writer)?;
                writer.write_all(&tiny.code)?;
                Ok(())
            }
            RawMethodBody::Fat(fat) => fat.write(writer),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::with_capacity(self.size());
        self.write(&mut bytes)?;
        Ok(bytes)
    }
}

impl ExtraSection {
    pub fn new(attributes: SectionAttributes, data: Vec<u8>) -> ExtraSection {
        ExtraSection { attributes, data }
    }

    pub fn is_fat(&self) -> bool {
        self.attributes.contains(SectionAttributes::FAT_FORMAT)
    }

    pub fn is_exception_handler_table(&self) -> bool {
        self.attributes.contains(SectionAttributes::EH_TABLE)
    }

    /// Size of the section, header included
    pub fn size(&self) -> usize {
        SECTION_HEADER_SIZE + self.data.len()
    }

    /// Read a section at `offset` in `data`
    ///
    /// The size in the section header counts the header itself.
    fn read(data: &[u8], offset: usize) -> Result<ExtraSection, Error> {
        let header = data
            .get(offset..offset + SECTION_HEADER_SIZE)
            .ok_or(Error::TruncatedMethodBody {
                expected: offset + SECTION_HEADER_SIZE,
                available: data.len(),
            })?;
        let attributes = SectionAttributes::from_bits_truncate(header[0]);
        let size = if attributes.contains(SectionAttributes::FAT_FORMAT) {
            LittleEndian::read_u24(&header[1..4]) as usize
        } else {
            header[1] as usize
        };
        if size < SECTION_HEADER_SIZE {
            return Err(Error::InvalidExtraSectionSize(size));
        }
        let contents = data
            .get(offset + SECTION_HEADER_SIZE..offset + size)
            .ok_or(Error::TruncatedMethodBody {
                expected: offset + size,
                available: data.len(),
            })?;
        Ok(ExtraSection {
            attributes,
            data: contents.to_vec(),
        })
    }

    fn write<W: Write>(&self, writer: &mut W, more_sections: bool) -> Result<(), Error> {
        let mut attributes = self.attributes;
        attributes.set(SectionAttributes::MORE_SECTIONS, more_sections);
        let size = self.size();
        attributes.bits().serialize(writer)?;
        if self.is_fat() {
            if size > 0x00FF_FFFF {
                return Err(Error::InvalidExtraSectionSize(size));
            }
            writer.write_u24::<LittleEndian>(size as u32)?;
        } else {
            if size > u8::MAX as usize {
                return Err(Error::InvalidExtraSectionSize(size));
            }
            (size as u8).serialize(writer)?;
            0u16.serialize(writer)?;
        }
        writer.write_all(&self.data)?;
        Ok(())
    }
}
