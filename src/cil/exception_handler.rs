use super::jump_encoding::OffsetMap;
use super::{Error, ExtraSection, SectionAttributes, Serialize, Token};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

/// Size of an exception handler record in a tiny section
pub const TINY_EXCEPTION_HANDLER_SIZE: usize = 12;

/// Size of an exception handler record in a fat section
pub const FAT_EXCEPTION_HANDLER_SIZE: usize = 24;

/// Most handlers a tiny section can hold (its size field is a single byte)
const MAX_TINY_EXCEPTION_HANDLERS: usize = 20;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExceptionHandlerKind {
    /// `catch` block for a particular exception type
    Exception,
    Filter,
    Finally,
    Fault,
}

impl ExceptionHandlerKind {
    pub fn from_flags(flags: u32) -> Option<ExceptionHandlerKind> {
        match flags {
            0 => Some(ExceptionHandlerKind::Exception),
            1 => Some(ExceptionHandlerKind::Filter),
            2 => Some(ExceptionHandlerKind::Finally),
            4 => Some(ExceptionHandlerKind::Fault),
            _ => None,
        }
    }

    pub fn flags(self) -> u32 {
        match self {
            ExceptionHandlerKind::Exception => 0,
            ExceptionHandlerKind::Filter => 1,
            ExceptionHandlerKind::Finally => 2,
            ExceptionHandlerKind::Fault => 4,
        }
    }
}

/// Protected region and the block handling it, as stored in an exception handler table
///
/// Offsets and lengths are in bytes, relative to the start of the method's code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub kind: ExceptionHandlerKind,
    pub try_offset: u32,
    pub try_length: u32,
    pub handler_offset: u32,
    pub handler_length: u32,

    /// Type token for `Exception`, start of the filter block for `Filter`, otherwise unused
    pub class_token_or_filter_offset: u32,
}

impl ExceptionHandler {
    pub fn catch_type(&self) -> Option<Token> {
        match self.kind {
            ExceptionHandlerKind::Exception => Some(Token(self.class_token_or_filter_offset)),
            _ => None,
        }
    }

    pub fn filter_offset(&self) -> Option<u32> {
        match self.kind {
            ExceptionHandlerKind::Filter => Some(self.class_token_or_filter_offset),
            _ => None,
        }
    }

    /// End of the protected region (exclusive)
    pub fn try_end(&self) -> u64 {
        u64::from(self.try_offset) + u64::from(self.try_length)
    }

    /// End of the handler block (exclusive)
    pub fn handler_end(&self) -> u64 {
        u64::from(self.handler_offset) + u64::from(self.handler_length)
    }

    /// Same handler, with its boundaries following the instructions they were on
    ///
    /// Ranges that don't fit in the code's offset type are left alone.
    pub fn relocate(&self, offsets: &OffsetMap) -> ExceptionHandler {
        let mut handler = *self;
        match offsets.translate_range(self.try_offset, self.try_length) {
            Some((offset, length)) => {
                handler.try_offset = offset;
                handler.try_length = length;
            }
            None => log::warn!("try block at {:#X} can't be relocated", self.try_offset),
        }
        match offsets.translate_range(self.handler_offset, self.handler_length) {
            Some((offset, length)) => {
                handler.handler_offset = offset;
                handler.handler_length = length;
            }
            None => log::warn!("handler at {:#X} can't be relocated", self.handler_offset),
        }
        if let Some(filter) = self.filter_offset() {
            match offsets.translate_range(filter, 0) {
                Some((offset, _)) => handler.class_token_or_filter_offset = offset,
                None => log::warn!("filter at {:#X} can't be relocated", filter),
            }
        }
        handler
    }

    /// Do the offsets or lengths overflow the tiny record layout?
    pub fn needs_fat_format(&self) -> bool {
        self.try_offset >= u16::MAX as u32
            || self.handler_offset >= u16::MAX as u32
            || self.try_length >= u8::MAX as u32
            || self.handler_length >= u8::MAX as u32
    }

    /// Parse one record from the start of `data`
    pub fn read(data: &[u8], fat: bool) -> Result<ExceptionHandler, Error> {
        let record_size = if fat {
            FAT_EXCEPTION_HANDLER_SIZE
        } else {
            TINY_EXCEPTION_HANDLER_SIZE
        };
        if data.len() < record_size {
            return Err(Error::TruncatedMethodBody {
                expected: record_size,
                available: data.len(),
            });
        }

        let (flags, try_offset, try_length, handler_offset, handler_length, class_or_filter) =
            if fat {
                (
                    LittleEndian::read_u32(&data[0..4]),
                    LittleEndian::read_u32(&data[4..8]),
                    LittleEndian::read_u32(&data[8..12]),
                    LittleEndian::read_u32(&data[12..16]),
                    LittleEndian::read_u32(&data[16..20]),
                    LittleEndian::read_u32(&data[20..24]),
                )
            } else {
                (
                    LittleEndian::read_u16(&data[0..2]) as u32,
                    LittleEndian::read_u16(&data[2..4]) as u32,
                    data[4] as u32,
                    LittleEndian::read_u16(&data[5..7]) as u32,
                    data[7] as u32,
                    LittleEndian::read_u32(&data[8..12]),
                )
            };

        let kind = ExceptionHandlerKind::from_flags(flags)
            .ok_or(Error::InvalidExceptionHandlerKind(flags))?;
        Ok(ExceptionHandler {
            kind,
            try_offset,
            try_length,
            handler_offset,
            handler_length,
            class_token_or_filter_offset: class_or_filter,
        })
    }

    /// Parse every record of an exception handler table
    ///
    /// Trailing bytes that don't add up to a whole record are ignored.
    pub fn read_table(data: &[u8], fat: bool) -> Result<Vec<ExceptionHandler>, Error> {
        let record_size = if fat {
            FAT_EXCEPTION_HANDLER_SIZE
        } else {
            TINY_EXCEPTION_HANDLER_SIZE
        };
        data.chunks_exact(record_size)
            .map(|record| ExceptionHandler::read(record, fat))
            .collect()
    }

    /// Write the record, truncating offsets and lengths if `fat` is false
    pub fn write<W: WriteBytesExt>(&self, writer: &mut W, fat: bool) -> std::io::Result<()> {
        if fat {
            self.kind.flags().serialize(writer)?;
            self.try_offset.serialize(writer)?;
            self.try_length.serialize(writer)?;
            self.handler_offset.serialize(writer)?;
            self.handler_length.serialize(writer)?;
        } else {
            (self.kind.flags() as u16).serialize(writer)?;
            (self.try_offset as u16).serialize(writer)?;
            (self.try_length as u8).serialize(writer)?;
            (self.handler_offset as u16).serialize(writer)?;
            (self.handler_length as u8).serialize(writer)?;
        }
        self.class_token_or_filter_offset.serialize(writer)
    }
}

impl ExtraSection {
    /// Exception handler table section holding `handlers`
    ///
    /// The section uses the fat layout if any handler needs it or if there are too many handlers
    /// for the single-byte size of a tiny section.
    pub fn from_exception_handlers(handlers: &[ExceptionHandler]) -> Result<ExtraSection, Error> {
        let fat = handlers.len() > MAX_TINY_EXCEPTION_HANDLERS
            || handlers.iter().any(ExceptionHandler::needs_fat_format);

        let mut attributes = SectionAttributes::EH_TABLE;
        attributes.set(SectionAttributes::FAT_FORMAT, fat);

        let mut data = vec![];
        for handler in handlers {
            handler.write(&mut data, fat)?;
        }
        Ok(ExtraSection::new(attributes, data))
    }

    /// Handlers in this section, if it is an exception handler table
    pub fn exception_handlers(&self) -> Result<Vec<ExceptionHandler>, Error> {
        if !self.is_exception_handler_table() {
            return Ok(vec![]);
        }
        ExceptionHandler::read_table(&self.data, self.is_fat())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TINY_CATCH: [u8; 12] = [
        0x00, 0x00, 0x01, 0x00, 0x20, 0x21, 0x00, 0x20, 0x02, 0x00, 0x00, 0x01,
    ];

    fn catch() -> ExceptionHandler {
        ExceptionHandler {
            kind: ExceptionHandlerKind::Exception,
            try_offset: 0x01,
            try_length: 0x20,
            handler_offset: 0x21,
            handler_length: 0x20,
            class_token_or_filter_offset: 0x01000002,
        }
    }

    #[test]
    fn tiny_record() {
        let handler = ExceptionHandler::read(&TINY_CATCH, false).unwrap();
        assert_eq!(handler, catch());
        assert_eq!(handler.catch_type(), Some(Token(0x01000002)));
        assert_eq!(handler.filter_offset(), None);

        let mut out = vec![];
        handler.write(&mut out, false).unwrap();
        assert_eq!(out, TINY_CATCH.to_vec());
    }

    #[test]
    fn fat_record() {
        let mut out = vec![];
        catch().write(&mut out, true).unwrap();
        assert_eq!(out.len(), FAT_EXCEPTION_HANDLER_SIZE);
        assert_eq!(&out[4..8], &[0x01, 0, 0, 0]);
        assert_eq!(ExceptionHandler::read(&out, true).unwrap(), catch());
    }

    #[test]
    fn fat_format_needed() {
        assert!(!catch().needs_fat_format());
        let long_try = ExceptionHandler {
            try_length: 0xFF,
            ..catch()
        };
        assert!(long_try.needs_fat_format());
        let far_handler = ExceptionHandler {
            handler_offset: 0x1_0000,
            ..catch()
        };
        assert!(far_handler.needs_fat_format());
    }

    #[test]
    fn sections() {
        let finally = ExceptionHandler {
            kind: ExceptionHandlerKind::Finally,
            class_token_or_filter_offset: 0,
            ..catch()
        };
        let section = ExtraSection::from_exception_handlers(&[catch(), finally]).unwrap();
        assert!(section.is_exception_handler_table());
        assert!(!section.is_fat());
        assert_eq!(section.data.len(), 24);
        assert_eq!(section.exception_handlers().unwrap(), vec![catch(), finally]);

        let wide = ExceptionHandler {
            try_offset: 0x2_0000,
            ..catch()
        };
        let section = ExtraSection::from_exception_handlers(&[catch(), wide]).unwrap();
        assert!(section.is_fat());
        assert_eq!(section.data.len(), 48);
        assert_eq!(section.exception_handlers().unwrap(), vec![catch(), wide]);

        let many = vec![catch(); 21];
        assert!(ExtraSection::from_exception_handlers(&many).unwrap().is_fat());
    }

    #[test]
    fn ends_do_not_overflow() {
        let handler = ExceptionHandler {
            try_offset: u32::MAX,
            try_length: 1,
            handler_offset: u32::MAX,
            handler_length: u32::MAX,
            ..catch()
        };
        assert_eq!(handler.try_end(), 0x1_0000_0000);
        assert_eq!(handler.handler_end(), 0x1_FFFF_FFFE);
        assert_eq!(catch().try_end(), 0x21);
    }

    #[test]
    fn relocation() {
        // Three one-byte instructions, the middle one growing to five bytes
        let offsets = OffsetMap::new(vec![0, 1, 2, 3], vec![0, 1, 6, 7]);

        let finally = ExceptionHandler {
            kind: ExceptionHandlerKind::Finally,
            try_offset: 0,
            try_length: 2,
            handler_offset: 2,
            handler_length: 1,
            class_token_or_filter_offset: 0,
        };
        assert_eq!(
            finally.relocate(&offsets),
            ExceptionHandler {
                try_length: 6,
                handler_offset: 6,
                ..finally
            }
        );

        let filter = ExceptionHandler {
            kind: ExceptionHandlerKind::Filter,
            try_offset: 0,
            try_length: 1,
            handler_offset: 1,
            handler_length: 1,
            class_token_or_filter_offset: 2,
        };
        assert_eq!(
            filter.relocate(&offsets),
            ExceptionHandler {
                handler_length: 5,
                class_token_or_filter_offset: 6,
                ..filter
            }
        );

        // Catch types aren't offsets
        let typed = ExceptionHandler {
            kind: ExceptionHandlerKind::Exception,
            class_token_or_filter_offset: 2,
            ..finally
        };
        assert_eq!(typed.relocate(&offsets).class_token_or_filter_offset, 2);

        let huge = ExceptionHandler {
            try_offset: u32::MAX,
            ..finally
        };
        assert_eq!(huge.relocate(&offsets).try_offset, u32::MAX);
    }

    #[test]
    fn unknown_kind() {
        let mut record = TINY_CATCH;
        record[0] = 3;
        assert!(matches!(
            ExceptionHandler::read(&record, false),
            Err(Error::InvalidExceptionHandlerKind(3))
        ));
    }
}
