use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Result;

/// Utility trait for serializing the fixed-layout structures of method bodies
///
/// Everything in a method body is little-endian and none of the structures are self-describing,
/// so the layout is just the fields in declaration order.
pub trait Serialize: Sized {
    /// Serialize construct into a binary output stream
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()>;
}

impl Serialize for u8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(*self)
    }
}

impl Serialize for i8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i8(*self)
    }
}

macro_rules! little_endian_serialize {
    ($($ty:ty => $write:ident,)*) => {
        $(
            impl Serialize for $ty {
                fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
                    writer.$write::<LittleEndian>(*self)
                }
            }
        )*
    };
}

little_endian_serialize! {
    u16 => write_u16,
    u32 => write_u32,
    u64 => write_u64,
    i16 => write_i16,
    i32 => write_i32,
    i64 => write_i64,
    f32 => write_f32,
    f64 => write_f64,
}

/// Round `offset` up to the next multiple of four
pub(crate) fn align4(offset: usize) -> usize {
    (offset + 3) & !3
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn little_endian_layout() {
        let mut out = vec![];
        0x1234u16.serialize(&mut out).unwrap();
        (-2i32).serialize(&mut out).unwrap();
        1.0f32.serialize(&mut out).unwrap();
        assert_eq!(
            out,
            vec![0x34, 0x12, 0xFE, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x80, 0x3F]
        );
    }

    #[test]
    fn alignment() {
        assert_eq!(align4(0), 0);
        assert_eq!(align4(1), 4);
        assert_eq!(align4(12), 12);
        assert_eq!(align4(13), 16);
    }
}
