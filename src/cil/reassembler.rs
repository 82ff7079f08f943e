//! Token rewriting without a full disassemble/assemble round-trip
//!
//! When the only thing that changes about some code is the metadata tokens it refers to (for
//! instance, after rows have been renumbered), decoding it into [`Instruction`]s and then encoding
//! them again is wasted effort. The functions here walk the encoded instructions just far enough
//! to find the token operands, and copy every other byte through untouched. Each token is
//! resolved with an [`OperandResolver`]; only when that succeeds is it replaced with the token
//! from the [`OperandBuilder`].
//!
//! The output is always exactly as long as the input, so branch deltas, switch tables, and the
//! method body header all stay valid.
//!
//! [`Instruction`]: super::Instruction

use super::disassembler::read_opcode;
use super::{
    Error, ExtraSection, FatMethodBody, OperandBuilder, OperandResolver, OperandType,
    RawMethodBody, Serialize, TinyMethodBody, Token, FAT_EXCEPTION_HANDLER_SIZE,
    TINY_EXCEPTION_HANDLER_SIZE,
};
use byteorder::{ByteOrder, LittleEndian};
use std::io::Write;

/// Copy instruction bytes to `writer`, rewriting string and member tokens
pub fn rewrite_code<R, B, W>(
    code: &[u8],
    resolver: &R,
    builder: &mut B,
    writer: &mut W,
) -> Result<(), Error>
where
    R: OperandResolver + ?Sized,
    B: OperandBuilder<Member = R::Member> + ?Sized,
    W: Write,
{
    let mut offset = 0;
    while offset < code.len() {
        let start = offset;
        let opcode = read_opcode(code, start)?;
        writer.write_all(opcode.bytes())?;
        offset += opcode.size();

        let operand_type = opcode.operand_type();
        match operand_type {
            OperandType::InlineSwitch => {
                let count = LittleEndian::read_u32(slice(code, offset, 4, start)?) as usize;
                let table_size = count
                    .checked_mul(4)
                    .and_then(|size| size.checked_add(4))
                    .ok_or(Error::TruncatedInstruction { offset: start })?;
                writer.write_all(slice(code, offset, table_size, start)?)?;
                offset += table_size;
            }
            OperandType::InlineString => {
                let token = Token(LittleEndian::read_u32(slice(code, offset, 4, start)?));
                let token = match resolver.resolve_string(token) {
                    Some(string) => builder.string_token(&string),
                    None => token,
                };
                token.serialize(writer)?;
                offset += 4;
            }
            _ if operand_type.is_token() => {
                let token = Token(LittleEndian::read_u32(slice(code, offset, 4, start)?));
                remap_member(token, resolver, builder).serialize(writer)?;
                offset += 4;
            }
            _ => {
                let size = operand_type.size();
                writer.write_all(slice(code, offset, size, start)?)?;
                offset += size;
            }
        }
    }
    Ok(())
}

/// Copy an exception handler table to `writer`, rewriting the catch type tokens
///
/// Only typed `catch` clauses have a token in their last field (filters store an offset there),
/// so the other clauses are copied as-is. Bytes past the last whole record are copied too.
pub fn rewrite_exception_handlers<R, B, W>(
    data: &[u8],
    fat: bool,
    resolver: &R,
    builder: &mut B,
    writer: &mut W,
) -> Result<(), Error>
where
    R: OperandResolver + ?Sized,
    B: OperandBuilder<Member = R::Member> + ?Sized,
    W: Write,
{
    let record_size = if fat {
        FAT_EXCEPTION_HANDLER_SIZE
    } else {
        TINY_EXCEPTION_HANDLER_SIZE
    };
    let mut records = data.chunks_exact(record_size);
    for record in &mut records {
        let kind = if fat {
            LittleEndian::read_u32(&record[0..4])
        } else {
            LittleEndian::read_u16(&record[0..2]) as u32
        };
        let (fields, token) = record.split_at(record_size - 4);
        writer.write_all(fields)?;

        let token = Token(LittleEndian::read_u32(token));
        if kind == 0 {
            remap_member(token, resolver, builder).serialize(writer)?;
        } else {
            token.serialize(writer)?;
        }
    }
    writer.write_all(records.remainder())?;
    Ok(())
}

/// Rewrite the tokens of a whole method body
///
/// The header is kept as is, the code and exception handler sections are rewritten, and any
/// other sections are copied.
pub fn rewrite_method_body<R, B>(
    body: &RawMethodBody,
    resolver: &R,
    builder: &mut B,
) -> Result<RawMethodBody, Error>
where
    R: OperandResolver + ?Sized,
    B: OperandBuilder<Member = R::Member> + ?Sized,
{
    let mut code = Vec::with_capacity(body.code().len());
    rewrite_code(body.code(), resolver, builder, &mut code)?;

    match body {
        RawMethodBody::Tiny(_) => Ok(RawMethodBody::Tiny(TinyMethodBody::new(code)?)),
        RawMethodBody::Fat(fat) => {
            let mut extra_sections = Vec::with_capacity(fat.extra_sections.len());
            for section in &fat.extra_sections {
                if section.is_exception_handler_table() {
                    let mut data = Vec::with_capacity(section.data.len());
                    rewrite_exception_handlers(
                        &section.data,
                        section.is_fat(),
                        resolver,
                        builder,
                        &mut data,
                    )?;
                    extra_sections.push(ExtraSection::new(section.attributes, data));
                } else {
                    extra_sections.push(section.clone());
                }
            }
            Ok(RawMethodBody::Fat(FatMethodBody {
                code,
                extra_sections,
                ..fat.clone()
            }))
        }
    }
}

fn remap_member<R, B>(token: Token, resolver: &R, builder: &mut B) -> Token
where
    R: OperandResolver + ?Sized,
    B: OperandBuilder<Member = R::Member> + ?Sized,
{
    match resolver.resolve_member(token) {
        Some(member) => builder.member_token(&member),
        None => token,
    }
}

/// Bytes `offset..offset + len`, or an error blaming the instruction at `start`
fn slice(code: &[u8], offset: usize, len: usize, start: usize) -> Result<&[u8], Error> {
    offset
        .checked_add(len)
        .and_then(|end| code.get(offset..end))
        .ok_or(Error::TruncatedInstruction { offset: start })
}
