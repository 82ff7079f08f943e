use cilcodec::cil::{
    self, reassembler, Assembler, AssemblerSettings, CollectAll, ExceptionHandler, MethodBody,
    RawMethodBody, RawOperands,
};

use clap::{value_parser, Arg, ArgAction, Command};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

fn main() -> Result<(), cil::Error> {
    env_logger::init();

    let matches = Command::new("CIL method body dumper")
        .version(clap::crate_version!())
        .about("Print the header, exception handlers, and instructions of a CIL method body")
        .arg(
            Arg::new("offset")
                .long("offset")
                .value_name("BYTES")
                .value_parser(value_parser!(usize))
                .default_value("0")
                .help("Position of the method body in the input file"),
        )
        .arg(
            Arg::new("code only")
                .long("code-only")
                .action(ArgAction::SetTrue)
                .help("Input is instruction bytes, without a method body header"),
        )
        .arg(
            Arg::new("verify")
                .long("verify")
                .action(ArgAction::SetTrue)
                .help("Reassemble the instructions and check the bytes come out the same"),
        )
        .arg(
            Arg::new("INPUT")
                .help("File containing the method body")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .get_matches();

    let input = matches
        .get_one::<PathBuf>("INPUT")
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "missing input file"))?;
    let offset = matches.get_one::<usize>("offset").copied().unwrap_or(0);

    log::info!("Reading '{}'", input.display());
    let bytes = fs::read(input)?;
    let data = bytes.get(offset..).ok_or(cil::Error::TruncatedMethodBody {
        expected: offset,
        available: bytes.len(),
    })?;

    let raw = if matches.get_flag("code only") {
        None
    } else {
        Some(RawMethodBody::read(data)?)
    };
    let code = match &raw {
        Some(raw) => raw.code(),
        None => data,
    };

    let body: MethodBody = match &raw {
        Some(raw) => {
            print_header(raw);
            MethodBody::from_raw(raw, RawOperands::new())?
        }
        None => MethodBody::new(8, cil::disassemble(code, RawOperands::new())?),
    };

    for handler in &body.exception_handlers {
        println!("  {}", describe_handler(handler));
    }
    for instruction in &body.instructions {
        println!("  {}", instruction);
    }

    if matches.get_flag("verify") && !verify(&body, raw.as_ref(), code)? {
        process::exit(1);
    }

    Ok(())
}

fn print_header(raw: &RawMethodBody) {
    println!("{:?} method body, {} bytes", raw.format(), raw.size());
    println!("  code size:   {}", raw.code().len());
    println!("  max stack:   {}", raw.max_stack());
    match raw.local_var_sig_token() {
        Some(token) => println!("  locals:      {}", token),
        None => println!("  locals:      none"),
    }
    println!("  init locals: {}", raw.init_locals());
    for section in raw.extra_sections() {
        println!(
            "  section:     {:?}, {} bytes",
            section.attributes,
            section.size()
        );
    }
}

/// One line summary of a handler
fn describe_handler(handler: &ExceptionHandler) -> String {
    format!(
        "{:?} try IL_{:04X}..IL_{:04X} handler IL_{:04X}..IL_{:04X} ({:#010X})",
        handler.kind,
        handler.try_offset,
        handler.try_end(),
        handler.handler_offset,
        handler.handler_end(),
        handler.class_token_or_filter_offset,
    )
}

/// Re-encode the body both ways and compare with the input, returning whether everything matched
fn verify(
    body: &MethodBody,
    raw: Option<&RawMethodBody>,
    code: &[u8],
) -> Result<bool, cil::Error> {
    let mut assembler = Assembler::with_listener(RawOperands::new(), CollectAll)
        .with_settings(AssemblerSettings::new("input"));
    for diagnostic in body.verify_labels(assembler.settings(), CollectAll)? {
        println!("warning: {}", diagnostic);
    }
    let assembled = assembler.assemble(&body.instructions)?;
    for diagnostic in &assembled.diagnostics {
        println!("warning: {}", diagnostic);
    }
    let mut matched = report("assembled code", code, &assembled.code);

    if let Some(raw) = raw {
        let original = raw.to_bytes()?;

        let (reframed, _) = body.to_raw(&mut assembler)?;
        if reframed.format() != raw.format() {
            println!(
                "note: body would be re-framed as {:?} instead of {:?}",
                reframed.format(),
                raw.format()
            );
        } else {
            matched &= report("re-framed body", &original, &reframed.to_bytes()?);
        }

        let rewritten =
            reassembler::rewrite_method_body(raw, &RawOperands::new(), &mut RawOperands::new())?;
        matched &= report("token rewrite", &original, &rewritten.to_bytes()?);
    }
    Ok(matched)
}

fn report(what: &str, expected: &[u8], found: &[u8]) -> bool {
    let mismatch = expected
        .iter()
        .zip(found)
        .position(|(e, f)| e != f)
        .or_else(|| (expected.len() != found.len()).then(|| expected.len().min(found.len())));
    match mismatch {
        None => {
            println!("{}: identical ({} bytes)", what, expected.len());
            true
        }
        Some(offset) => {
            println!("{}: differs at byte {:#X}", what, offset);
            false
        }
    }
}
