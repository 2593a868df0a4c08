use std::env;
use std::fs;
use std::process;

use anyhow::{bail, Result};

use cc32asm::AsmError;

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let (Some(input), Some(output), None) = (args.next(), args.next(), args.next()) else {
        bail!("usage: cc32asm <input> <output>");
    };
    let source = fs::read_to_string(&input).map_err(|source| AsmError::InputFile {
        path: input.clone(),
        source,
    })?;
    let report = cc32asm::assemble_program(&source)?;
    fs::write(&output, report).map_err(|source| AsmError::OutputFile {
        path: output.clone(),
        source,
    })?;
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
