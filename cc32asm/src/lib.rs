use anyhow::Result;

use pass_one::FirstPass;

pub mod encoder;
pub mod error;
mod pass_one;
mod pass_two;
pub mod reloc;
mod report;
pub mod symtab;
pub mod syntax;
pub mod tokenizer;

pub use error::AsmError;

/// Assemble a program from text into its textual object report:
/// per-section machine code, per-section relocation tables, and the
/// symbol table.
///
/// # Errors
///
/// If there's an error in the assembly code
pub fn assemble_program(program_text: &str) -> Result<String> {
    let lines = program_text.lines().collect::<Vec<_>>();
    let mut symbols = FirstPass::scan_lines(&lines)?;
    pass_two::pass_two(&lines, &mut symbols)
}
