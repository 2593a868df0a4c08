use anyhow::{Context, Result};

use libcc32::op::Words;

use crate::encoder;
use crate::error::AsmError;
use crate::reloc::{RelocKind, RelocationEntry, RelocationTable};
use crate::report;
use crate::symtab::{SymbolTable, Visibility};
use crate::syntax::{self, Directive, Statement};
use crate::tokenizer::{Token, Tokenizer};

/// The code-generation pass. Re-walks the program with the finished
/// symbol table, mirroring pass one's location-counter arithmetic
/// exactly, and produces the textual object report.
pub fn pass_two(lines: &[&str], symbols: &mut SymbolTable) -> Result<String> {
    let mut pass = SecondPass {
        symbols,
        section: 0,
        section_name: String::new(),
        location_counter: 0,
        code: String::new(),
        output: String::new(),
        rtables: Vec::new(),
        done: false,
    };
    for (number, line) in lines.iter().enumerate() {
        pass.emit_line(line)
            .with_context(|| format!("pass two, line {}", number + 1))?;
        if pass.done {
            break;
        }
    }
    Ok(pass.finish())
}

struct SecondPass<'a> {
    symbols: &'a mut SymbolTable,
    section: u32,
    section_name: String,
    location_counter: i32,
    /// Hex digits of the current section's machine code.
    code: String,
    output: String,
    rtables: Vec<RelocationTable>,
    done: bool,
}

impl SecondPass<'_> {
    fn emit_line(&mut self, line: &str) -> Result<(), AsmError> {
        let mut tokens = Tokenizer::new(line);
        while let Some(token) = tokens.next_token() {
            if token.is_label {
                continue;
            }
            match syntax::classify(token.text)? {
                Statement::Section(name) => self.open_section(name)?,
                Statement::Directive(directive) => self.emit_directive(directive, &mut tokens)?,
                Statement::Mnemonic(mnemonic) => self.emit_instruction(mnemonic, &mut tokens)?,
            }
            break;
        }
        Ok(())
    }

    fn open_section(&mut self, name: &str) -> Result<(), AsmError> {
        self.flush_section();
        let ordinal = self
            .symbols
            .find(name)
            .map(|(ordinal, _)| ordinal)
            .ok_or_else(|| AsmError::UndefinedSymbol(name.to_string()))?;
        self.section = ordinal;
        self.section_name = name.to_string();
        self.location_counter = 0;
        self.code.clear();
        self.rtables.push(RelocationTable::new(name));
        Ok(())
    }

    fn emit_instruction(
        &mut self,
        mnemonic: syntax::Mnemonic,
        tokens: &mut Tokenizer,
    ) -> Result<(), AsmError> {
        self.require_section()?;
        self.location_counter += 4;
        let pc = self.location_counter;
        let (words, relocations) = encoder::encode(mnemonic, tokens, self.symbols, pc)?;
        for entry in relocations {
            self.rtables[(self.section - 1) as usize].push(entry);
        }
        match words {
            Words::Single(word) => self.code.push_str(&format!("{:08X}", word)),
            Words::Double([high, low]) => {
                self.location_counter += 4;
                self.code.push_str(&format!("{:08X}{:08X}", high, low));
            }
        }
        Ok(())
    }

    fn emit_directive(
        &mut self,
        directive: Directive,
        tokens: &mut Tokenizer,
    ) -> Result<(), AsmError> {
        match directive {
            Directive::Public => {
                while let Some(name) = tokens.next_token() {
                    let symbol = self.symbols.find_mut(name.text).ok_or_else(|| {
                        AsmError::ExportOfUndefinedSymbol(name.text.to_string())
                    })?;
                    symbol.visibility = Visibility::Global;
                }
            }
            // already registered in pass one
            Directive::Extern => {}
            Directive::Char => {
                self.require_section()?;
                while let Some(arg) = tokens.next_token() {
                    let mut chars = arg.text.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) if c.is_ascii_alphanumeric() => {
                            self.code.push_str(&format!("{:02X}", c as u32));
                            self.location_counter += 1;
                        }
                        _ => return Err(AsmError::InvalidCharArgument(arg.text.to_string())),
                    }
                }
            }
            Directive::Word => {
                self.require_section()?;
                while let Some(arg) = tokens.next_token() {
                    let value = syntax::parse_number(arg.text)?;
                    // the decimal digits double as hex nibbles on the
                    // wire, halves swapped
                    let digits = format!("{:0>4}", value.to_string());
                    let bytes = digits.as_bytes();
                    for &index in &[2usize, 3, 0, 1] {
                        self.code.push(bytes[index] as char);
                    }
                    self.location_counter += 2;
                }
            }
            Directive::Long => self.emit_long(tokens)?,
            Directive::Align => {
                self.require_section()?;
                let boundary = syntax::directive_argument(tokens, ".align")?;
                let modulo = self.location_counter % boundary;
                if modulo != 0 {
                    for _ in 0..(boundary - modulo) {
                        self.code.push_str("00");
                    }
                    self.location_counter += boundary - modulo;
                }
            }
            Directive::Skip => {
                self.require_section()?;
                let amount = syntax::directive_argument(tokens, ".skip")?;
                for _ in 0..amount {
                    self.code.push_str("00");
                }
                self.location_counter += amount;
            }
            Directive::End => {
                self.flush_section();
                self.done = true;
            }
        }
        Ok(())
    }

    fn emit_long(&mut self, tokens: &mut Tokenizer) -> Result<(), AsmError> {
        self.require_section()?;
        let args: Vec<Token> = tokens.collect();
        if args.is_empty() {
            return Err(AsmError::LongRequiresOperand);
        }
        let mut i = 0;
        while i < args.len() {
            let text = args[i].text;
            let next = args.get(i + 1).map(|t| t.text);
            let value: u32;
            if syntax::is_constant(text) {
                if matches!(next, Some("+") | Some("-")) {
                    return Err(AsmError::AdditionOnConstant);
                }
                value = syntax::parse_constant(text)? as u32;
                i += 1;
            } else {
                let first = self.lookup(text)?;
                if let Some(sign @ ("+" | "-")) = next {
                    let second_name = args
                        .get(i + 2)
                        .ok_or_else(|| AsmError::MissingOperand(".long".to_string()))?
                        .text;
                    let second = self.lookup(second_name)?;
                    value = self.combine(sign == "+", first, second);
                    i += 3;
                } else {
                    let offset = self.location_counter;
                    let (ordinal, section, sym_offset, visibility) = first;
                    value = match visibility {
                        Visibility::Local => {
                            self.push_reloc(offset, RelocKind::R32, section);
                            sym_offset as u32
                        }
                        Visibility::Global => {
                            self.push_reloc(offset, RelocKind::R32, ordinal);
                            0
                        }
                    };
                    i += 1;
                }
            }
            let hex = format!("{:08X}", value);
            let bytes = hex.as_bytes();
            for &index in &[6usize, 7, 4, 5, 2, 3, 0, 1] {
                self.code.push(bytes[index] as char);
            }
            self.location_counter += 4;
        }
        Ok(())
    }

    /// The `sym ± sym` relocation matrix: locals contribute their
    /// offsets and relocate against their sections, globals leave a
    /// zero placeholder and relocate against their ordinals, and a
    /// global subtrahend flips to the negative kind. Two locals
    /// subtracted resolve with no relocation at all.
    fn combine(
        &mut self,
        addition: bool,
        first: (u32, u32, i32, Visibility),
        second: (u32, u32, i32, Visibility),
    ) -> u32 {
        use Visibility::{Global, Local};
        let offset = self.location_counter;
        let (ord1, sec1, off1, vis1) = first;
        let (ord2, sec2, off2, vis2) = second;
        match (addition, vis1, vis2) {
            (true, Local, Local) => {
                self.push_reloc(offset, RelocKind::R32, sec1);
                self.push_reloc(offset, RelocKind::R32, sec2);
                (off1 + off2) as u32
            }
            (true, Global, Global) => {
                self.push_reloc(offset, RelocKind::R32, ord1);
                self.push_reloc(offset, RelocKind::R32, ord2);
                0
            }
            (true, Local, Global) => {
                self.push_reloc(offset, RelocKind::R32, sec1);
                self.push_reloc(offset, RelocKind::R32, ord2);
                off1 as u32
            }
            (true, Global, Local) => {
                self.push_reloc(offset, RelocKind::R32, sec2);
                self.push_reloc(offset, RelocKind::R32, ord1);
                off2 as u32
            }
            (false, Local, Local) => (off1 - off2) as u32,
            (false, Global, Global) => {
                self.push_reloc(offset, RelocKind::R32, ord1);
                self.push_reloc(offset, RelocKind::R32Negative, ord2);
                0
            }
            (false, Local, Global) => {
                self.push_reloc(offset, RelocKind::R32, sec1);
                self.push_reloc(offset, RelocKind::R32Negative, ord2);
                off1 as u32
            }
            (false, Global, Local) => {
                self.push_reloc(offset, RelocKind::R32Negative, sec2);
                self.push_reloc(offset, RelocKind::R32, ord1);
                (-off2) as u32
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<(u32, u32, i32, Visibility), AsmError> {
        self.symbols
            .find(name)
            .map(|(ordinal, symbol)| (ordinal, symbol.section, symbol.offset, symbol.visibility))
            .ok_or_else(|| AsmError::UndefinedSymbol(name.to_string()))
    }

    fn push_reloc(&mut self, offset: i32, kind: RelocKind, value: u32) {
        self.rtables[(self.section - 1) as usize].push(RelocationEntry {
            offset,
            kind,
            value,
        });
    }

    fn require_section(&self) -> Result<(), AsmError> {
        if self.section == 0 {
            return Err(AsmError::CodeOutsideSection);
        }
        Ok(())
    }

    fn flush_section(&mut self) {
        if self.section != 0 {
            self.output
                .push_str(&report::format_code_block(&self.section_name, &self.code));
        }
    }

    fn finish(mut self) -> String {
        // a program without .end still flushes its last section
        if !self.done {
            self.flush_section();
        }
        for table in &self.rtables {
            self.output.push_str(&table.to_string());
        }
        self.output.push_str(&self.symbols.to_string());
        self.output
    }
}
