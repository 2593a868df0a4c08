use anyhow::{Context, Result};

use crate::error::AsmError;
use crate::symtab::{SymbolTable, Visibility};
use crate::syntax::{self, Directive, Statement};
use crate::tokenizer::Tokenizer;

/// The discovery pass. Walks the program once, sizing every
/// construct without encoding anything, and leaves behind the
/// complete symbol table with final offsets.
pub struct FirstPass {
    symbols: SymbolTable,
    section: u32,
    location_counter: i32,
    done: bool,
}

impl FirstPass {
    pub fn scan_lines(lines: &[&str]) -> Result<SymbolTable> {
        let mut pass = FirstPass {
            symbols: SymbolTable::new(),
            section: 0,
            location_counter: 0,
            done: false,
        };
        for (number, line) in lines.iter().enumerate() {
            pass.scan_line(line)
                .with_context(|| format!("pass one, line {}", number + 1))?;
            if pass.done {
                break;
            }
        }
        Ok(pass.symbols)
    }

    fn scan_line(&mut self, line: &str) -> Result<(), AsmError> {
        let mut tokens = Tokenizer::new(line);
        let mut first = true;
        while let Some(token) = tokens.next_token() {
            if token.is_label {
                if !first {
                    return Err(AsmError::LabelNotFirst(token.text.to_string()));
                }
                self.symbols.add_symbol(
                    token.text,
                    self.section,
                    self.location_counter,
                    Visibility::Local,
                )?;
                first = false;
                continue;
            }
            match syntax::classify(token.text)? {
                Statement::Section(name) => {
                    self.section = self.symbols.add_section(name)?;
                    self.location_counter = 0;
                }
                Statement::Directive(directive) => self.scan_directive(directive, &mut tokens)?,
                Statement::Mnemonic(mnemonic) => {
                    self.location_counter += mnemonic.op.size() as i32;
                }
            }
            // the statement handler owns the rest of the line
            break;
        }
        Ok(())
    }

    fn scan_directive(
        &mut self,
        directive: Directive,
        tokens: &mut Tokenizer,
    ) -> Result<(), AsmError> {
        match directive {
            // visibility promotion happens in pass two
            Directive::Public => {}
            Directive::Extern => {
                while let Some(name) = tokens.next_token() {
                    self.symbols.add_symbol(name.text, 0, 0, Visibility::Global)?;
                }
            }
            Directive::Char => {
                while tokens.next_token().is_some() {
                    self.location_counter += 1;
                }
            }
            Directive::Word => {
                while tokens.next_token().is_some() {
                    self.location_counter += 2;
                }
            }
            Directive::Long => {
                self.location_counter += 4 * (tokens.comma_count() as i32 + 1);
            }
            Directive::Align => {
                let boundary = syntax::directive_argument(tokens, ".align")?;
                let modulo = self.location_counter % boundary;
                if modulo != 0 {
                    self.location_counter += boundary - modulo;
                }
            }
            Directive::Skip => {
                let amount = syntax::directive_argument(tokens, ".skip")?;
                if tokens.next_token().is_some() {
                    return Err(AsmError::TooManyArguments(".skip".to_string()));
                }
                self.location_counter += amount;
            }
            Directive::End => self.done = true,
        }
        Ok(())
    }
}
