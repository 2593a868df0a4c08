use std::fmt;

use crate::error::AsmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Local,
    Global,
}

impl Visibility {
    pub fn as_char(&self) -> char {
        match self {
            Visibility::Local => 'l',
            Visibility::Global => 'g',
        }
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub section: u32,
    pub offset: i32,
    pub visibility: Visibility,
}

/// All symbols of one compilation unit. A symbol's ordinal is its
/// position in the table. Ordinal 0 is the reserved sentinel row;
/// sections occupy a contiguous block starting at ordinal 1, in
/// declaration order, with every other symbol after them. Declaring a
/// new section therefore shifts all non-section symbols up by one.
#[derive(Debug)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    sections: u32,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            symbols: vec![Symbol {
                name: "UNDEFINED".to_string(),
                section: 0,
                offset: 0,
                visibility: Visibility::Local,
            }],
            sections: 0,
        }
    }

    /// Lookup by name. The sentinel row never matches.
    pub fn find(&self, name: &str) -> Option<(u32, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, symbol)| symbol.name == name)
            .map(|(ordinal, symbol)| (ordinal as u32, symbol))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.symbols
            .iter_mut()
            .skip(1)
            .find(|symbol| symbol.name == name)
    }

    pub fn add_symbol(
        &mut self,
        name: &str,
        section: u32,
        offset: i32,
        visibility: Visibility,
    ) -> Result<u32, AsmError> {
        if self.find(name).is_some() {
            return Err(AsmError::DuplicateSymbol(name.to_string()));
        }
        self.symbols.push(Symbol {
            name: name.to_string(),
            section,
            offset,
            visibility,
        });
        Ok((self.symbols.len() - 1) as u32)
    }

    /// Declares a new section, inserting it right after the previous
    /// last section so the section block stays contiguous.
    pub fn add_section(&mut self, name: &str) -> Result<u32, AsmError> {
        if self.find(name).is_some() {
            return Err(AsmError::DuplicateSymbol(name.to_string()));
        }
        let ordinal = self.sections + 1;
        self.symbols.insert(
            ordinal as usize,
            Symbol {
                name: name.to_string(),
                section: ordinal,
                offset: 0,
                visibility: Visibility::Local,
            },
        );
        self.sections = ordinal;
        Ok(ordinal)
    }

    /// Ordinal of the most recently declared section, 0 if none.
    pub fn section_count(&self) -> u32 {
        self.sections
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>10}{:>15}{:>10}{:>10}{:>15}\n\n",
            "SymbolNo", "SymbolName", "Section", "Offset", "Visibility"
        )?;
        for (ordinal, symbol) in self.symbols.iter().enumerate() {
            writeln!(
                f,
                "{:>10}{:>15}{:>10}{:>10}{:>15}",
                ordinal,
                symbol.name,
                symbol.section,
                symbol.offset,
                symbol.visibility.as_char()
            )?;
        }
        Ok(())
    }
}
