use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use regex::Regex;
use strum::IntoEnumIterator;

use libcc32::op::{BaseOp, Condition, Reg};

use crate::error::AsmError;
use crate::tokenizer::Tokenizer;

/// A fully resolved instruction name: base operation plus condition
/// suffix, e.g. `moveq` or `callal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mnemonic {
    pub op: BaseOp,
    pub cond: Condition,
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.mnemonic(), self.cond.suffix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Public,
    Extern,
    Char,
    Word,
    Long,
    Align,
    Skip,
    End,
}

/// Classification of a statement-position token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement<'a> {
    Section(&'a str),
    Directive(Directive),
    Mnemonic(Mnemonic),
}

static MNEMONICS: OnceCell<IndexMap<String, Mnemonic>> = OnceCell::new();

fn mnemonics() -> &'static IndexMap<String, Mnemonic> {
    MNEMONICS.get_or_init(|| {
        let mut table = IndexMap::new();
        for op in BaseOp::iter() {
            for cond in Condition::iter() {
                let mnemonic = Mnemonic { op, cond };
                table.insert(mnemonic.to_string(), mnemonic);
            }
        }
        table
    })
}

pub fn lookup_mnemonic(text: &str) -> Option<Mnemonic> {
    mnemonics().get(text).copied()
}

/// A section token is anything starting with one of the three section
/// prefixes, so suffixed sections like `.text1` are legal.
const SECTION_PREFIXES: [&str; 3] = [".text", ".data", ".bss"];

pub fn classify(token: &str) -> Result<Statement<'_>, AsmError> {
    if let Some(name) = token.strip_prefix('.') {
        let directive = match name {
            "public" => Directive::Public,
            "extern" => Directive::Extern,
            "char" => Directive::Char,
            "word" => Directive::Word,
            "long" => Directive::Long,
            "align" => Directive::Align,
            "skip" => Directive::Skip,
            "end" => Directive::End,
            _ => {
                if SECTION_PREFIXES.iter().any(|p| token.starts_with(p)) {
                    return Ok(Statement::Section(token));
                }
                return Err(AsmError::UnknownDirective(token.to_string()));
            }
        };
        return Ok(Statement::Directive(directive));
    }
    if let Some(mnemonic) = lookup_mnemonic(token) {
        return Ok(Statement::Mnemonic(mnemonic));
    }
    if !token.is_empty() && token.chars().all(|c| c.is_ascii_alphabetic()) {
        Err(AsmError::UnknownInstruction(token.to_string()))
    } else {
        Err(AsmError::Syntax(token.to_string()))
    }
}

static REGISTER: OnceCell<Regex> = OnceCell::new();
static CONSTANT: OnceCell<Regex> = OnceCell::new();

fn register_regex() -> &'static Regex {
    REGISTER.get_or_init(|| Regex::new(r"^[rR]([0-9]{1,3})$").unwrap())
}

fn constant_regex() -> &'static Regex {
    CONSTANT.get_or_init(|| Regex::new(r"^#(-?[0-9]+)$").unwrap())
}

pub fn is_register(token: &str) -> bool {
    register_regex().is_match(token)
}

pub fn is_constant(token: &str) -> bool {
    token.starts_with('#')
}

pub fn parse_register(token: &str) -> Result<Reg, AsmError> {
    register_regex()
        .captures(token)
        .and_then(|caps| caps[1].parse::<u8>().ok())
        .and_then(Reg::new)
        .ok_or_else(|| AsmError::InvalidRegister(token.to_string()))
}

pub fn parse_constant(token: &str) -> Result<i32, AsmError> {
    constant_regex()
        .captures(token)
        .and_then(|caps| caps[1].parse::<i32>().ok())
        .ok_or_else(|| AsmError::InvalidConstant(token.to_string()))
}

/// A bare integer argument, as taken by `.word`, `.align`, `.skip`
/// and `int`. A leading `#` is accepted for uniformity with operand
/// constants.
pub fn parse_number(token: &str) -> Result<i32, AsmError> {
    let digits = token.strip_prefix('#').unwrap_or(token);
    digits
        .parse::<i32>()
        .map_err(|_| AsmError::InvalidConstant(token.to_string()))
}

/// The single positive integer argument of `.align` and `.skip`.
pub fn directive_argument(tokens: &mut Tokenizer, directive: &str) -> Result<i32, AsmError> {
    let token = tokens
        .next_token()
        .ok_or_else(|| AsmError::MissingOperand(directive.to_string()))?;
    let value = parse_number(token.text)?;
    if value <= 0 {
        return Err(AsmError::InvalidConstant(token.text.to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_full_mnemonic_set_is_built() {
        assert_eq!(mnemonics().len(), 147);
        let m = lookup_mnemonic("moveq").unwrap();
        assert_eq!(m.op, BaseOp::Mov);
        assert_eq!(m.cond, Condition::Eq);
        assert!(lookup_mnemonic("mov").is_none());
        assert!(lookup_mnemonic("ldchal").is_some());
        assert!(lookup_mnemonic("ldcal").is_some());
    }

    #[test]
    fn sections_match_by_prefix() {
        assert!(matches!(classify(".text"), Ok(Statement::Section(".text"))));
        assert!(matches!(
            classify(".text1"),
            Ok(Statement::Section(".text1"))
        ));
        assert!(matches!(classify(".bss"), Ok(Statement::Section(".bss"))));
        assert!(matches!(
            classify(".rodata"),
            Err(AsmError::UnknownDirective(_))
        ));
    }

    #[test]
    fn directives_match_exactly() {
        assert!(matches!(
            classify(".skip"),
            Ok(Statement::Directive(Directive::Skip))
        ));
        assert!(matches!(
            classify(".public"),
            Ok(Statement::Directive(Directive::Public))
        ));
    }

    #[test]
    fn registers_are_strictly_checked() {
        assert_eq!(parse_register("r0").unwrap().index(), 0);
        assert_eq!(parse_register("R19").unwrap().index(), 19);
        assert!(parse_register("r20").is_err());
        // an identifier starting with r is not a register
        assert!(!is_register("result"));
    }

    #[test]
    fn constants_require_the_hash_prefix() {
        assert_eq!(parse_constant("#5").unwrap(), 5);
        assert_eq!(parse_constant("#-12").unwrap(), -12);
        assert!(parse_constant("#").is_err());
        assert!(parse_constant("#x").is_err());
        assert!(!is_constant("5"));
    }

    #[test]
    fn unclassifiable_tokens_fail() {
        assert!(matches!(
            classify("movxy"),
            Err(AsmError::UnknownInstruction(_))
        ));
        assert!(matches!(classify("12ab"), Err(AsmError::Syntax(_))));
    }
}
