use std::io;

use thiserror::Error;

/// Everything that can go wrong while assembling. The first failure
/// aborts the run; there is no recovery or partial output.
#[derive(Error, Debug)]
pub enum AsmError {
    #[error("cannot open input file {path}")]
    InputFile { path: String, source: io::Error },
    #[error("cannot create output file {path}")]
    OutputFile { path: String, source: io::Error },
    #[error("unknown directive {0}")]
    UnknownDirective(String),
    #[error("unknown instruction {0}")]
    UnknownInstruction(String),
    #[error("label {0} must be the first token on its line")]
    LabelNotFirst(String),
    #[error("symbol {0} is already defined")]
    DuplicateSymbol(String),
    #[error("missing operand for {0}")]
    MissingOperand(String),
    #[error("too many operands for {0}")]
    TooManyOperands(String),
    #[error("too many arguments for {0}")]
    TooManyArguments(String),
    #[error("interrupt number {0} is out of range (0..=15)")]
    IntOperandOutOfRange(i32),
    #[error(".public names undefined symbol {0}")]
    ExportOfUndefinedSymbol(String),
    #[error("invalid .char argument {0}")]
    InvalidCharArgument(String),
    #[error("invalid register {0}")]
    InvalidRegister(String),
    #[error("invalid constant {0}")]
    InvalidConstant(String),
    #[error("{mnemonic} expects {expected}, found {found}")]
    InvalidOperandSyntax {
        mnemonic: String,
        expected: &'static str,
        found: String,
    },
    #[error("register {register} cannot be used with {mnemonic}")]
    DisallowedRegister { mnemonic: String, register: String },
    #[error("call target {0} must be a local label")]
    CallRequiresLocalLabel(String),
    #[error("undefined symbol {0}")]
    UndefinedSymbol(String),
    #[error(".long requires at least one argument")]
    LongRequiresOperand,
    #[error("addition is not allowed on a constant")]
    AdditionOnConstant,
    #[error("code before any section directive")]
    CodeOutsideSection,
    #[error("syntax error at token {0}")]
    Syntax(String),
}
