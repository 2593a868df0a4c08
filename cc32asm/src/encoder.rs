use libcc32::op::{
    Arith, ArithOp, BaseOp, Call, CallTarget, InOut, Int, LoadChar, LoadConst, LoadStore, Logic,
    LogicOp, Mov, Reg, RegOrImm, Shift, Words,
};

use crate::error::AsmError;
use crate::reloc::{RelocKind, RelocationEntry};
use crate::symtab::{SymbolTable, Visibility};
use crate::syntax::{self, Mnemonic};
use crate::tokenizer::{Token, Tokenizer};

/// Packs one instruction into machine code. `pc` is the byte offset
/// just past the first word of the instruction; pc-relative
/// displacements and the ldc relocation offsets are computed from it.
/// Pure with respect to the symbol table; relocation entries are
/// returned, not applied.
pub fn encode(
    mnemonic: Mnemonic,
    tokens: &mut Tokenizer,
    symbols: &SymbolTable,
    pc: i32,
) -> Result<(Words, Vec<RelocationEntry>), AsmError> {
    let cond = mnemonic.cond;
    let mut relocations = Vec::new();
    let words = match mnemonic.op {
        BaseOp::Int => {
            let token = next_operand(tokens, mnemonic)?;
            let n = syntax::parse_number(token.text)?;
            if !(0..=15).contains(&n) {
                return Err(AsmError::IntOperandOutOfRange(n));
            }
            expect_end(tokens, mnemonic)?;
            Words::Single(Int { cond, n: n as u8 }.encode())
        }
        BaseOp::Add | BaseOp::Sub | BaseOp::Mul | BaseOp::Div | BaseOp::Cmp => {
            let opcode = match mnemonic.op {
                BaseOp::Add => ArithOp::Add,
                BaseOp::Sub => ArithOp::Sub,
                BaseOp::Mul => ArithOp::Mul,
                BaseOp::Div => ArithOp::Div,
                _ => ArithOp::Cmp,
            };
            let dst = expect_register(tokens, mnemonic)?;
            check_arith_register(dst, opcode, mnemonic)?;
            let token = next_operand(tokens, mnemonic)?;
            let src = if syntax::is_register(token.text) {
                let src = syntax::parse_register(token.text)?;
                check_arith_register(src, opcode, mnemonic)?;
                RegOrImm::Reg(src)
            } else if syntax::is_constant(token.text) {
                RegOrImm::Imm(syntax::parse_constant(token.text)?)
            } else {
                return Err(operand_mismatch(mnemonic, "a register or constant", token));
            };
            expect_end(tokens, mnemonic)?;
            Words::Single(
                Arith {
                    cond,
                    opcode,
                    dst,
                    src,
                }
                .encode(),
            )
        }
        BaseOp::And | BaseOp::Or | BaseOp::Not | BaseOp::Test => {
            let opcode = match mnemonic.op {
                BaseOp::And => LogicOp::And,
                BaseOp::Or => LogicOp::Or,
                BaseOp::Not => LogicOp::Not,
                _ => LogicOp::Test,
            };
            let r1 = expect_register(tokens, mnemonic)?;
            check_not_in(r1, &[16, 17, 19], mnemonic)?;
            let r2 = expect_register(tokens, mnemonic)?;
            check_not_in(r2, &[16, 17, 19], mnemonic)?;
            expect_end(tokens, mnemonic)?;
            Words::Single(Logic { cond, opcode, r1, r2 }.encode())
        }
        BaseOp::Ldr | BaseOp::Str => {
            let load = mnemonic.op == BaseOp::Ldr;
            let dst = expect_register(tokens, mnemonic)?;
            let token = next_operand(tokens, mnemonic)?;
            if syntax::is_register(token.text) {
                let base = syntax::parse_register(token.text)?;
                check_not_in(base, &[19], mnemonic)?;
                // r16 as the target only makes sense in the label form
                check_not_in(dst, &[16], mnemonic)?;
                let amode = expect_constant(tokens, mnemonic)?;
                if !(2..=5).contains(&amode) {
                    return Err(AsmError::InvalidOperandSyntax {
                        mnemonic: mnemonic.to_string(),
                        expected: "an addressing mode between 2 and 5",
                        found: format!("#{}", amode),
                    });
                }
                let disp = expect_constant(tokens, mnemonic)?;
                expect_end(tokens, mnemonic)?;
                Words::Single(
                    LoadStore {
                        cond,
                        load,
                        base,
                        dst,
                        amode: amode as u8,
                        disp: (disp & 0x3FF) as u16,
                    }
                    .encode(),
                )
            } else {
                let (_, symbol) = symbols
                    .find(token.text)
                    .ok_or_else(|| AsmError::UndefinedSymbol(token.text.to_string()))?;
                let disp = (symbol.offset - pc) & 0x3FF;
                expect_end(tokens, mnemonic)?;
                Words::Single(
                    LoadStore {
                        cond,
                        load,
                        base: Reg::PC,
                        dst,
                        amode: 0,
                        disp: disp as u16,
                    }
                    .encode(),
                )
            }
        }
        BaseOp::Call => {
            let token = next_operand(tokens, mnemonic)?;
            // a symbol wins over a register-shaped name
            if let Some((_, symbol)) = symbols.find(token.text) {
                if symbol.visibility == Visibility::Global {
                    return Err(AsmError::CallRequiresLocalLabel(token.text.to_string()));
                }
                let disp = symbol.offset - pc;
                expect_end(tokens, mnemonic)?;
                Words::Single(
                    Call {
                        cond,
                        target: CallTarget::Displacement(disp),
                    }
                    .encode(),
                )
            } else if syntax::is_register(token.text) {
                let reg = syntax::parse_register(token.text)?;
                let imm = expect_constant(tokens, mnemonic)?;
                expect_end(tokens, mnemonic)?;
                Words::Single(
                    Call {
                        cond,
                        target: CallTarget::Register { reg, imm },
                    }
                    .encode(),
                )
            } else {
                return Err(AsmError::UndefinedSymbol(token.text.to_string()));
            }
        }
        BaseOp::In | BaseOp::Out => {
            let input = mnemonic.op == BaseOp::In;
            let r1 = expect_low_register(tokens, mnemonic)?;
            let r2 = expect_low_register(tokens, mnemonic)?;
            expect_end(tokens, mnemonic)?;
            Words::Single(InOut { cond, input, r1, r2 }.encode())
        }
        BaseOp::Mov => {
            let dst = expect_register(tokens, mnemonic)?;
            let token = next_operand(tokens, mnemonic)?;
            let src = if syntax::is_register(token.text) {
                RegOrImm::Reg(syntax::parse_register(token.text)?)
            } else if syntax::is_constant(token.text) {
                RegOrImm::Imm(syntax::parse_constant(token.text)?)
            } else {
                return Err(operand_mismatch(mnemonic, "a register or constant", token));
            };
            expect_end(tokens, mnemonic)?;
            Words::Single(Mov { cond, dst, src }.encode())
        }
        BaseOp::Shr | BaseOp::Shl => {
            let left = mnemonic.op == BaseOp::Shl;
            let dst = expect_register(tokens, mnemonic)?;
            let src = expect_register(tokens, mnemonic)?;
            let n = expect_constant(tokens, mnemonic)?;
            expect_end(tokens, mnemonic)?;
            Words::Single(
                Shift {
                    cond,
                    left,
                    dst,
                    src,
                    n: (n & 0x1F) as u8,
                }
                .encode(),
            )
        }
        BaseOp::Ldch | BaseOp::Ldcl => {
            let high = mnemonic.op == BaseOp::Ldch;
            let reg = expect_low_register(tokens, mnemonic)?;
            let imm = expect_constant(tokens, mnemonic)?;
            expect_end(tokens, mnemonic)?;
            Words::Single(LoadChar { cond, high, reg, imm }.encode())
        }
        BaseOp::Ldc => {
            let reg = expect_low_register(tokens, mnemonic)?;
            let token = next_operand(tokens, mnemonic)?;
            let value = if syntax::is_constant(token.text) {
                syntax::parse_constant(token.text)? as u32
            } else {
                let (ordinal, symbol) = symbols
                    .find(token.text)
                    .ok_or_else(|| AsmError::UndefinedSymbol(token.text.to_string()))?;
                match symbol.visibility {
                    Visibility::Local => {
                        relocations.push(RelocationEntry {
                            offset: pc - 2,
                            kind: RelocKind::R16High,
                            value: symbol.section,
                        });
                        relocations.push(RelocationEntry {
                            offset: pc + 2,
                            kind: RelocKind::R16Low,
                            value: symbol.section,
                        });
                        symbol.offset as u32
                    }
                    Visibility::Global => {
                        relocations.push(RelocationEntry {
                            offset: pc - 1,
                            kind: RelocKind::R16High,
                            value: ordinal,
                        });
                        relocations.push(RelocationEntry {
                            offset: pc + 3,
                            kind: RelocKind::R16Low,
                            value: ordinal,
                        });
                        0
                    }
                }
            };
            expect_end(tokens, mnemonic)?;
            Words::Double(LoadConst { cond, reg, value }.encode())
        }
    };
    Ok((words, relocations))
}

fn next_operand<'a>(tokens: &mut Tokenizer<'a>, mnemonic: Mnemonic) -> Result<Token<'a>, AsmError> {
    tokens
        .next_token()
        .ok_or_else(|| AsmError::MissingOperand(mnemonic.to_string()))
}

fn expect_register(tokens: &mut Tokenizer, mnemonic: Mnemonic) -> Result<Reg, AsmError> {
    let token = next_operand(tokens, mnemonic)?;
    if !syntax::is_register(token.text) {
        return Err(operand_mismatch(mnemonic, "a register", token));
    }
    syntax::parse_register(token.text)
}

/// A register that fits a 4-bit field (in/out and the constant loads).
fn expect_low_register(tokens: &mut Tokenizer, mnemonic: Mnemonic) -> Result<Reg, AsmError> {
    let reg = expect_register(tokens, mnemonic)?;
    if reg.index() > 15 {
        return Err(disallowed(reg, mnemonic));
    }
    Ok(reg)
}

fn expect_constant(tokens: &mut Tokenizer, mnemonic: Mnemonic) -> Result<i32, AsmError> {
    let token = next_operand(tokens, mnemonic)?;
    if !syntax::is_constant(token.text) {
        return Err(operand_mismatch(mnemonic, "a constant", token));
    }
    syntax::parse_constant(token.text)
}

fn expect_end(tokens: &mut Tokenizer, mnemonic: Mnemonic) -> Result<(), AsmError> {
    if tokens.next_token().is_some() {
        return Err(AsmError::TooManyOperands(mnemonic.to_string()));
    }
    Ok(())
}

fn operand_mismatch(mnemonic: Mnemonic, expected: &'static str, token: Token) -> AsmError {
    AsmError::InvalidOperandSyntax {
        mnemonic: mnemonic.to_string(),
        expected,
        found: token.text.to_string(),
    }
}

fn disallowed(reg: Reg, mnemonic: Mnemonic) -> AsmError {
    AsmError::DisallowedRegister {
        mnemonic: mnemonic.to_string(),
        register: format!("r{}", reg.index()),
    }
}

/// add/sub forbid the stack register; mul/div/cmp only take the low
/// sixteen registers.
fn check_arith_register(reg: Reg, opcode: ArithOp, mnemonic: Mnemonic) -> Result<(), AsmError> {
    let banned = match opcode {
        ArithOp::Add | ArithOp::Sub => reg.index() == 19,
        _ => reg.index() > 15,
    };
    if banned {
        return Err(disallowed(reg, mnemonic));
    }
    Ok(())
}

fn check_not_in(reg: Reg, banned: &[u8], mnemonic: Mnemonic) -> Result<(), AsmError> {
    if banned.contains(&reg.index()) {
        return Err(disallowed(reg, mnemonic));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lookup_mnemonic;

    fn encode_line(line: &str, symbols: &SymbolTable, pc: i32) -> Result<(Words, Vec<RelocationEntry>), AsmError> {
        let mut tokens = Tokenizer::new(line);
        let mnemonic = lookup_mnemonic(tokens.next_token().unwrap().text).unwrap();
        encode(mnemonic, &mut tokens, symbols, pc)
    }

    fn single(line: &str) -> u32 {
        let symbols = SymbolTable::new();
        match encode_line(line, &symbols, 4).unwrap() {
            (Words::Single(word), relocs) => {
                assert!(relocs.is_empty());
                word
            }
            _ => panic!("expected a single word"),
        }
    }

    #[test]
    fn immediate_move() {
        assert_eq!(single("moveq r1, #5"), 0x1E080A00);
    }

    #[test]
    fn register_move() {
        assert_eq!(single("moval r3, r7"), 0xFE19C000);
    }

    #[test]
    fn load_char_high() {
        assert_eq!(single("ldchal r1, #100"), 0xEF180064);
    }

    #[test]
    fn interrupt_range() {
        assert_eq!(single("intal 3") >> 20 & 0xF, 3);
        let symbols = SymbolTable::new();
        assert!(matches!(
            encode_line("intal 16", &symbols, 4),
            Err(AsmError::IntOperandOutOfRange(16))
        ));
    }

    #[test]
    fn arith_register_restrictions() {
        let symbols = SymbolTable::new();
        assert!(matches!(
            encode_line("addal r19, #1", &symbols, 4),
            Err(AsmError::DisallowedRegister { .. })
        ));
        assert!(matches!(
            encode_line("mulal r16, r1", &symbols, 4),
            Err(AsmError::DisallowedRegister { .. })
        ));
        // r16 is fine for add, just not for the multiplicative group
        assert!(encode_line("addal r16, #1", &symbols, 4).is_ok());
    }

    #[test]
    fn logic_register_restrictions() {
        let symbols = SymbolTable::new();
        for line in ["andal r16, r1", "oral r1, r17", "testal r19, r1"] {
            assert!(matches!(
                encode_line(line, &symbols, 4),
                Err(AsmError::DisallowedRegister { .. })
            ));
        }
    }

    #[test]
    fn load_label_form_is_pc_relative() {
        let mut symbols = SymbolTable::new();
        symbols.add_section(".text").unwrap();
        symbols
            .add_symbol("start", 1, 0, crate::symtab::Visibility::Local)
            .unwrap();
        let (words, relocs) = encode_line("ldral r2, start", &symbols, 4).unwrap();
        assert!(relocs.is_empty());
        assert_eq!(words, Words::Single(0xEA8087FC));
    }

    #[test]
    fn load_register_form_checks_mode() {
        let symbols = SymbolTable::new();
        let (words, _) = encode_line("stral r1, r2, #2, #8", &symbols, 4).unwrap();
        match words {
            Words::Single(word) => {
                assert_eq!(word >> 19 & 0x1F, 2); // base
                assert_eq!(word >> 14 & 0x1F, 1); // target
                assert_eq!(word >> 11 & 0x7, 2);
                assert_eq!(word & 0x3FF, 8);
                assert_eq!(word & (1 << 10), 0); // store
            }
            _ => panic!("expected a single word"),
        }
        assert!(matches!(
            encode_line("ldral r1, r2, #7, #8", &symbols, 4),
            Err(AsmError::InvalidOperandSyntax { .. })
        ));
        assert!(matches!(
            encode_line("ldral r16, r2, #2, #8", &symbols, 4),
            Err(AsmError::DisallowedRegister { .. })
        ));
    }

    #[test]
    fn call_requires_a_local_target() {
        let mut symbols = SymbolTable::new();
        symbols.add_section(".text").unwrap();
        symbols
            .add_symbol("near", 1, 0, crate::symtab::Visibility::Local)
            .unwrap();
        symbols
            .add_symbol("far", 0, 0, crate::symtab::Visibility::Global)
            .unwrap();

        let (words, _) = encode_line("calleq near", &symbols, 8).unwrap();
        assert_eq!(words, Words::Single(0x0C87FFF8));

        assert!(matches!(
            encode_line("calleq far", &symbols, 8),
            Err(AsmError::CallRequiresLocalLabel(_))
        ));
        assert!(matches!(
            encode_line("calleq nowhere", &symbols, 8),
            Err(AsmError::UndefinedSymbol(_))
        ));
    }

    #[test]
    fn call_register_form() {
        let word = single("callal r5, #12");
        assert_eq!(word >> 19 & 0x1F, 5);
        assert_eq!(word & 0x7FFFF, 12);
    }

    #[test]
    fn ldc_local_symbol_emits_section_relocations() {
        let mut symbols = SymbolTable::new();
        symbols.add_section(".data").unwrap();
        symbols
            .add_symbol("value", 1, 12, crate::symtab::Visibility::Local)
            .unwrap();
        let (words, relocs) = encode_line("ldcal r2, value", &symbols, 4).unwrap();
        assert_eq!(
            relocs,
            vec![
                RelocationEntry {
                    offset: 2,
                    kind: RelocKind::R16High,
                    value: 1
                },
                RelocationEntry {
                    offset: 6,
                    kind: RelocKind::R16Low,
                    value: 1
                },
            ]
        );
        match words {
            Words::Double([high, low]) => {
                assert_eq!(high & 0xFFFF, 0);
                assert_eq!(low & 0xFFFF, 12);
            }
            _ => panic!("expected a double word"),
        }
    }

    #[test]
    fn ldc_global_symbol_emits_ordinal_relocations() {
        let mut symbols = SymbolTable::new();
        symbols
            .add_symbol("ext", 0, 0, crate::symtab::Visibility::Global)
            .unwrap();
        symbols.add_section(".text").unwrap();
        // the section insert shifted ext to ordinal 2
        let (words, relocs) = encode_line("ldcal r1, ext", &symbols, 4).unwrap();
        assert_eq!(
            relocs,
            vec![
                RelocationEntry {
                    offset: 3,
                    kind: RelocKind::R16High,
                    value: 2
                },
                RelocationEntry {
                    offset: 7,
                    kind: RelocKind::R16Low,
                    value: 2
                },
            ]
        );
        assert_eq!(words, Words::Double([0xEF180000, 0xEF100000]));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let symbols = SymbolTable::new();
        assert!(matches!(
            encode_line("moveq r1, #5, r2", &symbols, 4),
            Err(AsmError::TooManyOperands(_))
        ));
        assert!(matches!(
            encode_line("moveq r1", &symbols, 4),
            Err(AsmError::MissingOperand(_))
        ));
    }
}
