use num::FromPrimitive;
use num_derive::FromPrimitive;
use strum_macros::EnumIter;

/// Condition suffix of a mnemonic. The 3-bit condition field maps
/// indices 0-5 directly; `al` encodes as 7, leaving code 6 reserved.
#[derive(FromPrimitive, EnumIter, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Eq = 0,
    Ne = 1,
    Gt = 2,
    Ge = 3,
    Lt = 4,
    Le = 5,
    Al = 6,
}

impl Condition {
    pub fn suffix(&self) -> &'static str {
        match self {
            Condition::Eq => "eq",
            Condition::Ne => "ne",
            Condition::Gt => "gt",
            Condition::Ge => "ge",
            Condition::Lt => "lt",
            Condition::Le => "le",
            Condition::Al => "al",
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Condition::Al => 7,
            c => *c as u32,
        }
    }

    pub fn from_code(code: u32) -> Option<Condition> {
        match code {
            7 => Some(Condition::Al),
            6 => None,
            c => FromPrimitive::from_u32(c),
        }
    }
}

/// The 21 base operations. Concatenated with a condition suffix they
/// form the 147 mnemonics of the assembly language.
#[derive(EnumIter, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseOp {
    Int,
    Add,
    Sub,
    Mul,
    Div,
    Cmp,
    And,
    Or,
    Not,
    Test,
    Ldr,
    Str,
    Call,
    In,
    Out,
    Mov,
    Shr,
    Shl,
    Ldch,
    Ldcl,
    Ldc,
}

impl BaseOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            BaseOp::Int => "int",
            BaseOp::Add => "add",
            BaseOp::Sub => "sub",
            BaseOp::Mul => "mul",
            BaseOp::Div => "div",
            BaseOp::Cmp => "cmp",
            BaseOp::And => "and",
            BaseOp::Or => "or",
            BaseOp::Not => "not",
            BaseOp::Test => "test",
            BaseOp::Ldr => "ldr",
            BaseOp::Str => "str",
            BaseOp::Call => "call",
            BaseOp::In => "in",
            BaseOp::Out => "out",
            BaseOp::Mov => "mov",
            BaseOp::Shr => "shr",
            BaseOp::Shl => "shl",
            BaseOp::Ldch => "ldch",
            BaseOp::Ldcl => "ldcl",
            BaseOp::Ldc => "ldc",
        }
    }

    /// Size in bytes of the encoded instruction. Only the double-word
    /// load-constant form takes two words.
    pub fn size(&self) -> u32 {
        match self {
            BaseOp::Ldc => 8,
            _ => 4,
        }
    }
}

/// A general-purpose register, r0 through r19.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reg(u8);

impl Reg {
    pub const COUNT: u8 = 20;

    /// Index 16 doubles as the pc-relative marker in the base-register
    /// field of the load/store and call formats.
    pub const PC: Reg = Reg(16);

    pub fn new(index: u8) -> Option<Reg> {
        (index < Self::COUNT).then(|| Reg(index))
    }

    pub fn index(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegOrImm {
    Reg(Reg),
    Imm(i32),
}

#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add = 1,
    Sub = 2,
    Mul = 3,
    Div = 4,
    Cmp = 5,
}

#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And = 6,
    Or = 7,
    Not = 8,
    Test = 9,
}

const LOAD_STORE_OPCODE: u32 = 10;
const CALL_OPCODE: u32 = 12;
const IN_OUT_OPCODE: u32 = 13;
const MOV_SHIFT_OPCODE: u32 = 14;
const LOAD_OPCODE: u32 = 15;

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

fn reg_field(word: u32, shift: u32) -> Option<Reg> {
    Reg::new(((word >> shift) & 0x1F) as u8)
}

/// Software interrupt: cond(3) | 0(9) | n(4) | 0(20).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Int {
    pub cond: Condition,
    pub n: u8,
}

impl Int {
    pub fn encode(&self) -> u32 {
        (self.cond.code() << 29) | (((self.n & 0x0F) as u32) << 20)
    }

    pub fn decode(word: u32) -> Option<Self> {
        let cond = Condition::from_code(word >> 29)?;
        Some(Int {
            cond,
            n: ((word >> 20) & 0x0F) as u8,
        })
    }
}

/// Arithmetic/compare: cond(3) | 1 | opcode(4) | dst(5) | imm?(1),
/// then either src(5) | 0(13) or an 18-bit immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arith {
    pub cond: Condition,
    pub opcode: ArithOp,
    pub dst: Reg,
    pub src: RegOrImm,
}

impl Arith {
    pub fn encode(&self) -> u32 {
        let mut word = (self.cond.code() << 29)
            | (1 << 28)
            | ((self.opcode as u32) << 24)
            | ((self.dst.index() as u32) << 19);
        match self.src {
            RegOrImm::Reg(r) => word |= (r.index() as u32) << 13,
            RegOrImm::Imm(v) => word |= (1 << 18) | ((v as u32) & 0x3FFFF),
        }
        word
    }

    pub fn decode(word: u32) -> Option<Self> {
        let cond = Condition::from_code(word >> 29)?;
        if word & (1 << 28) == 0 {
            return None;
        }
        let opcode = FromPrimitive::from_u32((word >> 24) & 0x0F)?;
        let dst = reg_field(word, 19)?;
        let src = if word & (1 << 18) != 0 {
            RegOrImm::Imm(sign_extend(word & 0x3FFFF, 18))
        } else {
            RegOrImm::Reg(reg_field(word, 13)?)
        };
        Some(Arith {
            cond,
            opcode,
            dst,
            src,
        })
    }
}

/// Logic/test group: cond(3) | 1 | opcode(4) | r1(5) | r2(5) | 0(14).
/// No immediate form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Logic {
    pub cond: Condition,
    pub opcode: LogicOp,
    pub r1: Reg,
    pub r2: Reg,
}

impl Logic {
    pub fn encode(&self) -> u32 {
        (self.cond.code() << 29)
            | (1 << 28)
            | ((self.opcode as u32) << 24)
            | ((self.r1.index() as u32) << 19)
            | ((self.r2.index() as u32) << 14)
    }

    pub fn decode(word: u32) -> Option<Self> {
        let cond = Condition::from_code(word >> 29)?;
        if word & (1 << 28) == 0 {
            return None;
        }
        let opcode = FromPrimitive::from_u32((word >> 24) & 0x0F)?;
        Some(Logic {
            cond,
            opcode,
            r1: reg_field(word, 19)?,
            r2: reg_field(word, 14)?,
        })
    }
}

/// Load/store: cond(3) | 10(5) | base(5) | dst(5) | amode(3) | ldr?(1)
/// | disp(10). The pc-relative label form carries base 16 and amode 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStore {
    pub cond: Condition,
    pub load: bool,
    pub base: Reg,
    pub dst: Reg,
    pub amode: u8,
    pub disp: u16,
}

impl LoadStore {
    pub fn encode(&self) -> u32 {
        (self.cond.code() << 29)
            | (LOAD_STORE_OPCODE << 24)
            | ((self.base.index() as u32) << 19)
            | ((self.dst.index() as u32) << 14)
            | (((self.amode & 0x07) as u32) << 11)
            | ((self.load as u32) << 10)
            | ((self.disp & 0x3FF) as u32)
    }

    pub fn decode(word: u32) -> Option<Self> {
        let cond = Condition::from_code(word >> 29)?;
        if (word >> 24) & 0x1F != LOAD_STORE_OPCODE {
            return None;
        }
        Some(LoadStore {
            cond,
            load: word & (1 << 10) != 0,
            base: reg_field(word, 19)?,
            dst: reg_field(word, 14)?,
            amode: ((word >> 11) & 0x07) as u8,
            disp: (word & 0x3FF) as u16,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    /// pc-relative displacement to a resolved local label.
    Displacement(i32),
    Register { reg: Reg, imm: i32 },
}

/// Call: cond(3) | 12(5) | reg(5) | disp(19); reg 16 selects the
/// pc-relative label form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    pub cond: Condition,
    pub target: CallTarget,
}

impl Call {
    pub fn encode(&self) -> u32 {
        let word = (self.cond.code() << 29) | (CALL_OPCODE << 24);
        match self.target {
            CallTarget::Displacement(disp) => {
                word | ((Reg::PC.index() as u32) << 19) | ((disp as u32) & 0x7FFFF)
            }
            CallTarget::Register { reg, imm } => {
                word | ((reg.index() as u32) << 19) | ((imm as u32) & 0x7FFFF)
            }
        }
    }

    pub fn decode(word: u32) -> Option<Self> {
        let cond = Condition::from_code(word >> 29)?;
        if (word >> 24) & 0x1F != CALL_OPCODE {
            return None;
        }
        let reg = reg_field(word, 19)?;
        let value = sign_extend(word & 0x7FFFF, 19);
        let target = if reg == Reg::PC {
            CallTarget::Displacement(value)
        } else {
            CallTarget::Register { reg, imm: value }
        };
        Some(Call { cond, target })
    }
}

/// I/O: cond(3) | 13(5) | r1(4) | r2(4) | in?(1) | 0(15).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InOut {
    pub cond: Condition,
    pub input: bool,
    pub r1: Reg,
    pub r2: Reg,
}

impl InOut {
    pub fn encode(&self) -> u32 {
        (self.cond.code() << 29)
            | (IN_OUT_OPCODE << 24)
            | (((self.r1.index() & 0x0F) as u32) << 20)
            | (((self.r2.index() & 0x0F) as u32) << 16)
            | ((self.input as u32) << 15)
    }

    pub fn decode(word: u32) -> Option<Self> {
        let cond = Condition::from_code(word >> 29)?;
        if (word >> 24) & 0x1F != IN_OUT_OPCODE {
            return None;
        }
        Some(InOut {
            cond,
            input: word & (1 << 15) != 0,
            r1: Reg::new(((word >> 20) & 0x0F) as u8)?,
            r2: Reg::new(((word >> 16) & 0x0F) as u8)?,
        })
    }
}

/// Move: cond(3) | 1 | 14(4) | dst(5), then src(5) | 0(14) for the
/// register form or imm(10) | 0(9) for the immediate form. The format
/// carries no discriminator bit; an immediate that is a multiple of 32
/// is indistinguishable from a register source, so `decode` reads such
/// words as the register form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mov {
    pub cond: Condition,
    pub dst: Reg,
    pub src: RegOrImm,
}

impl Mov {
    pub fn encode(&self) -> u32 {
        let word = (self.cond.code() << 29)
            | (1 << 28)
            | (MOV_SHIFT_OPCODE << 24)
            | ((self.dst.index() as u32) << 19);
        match self.src {
            RegOrImm::Reg(r) => word | ((r.index() as u32) << 14),
            RegOrImm::Imm(v) => word | (((v as u32) & 0x3FF) << 9),
        }
    }

    pub fn decode(word: u32) -> Option<Self> {
        let cond = Condition::from_code(word >> 29)?;
        if word & (1 << 28) == 0 || (word >> 24) & 0x0F != MOV_SHIFT_OPCODE {
            return None;
        }
        let dst = reg_field(word, 19)?;
        let src = if (word >> 9) & 0x1F != 0 {
            RegOrImm::Imm(((word >> 9) & 0x3FF) as i32)
        } else {
            RegOrImm::Reg(reg_field(word, 14)?)
        };
        Some(Mov { cond, dst, src })
    }
}

/// Shift: cond(3) | 1 | 14(4) | dst(5) | src(5) | n(5) | shl?(1) | 0(8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub cond: Condition,
    pub left: bool,
    pub dst: Reg,
    pub src: Reg,
    pub n: u8,
}

impl Shift {
    pub fn encode(&self) -> u32 {
        (self.cond.code() << 29)
            | (1 << 28)
            | (MOV_SHIFT_OPCODE << 24)
            | ((self.dst.index() as u32) << 19)
            | ((self.src.index() as u32) << 14)
            | (((self.n & 0x1F) as u32) << 9)
            | ((self.left as u32) << 8)
    }

    pub fn decode(word: u32) -> Option<Self> {
        let cond = Condition::from_code(word >> 29)?;
        if word & (1 << 28) == 0 || (word >> 24) & 0x0F != MOV_SHIFT_OPCODE {
            return None;
        }
        Some(Shift {
            cond,
            left: word & (1 << 8) != 0,
            dst: reg_field(word, 19)?,
            src: reg_field(word, 14)?,
            n: ((word >> 9) & 0x1F) as u8,
        })
    }
}

/// Load half-constant: cond(3) | 15(5) | reg(4) | high?(1) | imm(19).
/// `ldch` targets the high half-word, `ldcl` the low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadChar {
    pub cond: Condition,
    pub high: bool,
    pub reg: Reg,
    pub imm: i32,
}

impl LoadChar {
    pub fn encode(&self) -> u32 {
        (self.cond.code() << 29)
            | (LOAD_OPCODE << 24)
            | (((self.reg.index() & 0x0F) as u32) << 20)
            | ((self.high as u32) << 19)
            | ((self.imm as u32) & 0x7FFFF)
    }

    pub fn decode(word: u32) -> Option<Self> {
        let cond = Condition::from_code(word >> 29)?;
        if (word >> 24) & 0x1F != LOAD_OPCODE {
            return None;
        }
        Some(LoadChar {
            cond,
            high: word & (1 << 19) != 0,
            reg: Reg::new(((word >> 20) & 0x0F) as u8)?,
            imm: sign_extend(word & 0x7FFFF, 19),
        })
    }
}

/// Double-word load-constant: two words sharing the cond/opcode/reg
/// prefix. The first word sets the high flag and carries bits 31..16
/// of the value, the second carries bits 15..0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadConst {
    pub cond: Condition,
    pub reg: Reg,
    pub value: u32,
}

impl LoadConst {
    pub fn encode(&self) -> [u32; 2] {
        let prefix = (self.cond.code() << 29)
            | (LOAD_OPCODE << 24)
            | (((self.reg.index() & 0x0F) as u32) << 20);
        let high = prefix | (1 << 19) | ((self.value >> 16) & 0xFFFF);
        let low = prefix | (self.value & 0xFFFF);
        [high, low]
    }

    pub fn decode(words: [u32; 2]) -> Option<Self> {
        let cond = Condition::from_code(words[0] >> 29)?;
        if (words[0] >> 24) & 0x1F != LOAD_OPCODE || (words[1] >> 24) & 0x1F != LOAD_OPCODE {
            return None;
        }
        if words[0] & (1 << 19) == 0 || words[1] & (1 << 19) != 0 {
            return None;
        }
        Some(LoadConst {
            cond,
            reg: Reg::new(((words[0] >> 20) & 0x0F) as u8)?,
            value: ((words[0] & 0xFFFF) << 16) | (words[1] & 0xFFFF),
        })
    }
}

/// Encoded machine code of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Words {
    Single(u32),
    Double([u32; 2]),
}

impl Words {
    pub fn size(&self) -> u32 {
        match self {
            Words::Single(_) => 4,
            Words::Double(_) => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Int(Int),
    Arith(Arith),
    Logic(Logic),
    LoadStore(LoadStore),
    Call(Call),
    InOut(InOut),
    Mov(Mov),
    Shift(Shift),
    LoadChar(LoadChar),
    LoadConst(LoadConst),
}

impl Op {
    pub fn words(&self) -> Words {
        match self {
            Op::Int(op) => Words::Single(op.encode()),
            Op::Arith(op) => Words::Single(op.encode()),
            Op::Logic(op) => Words::Single(op.encode()),
            Op::LoadStore(op) => Words::Single(op.encode()),
            Op::Call(op) => Words::Single(op.encode()),
            Op::InOut(op) => Words::Single(op.encode()),
            Op::Mov(op) => Words::Single(op.encode()),
            Op::Shift(op) => Words::Single(op.encode()),
            Op::LoadChar(op) => Words::Single(op.encode()),
            Op::LoadConst(op) => Words::Double(op.encode()),
        }
    }
}
