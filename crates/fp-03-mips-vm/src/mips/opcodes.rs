//! # MIPS Opcodes
//!
//! Numeric encodings for the supported instruction subset and a decoder
//! from raw 32-bit words into a tagged [`Instruction`].
//!
//! These constants are part of the consensus contract: every
//! implementation must decode the same words to the same operations.

/// Primary opcode field, bits 31..26.
pub mod op {
    pub const SPECIAL: u32 = 0x00;
    pub const J: u32 = 0x02;
    pub const JAL: u32 = 0x03;
    pub const BEQ: u32 = 0x04;
    pub const BNE: u32 = 0x05;
    pub const BLEZ: u32 = 0x06;
    pub const BGTZ: u32 = 0x07;
    pub const ADDI: u32 = 0x08;
    pub const ADDIU: u32 = 0x09;
    pub const SLTI: u32 = 0x0A;
    pub const SLTIU: u32 = 0x0B;
    pub const ANDI: u32 = 0x0C;
    pub const ORI: u32 = 0x0D;
    pub const XORI: u32 = 0x0E;
    pub const LUI: u32 = 0x0F;
    pub const LW: u32 = 0x23;
    pub const LWU: u32 = 0x27;
    pub const SW: u32 = 0x2B;
    pub const LD: u32 = 0x37;
    pub const SD: u32 = 0x3F;
}

/// Function field of SPECIAL instructions, bits 5..0.
pub mod funct {
    pub const SLL: u32 = 0x00;
    pub const SRL: u32 = 0x02;
    pub const SRA: u32 = 0x03;
    pub const SLLV: u32 = 0x04;
    pub const SRLV: u32 = 0x06;
    pub const SRAV: u32 = 0x07;
    pub const JR: u32 = 0x08;
    pub const JALR: u32 = 0x09;
    pub const SYSCALL: u32 = 0x0C;
    pub const MFHI: u32 = 0x10;
    pub const MTHI: u32 = 0x11;
    pub const MFLO: u32 = 0x12;
    pub const MTLO: u32 = 0x13;
    pub const MULT: u32 = 0x18;
    pub const MULTU: u32 = 0x19;
    pub const DIV: u32 = 0x1A;
    pub const DIVU: u32 = 0x1B;
    pub const ADD: u32 = 0x20;
    pub const ADDU: u32 = 0x21;
    pub const SUB: u32 = 0x22;
    pub const SUBU: u32 = 0x23;
    pub const AND: u32 = 0x24;
    pub const OR: u32 = 0x25;
    pub const XOR: u32 = 0x26;
    pub const NOR: u32 = 0x27;
    pub const SLT: u32 = 0x2A;
    pub const SLTU: u32 = 0x2B;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Addu,
    Sub,
    Subu,
    And,
    Or,
    Xor,
    Nor,
    Slt,
    Sltu,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftOp {
    Sll,
    Srl,
    Sra,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HiLoOp {
    Mfhi,
    Mthi,
    Mflo,
    Mtlo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MulDivOp {
    Mult,
    Multu,
    Div,
    Divu,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchCond {
    Eq,
    Ne,
    Lez,
    Gtz,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImmOp {
    Addi,
    Addiu,
    Slti,
    Sltiu,
    Andi,
    Ori,
    Xori,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadWidth {
    /// 32-bit, sign-extended.
    Word,
    /// 32-bit, zero-extended.
    WordUnsigned,
    Double,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreWidth {
    Word,
    Double,
}

/// A decoded instruction. Register fields are indices into the 32-entry
/// register file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    Alu { op: AluOp, rd: usize, rs: usize, rt: usize },
    Shift { op: ShiftOp, rd: usize, rt: usize, shamt: u32 },
    ShiftVariable { op: ShiftOp, rd: usize, rt: usize, rs: usize },
    Jr { rs: usize },
    Jalr { rd: usize, rs: usize },
    Syscall,
    /// `reg` is `rd` for the move-from forms and `rs` for move-to.
    HiLo { op: HiLoOp, reg: usize },
    MulDiv { op: MulDivOp, rs: usize, rt: usize },
    Jump { link: bool, target: u32 },
    Branch { cond: BranchCond, rs: usize, rt: usize, offset: u16 },
    Imm { op: ImmOp, rt: usize, rs: usize, imm: u16 },
    Lui { rt: usize, imm: u16 },
    Load { width: LoadWidth, rt: usize, base: usize, offset: u16 },
    Store { width: StoreWidth, rt: usize, base: usize, offset: u16 },
}

impl Instruction {
    /// Decode a raw word. `None` for anything outside the supported subset.
    pub fn decode(insn: u32) -> Option<Self> {
        let opcode = insn >> 26;
        let rs = ((insn >> 21) & 0x1F) as usize;
        let rt = ((insn >> 16) & 0x1F) as usize;
        let rd = ((insn >> 11) & 0x1F) as usize;
        let shamt = (insn >> 6) & 0x1F;
        let imm = (insn & 0xFFFF) as u16;

        let decoded = match opcode {
            op::SPECIAL => return Self::decode_special(insn & 0x3F, rs, rt, rd, shamt),
            op::J => Instruction::Jump {
                link: false,
                target: insn & 0x03FF_FFFF,
            },
            op::JAL => Instruction::Jump {
                link: true,
                target: insn & 0x03FF_FFFF,
            },
            op::BEQ => Self::branch(BranchCond::Eq, rs, rt, imm),
            op::BNE => Self::branch(BranchCond::Ne, rs, rt, imm),
            op::BLEZ => Self::branch(BranchCond::Lez, rs, rt, imm),
            op::BGTZ => Self::branch(BranchCond::Gtz, rs, rt, imm),
            op::ADDI => Self::imm(ImmOp::Addi, rt, rs, imm),
            op::ADDIU => Self::imm(ImmOp::Addiu, rt, rs, imm),
            op::SLTI => Self::imm(ImmOp::Slti, rt, rs, imm),
            op::SLTIU => Self::imm(ImmOp::Sltiu, rt, rs, imm),
            op::ANDI => Self::imm(ImmOp::Andi, rt, rs, imm),
            op::ORI => Self::imm(ImmOp::Ori, rt, rs, imm),
            op::XORI => Self::imm(ImmOp::Xori, rt, rs, imm),
            op::LUI => Instruction::Lui { rt, imm },
            op::LW => Self::load(LoadWidth::Word, rt, rs, imm),
            op::LWU => Self::load(LoadWidth::WordUnsigned, rt, rs, imm),
            op::LD => Self::load(LoadWidth::Double, rt, rs, imm),
            op::SW => Self::store(StoreWidth::Word, rt, rs, imm),
            op::SD => Self::store(StoreWidth::Double, rt, rs, imm),
            _ => return None,
        };
        Some(decoded)
    }

    fn decode_special(func: u32, rs: usize, rt: usize, rd: usize, shamt: u32) -> Option<Self> {
        let alu = |op| Instruction::Alu { op, rd, rs, rt };
        let shift = |op| Instruction::Shift { op, rd, rt, shamt };
        let shift_var = |op| Instruction::ShiftVariable { op, rd, rt, rs };
        let mul_div = |op| Instruction::MulDiv { op, rs, rt };

        let decoded = match func {
            funct::SLL => shift(ShiftOp::Sll),
            funct::SRL => shift(ShiftOp::Srl),
            funct::SRA => shift(ShiftOp::Sra),
            funct::SLLV => shift_var(ShiftOp::Sll),
            funct::SRLV => shift_var(ShiftOp::Srl),
            funct::SRAV => shift_var(ShiftOp::Sra),
            funct::JR => Instruction::Jr { rs },
            funct::JALR => Instruction::Jalr { rd, rs },
            funct::SYSCALL => Instruction::Syscall,
            funct::MFHI => Instruction::HiLo { op: HiLoOp::Mfhi, reg: rd },
            funct::MTHI => Instruction::HiLo { op: HiLoOp::Mthi, reg: rs },
            funct::MFLO => Instruction::HiLo { op: HiLoOp::Mflo, reg: rd },
            funct::MTLO => Instruction::HiLo { op: HiLoOp::Mtlo, reg: rs },
            funct::MULT => mul_div(MulDivOp::Mult),
            funct::MULTU => mul_div(MulDivOp::Multu),
            funct::DIV => mul_div(MulDivOp::Div),
            funct::DIVU => mul_div(MulDivOp::Divu),
            funct::ADD => alu(AluOp::Add),
            funct::ADDU => alu(AluOp::Addu),
            funct::SUB => alu(AluOp::Sub),
            funct::SUBU => alu(AluOp::Subu),
            funct::AND => alu(AluOp::And),
            funct::OR => alu(AluOp::Or),
            funct::XOR => alu(AluOp::Xor),
            funct::NOR => alu(AluOp::Nor),
            funct::SLT => alu(AluOp::Slt),
            funct::SLTU => alu(AluOp::Sltu),
            _ => return None,
        };
        Some(decoded)
    }

    fn branch(cond: BranchCond, rs: usize, rt: usize, offset: u16) -> Self {
        Instruction::Branch { cond, rs, rt, offset }
    }

    fn imm(op: ImmOp, rt: usize, rs: usize, imm: u16) -> Self {
        Instruction::Imm { op, rt, rs, imm }
    }

    fn load(width: LoadWidth, rt: usize, base: usize, offset: u16) -> Self {
        Instruction::Load { width, rt, base, offset }
    }

    fn store(width: StoreWidth, rt: usize, base: usize, offset: u16) -> Self {
        Instruction::Store { width, rt, base, offset }
    }
}

/// Sign-extend a 16-bit immediate to 64 bits.
pub fn sign_extend_16(imm: u16) -> u64 {
    imm as i16 as i64 as u64
}
