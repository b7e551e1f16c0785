//! # Programs
//!
//! A tiny assembler for the supported instruction subset and a loader
//! that lays code and data out in [`Memory`] and builds the matching
//! initial [`VmState`].

use fp_02_preimage_oracle::{local_ident, local_key};

use crate::domain::VmState;
use crate::errors::{VmError, VmResult};
use crate::mips::Memory;

/// Default load address for code.
pub const CODE_BASE: u64 = 0x1000;
/// Initial heap pointer handed out by anonymous `mmap`.
pub const HEAP_START: u64 = 0x2000_0000;
/// Initial stack pointer.
pub const STACK_TOP: u64 = 0x7FFF_F000;

/// Register numbers by ABI name.
pub mod reg {
    pub const ZERO: u32 = 0;
    pub const AT: u32 = 1;
    pub const V0: u32 = 2;
    pub const V1: u32 = 3;
    pub const A0: u32 = 4;
    pub const A1: u32 = 5;
    pub const A2: u32 = 6;
    pub const A3: u32 = 7;
    pub const T0: u32 = 8;
    pub const T1: u32 = 9;
    pub const T2: u32 = 10;
    pub const T3: u32 = 11;
    pub const T4: u32 = 12;
    pub const T5: u32 = 13;
    pub const T6: u32 = 14;
    pub const T7: u32 = 15;
    pub const S0: u32 = 16;
    pub const S1: u32 = 17;
    pub const S2: u32 = 18;
    pub const S3: u32 = 19;
    pub const GP: u32 = 28;
    pub const SP: u32 = 29;
    pub const FP: u32 = 30;
    pub const RA: u32 = 31;
}

/// Instruction encoders. Branch offsets are in instructions relative to
/// the delay slot, as the hardware computes them.
pub mod asm {
    use crate::mips::opcodes::{funct, op};

    fn r_type(rs: u32, rt: u32, rd: u32, shamt: u32, func: u32) -> u32 {
        ((rs & 0x1F) << 21) | ((rt & 0x1F) << 16) | ((rd & 0x1F) << 11) | ((shamt & 0x1F) << 6) | func
    }

    fn i_type(opcode: u32, rs: u32, rt: u32, imm: u16) -> u32 {
        (opcode << 26) | ((rs & 0x1F) << 21) | ((rt & 0x1F) << 16) | imm as u32
    }

    fn j_type(opcode: u32, target: u32) -> u32 {
        (opcode << 26) | (target & 0x03FF_FFFF)
    }

    pub fn nop() -> u32 {
        0
    }

    pub fn syscall() -> u32 {
        funct::SYSCALL
    }

    pub fn add(rd: u32, rs: u32, rt: u32) -> u32 {
        r_type(rs, rt, rd, 0, funct::ADD)
    }

    pub fn addu(rd: u32, rs: u32, rt: u32) -> u32 {
        r_type(rs, rt, rd, 0, funct::ADDU)
    }

    pub fn sub(rd: u32, rs: u32, rt: u32) -> u32 {
        r_type(rs, rt, rd, 0, funct::SUB)
    }

    pub fn subu(rd: u32, rs: u32, rt: u32) -> u32 {
        r_type(rs, rt, rd, 0, funct::SUBU)
    }

    pub fn and(rd: u32, rs: u32, rt: u32) -> u32 {
        r_type(rs, rt, rd, 0, funct::AND)
    }

    pub fn or(rd: u32, rs: u32, rt: u32) -> u32 {
        r_type(rs, rt, rd, 0, funct::OR)
    }

    pub fn xor(rd: u32, rs: u32, rt: u32) -> u32 {
        r_type(rs, rt, rd, 0, funct::XOR)
    }

    pub fn nor(rd: u32, rs: u32, rt: u32) -> u32 {
        r_type(rs, rt, rd, 0, funct::NOR)
    }

    pub fn slt(rd: u32, rs: u32, rt: u32) -> u32 {
        r_type(rs, rt, rd, 0, funct::SLT)
    }

    pub fn sltu(rd: u32, rs: u32, rt: u32) -> u32 {
        r_type(rs, rt, rd, 0, funct::SLTU)
    }

    pub fn sll(rd: u32, rt: u32, shamt: u32) -> u32 {
        r_type(0, rt, rd, shamt, funct::SLL)
    }

    pub fn srl(rd: u32, rt: u32, shamt: u32) -> u32 {
        r_type(0, rt, rd, shamt, funct::SRL)
    }

    pub fn sra(rd: u32, rt: u32, shamt: u32) -> u32 {
        r_type(0, rt, rd, shamt, funct::SRA)
    }

    pub fn sllv(rd: u32, rt: u32, rs: u32) -> u32 {
        r_type(rs, rt, rd, 0, funct::SLLV)
    }

    pub fn srlv(rd: u32, rt: u32, rs: u32) -> u32 {
        r_type(rs, rt, rd, 0, funct::SRLV)
    }

    pub fn srav(rd: u32, rt: u32, rs: u32) -> u32 {
        r_type(rs, rt, rd, 0, funct::SRAV)
    }

    pub fn jr(rs: u32) -> u32 {
        r_type(rs, 0, 0, 0, funct::JR)
    }

    pub fn jalr(rd: u32, rs: u32) -> u32 {
        r_type(rs, 0, rd, 0, funct::JALR)
    }

    pub fn mfhi(rd: u32) -> u32 {
        r_type(0, 0, rd, 0, funct::MFHI)
    }

    pub fn mflo(rd: u32) -> u32 {
        r_type(0, 0, rd, 0, funct::MFLO)
    }

    pub fn mthi(rs: u32) -> u32 {
        r_type(rs, 0, 0, 0, funct::MTHI)
    }

    pub fn mtlo(rs: u32) -> u32 {
        r_type(rs, 0, 0, 0, funct::MTLO)
    }

    pub fn mult(rs: u32, rt: u32) -> u32 {
        r_type(rs, rt, 0, 0, funct::MULT)
    }

    pub fn multu(rs: u32, rt: u32) -> u32 {
        r_type(rs, rt, 0, 0, funct::MULTU)
    }

    pub fn div(rs: u32, rt: u32) -> u32 {
        r_type(rs, rt, 0, 0, funct::DIV)
    }

    pub fn divu(rs: u32, rt: u32) -> u32 {
        r_type(rs, rt, 0, 0, funct::DIVU)
    }

    /// `target` is the word index within the current 256 MiB region.
    pub fn j(target: u32) -> u32 {
        j_type(op::J, target)
    }

    pub fn jal(target: u32) -> u32 {
        j_type(op::JAL, target)
    }

    pub fn beq(rs: u32, rt: u32, offset: i16) -> u32 {
        i_type(op::BEQ, rs, rt, offset as u16)
    }

    pub fn bne(rs: u32, rt: u32, offset: i16) -> u32 {
        i_type(op::BNE, rs, rt, offset as u16)
    }

    pub fn blez(rs: u32, offset: i16) -> u32 {
        i_type(op::BLEZ, rs, 0, offset as u16)
    }

    pub fn bgtz(rs: u32, offset: i16) -> u32 {
        i_type(op::BGTZ, rs, 0, offset as u16)
    }

    pub fn addi(rt: u32, rs: u32, imm: i16) -> u32 {
        i_type(op::ADDI, rs, rt, imm as u16)
    }

    pub fn addiu(rt: u32, rs: u32, imm: i16) -> u32 {
        i_type(op::ADDIU, rs, rt, imm as u16)
    }

    pub fn slti(rt: u32, rs: u32, imm: i16) -> u32 {
        i_type(op::SLTI, rs, rt, imm as u16)
    }

    pub fn sltiu(rt: u32, rs: u32, imm: i16) -> u32 {
        i_type(op::SLTIU, rs, rt, imm as u16)
    }

    pub fn andi(rt: u32, rs: u32, imm: u16) -> u32 {
        i_type(op::ANDI, rs, rt, imm)
    }

    pub fn ori(rt: u32, rs: u32, imm: u16) -> u32 {
        i_type(op::ORI, rs, rt, imm)
    }

    pub fn xori(rt: u32, rs: u32, imm: u16) -> u32 {
        i_type(op::XORI, rs, rt, imm)
    }

    pub fn lui(rt: u32, imm: u16) -> u32 {
        i_type(op::LUI, 0, rt, imm)
    }

    pub fn lw(rt: u32, base: u32, offset: i16) -> u32 {
        i_type(op::LW, base, rt, offset as u16)
    }

    pub fn lwu(rt: u32, base: u32, offset: i16) -> u32 {
        i_type(op::LWU, base, rt, offset as u16)
    }

    pub fn ld(rt: u32, base: u32, offset: i16) -> u32 {
        i_type(op::LD, base, rt, offset as u16)
    }

    pub fn sw(rt: u32, base: u32, offset: i16) -> u32 {
        i_type(op::SW, base, rt, offset as u16)
    }

    pub fn sd(rt: u32, base: u32, offset: i16) -> u32 {
        i_type(op::SD, base, rt, offset as u16)
    }
}

/// Code plus initialised data, ready to load.
#[derive(Clone, Debug)]
pub struct Program {
    base: u64,
    code: Vec<u32>,
    data: Vec<(u64, Vec<u8>)>,
}

impl Program {
    pub fn new(base: u64) -> Self {
        Self {
            base,
            code: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: &[u32]) -> Self {
        self.code.extend_from_slice(code);
        self
    }

    pub fn with_data(mut self, addr: u64, bytes: impl Into<Vec<u8>>) -> Self {
        self.data.push((addr, bytes.into()));
        self
    }

    pub fn push(&mut self, insn: u32) {
        self.code.push(insn);
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn code(&self) -> &[u32] {
        &self.code
    }

    /// Write code and data into fresh memory and build the entry state.
    pub fn load(&self) -> VmResult<(VmState, Memory)> {
        if self.base % 4 != 0 {
            return Err(VmError::UnalignedAccess { addr: self.base });
        }

        let mut memory = Memory::new();
        let code: Vec<u8> = self.code.iter().flat_map(|insn| insn.to_be_bytes()).collect();
        memory.set_bytes(self.base, &code)?;
        for (addr, bytes) in &self.data {
            memory.set_bytes(*addr, bytes)?;
        }

        let mut state = VmState {
            mem_root: memory.root(),
            pc: self.base,
            next_pc: self.base.wrapping_add(4),
            heap: HEAP_START,
            ..VmState::default()
        };
        state.registers[reg::SP as usize] = STACK_TOP;

        Ok((state, memory))
    }
}

fn sum_loop(n: i16) -> [u32; 6] {
    [
        asm::addiu(reg::T0, reg::ZERO, n),
        asm::addiu(reg::T1, reg::ZERO, 0),
        asm::addu(reg::T1, reg::T1, reg::T0),
        asm::addiu(reg::T0, reg::T0, -1),
        asm::bgtz(reg::T0, -3),
        asm::nop(),
    ]
}

fn exit_ok() -> [u32; 3] {
    [
        asm::addiu(reg::V0, reg::ZERO, 5058),
        asm::addiu(reg::A0, reg::ZERO, 0),
        asm::syscall(),
    ]
}

/// Sums `n + (n-1) + ... + 1` into `$t1` and exits with code 0.
///
/// Takes `4n + 5` steps for positive `n`.
pub fn sum_to(n: i16) -> Program {
    Program::new(CODE_BASE)
        .with_code(&sum_loop(n))
        .with_code(&exit_ok())
}

/// Address of the local key in [`preimage_reader`].
pub const READER_KEY_ADDR: u64 = 0x2000;
/// Address the length prefix is read into; the first data word follows.
pub const READER_BUF_ADDR: u64 = 0x2100;

/// Requests local preimage `ident` and reads its length prefix and first
/// data word to [`READER_BUF_ADDR`]. Runs 30 steps and does not exit.
fn local_input_reader(ident: u64) -> Program {
    let key_addr = READER_KEY_ADDR as i16;
    let buf_addr = READER_BUF_ADDR as i16;

    let mut program =
        Program::new(CODE_BASE).with_data(READER_KEY_ADDR, local_key(ident).to_vec());

    for chunk in 0..4i16 {
        for insn in [
            asm::addiu(reg::V0, reg::ZERO, 5001),
            asm::addiu(reg::A0, reg::ZERO, 6),
            asm::addiu(reg::A1, reg::ZERO, key_addr + chunk * 8),
            asm::addiu(reg::A2, reg::ZERO, 8),
            asm::syscall(),
        ] {
            program.push(insn);
        }
    }

    for offset in [0i16, 8] {
        for insn in [
            asm::addiu(reg::V0, reg::ZERO, 5000),
            asm::addiu(reg::A0, reg::ZERO, 5),
            asm::addiu(reg::A1, reg::ZERO, buf_addr + offset),
            asm::addiu(reg::A2, reg::ZERO, 8),
            asm::syscall(),
        ] {
            program.push(insn);
        }
    }
    program
}

/// Requests local preimage `ident`, reads its length prefix into `$t0`
/// and first data word into `$t1`, then exits with code 0.
pub fn preimage_reader(ident: u64) -> Program {
    let buf_addr = READER_BUF_ADDR as i16;
    local_input_reader(ident)
        .with_code(&[
            asm::ld(reg::T0, reg::ZERO, buf_addr),
            asm::ld(reg::T1, reg::ZERO, buf_addr + 8),
        ])
        .with_code(&exit_ok())
}

/// Reads the batch index local input into memory, then runs
/// [`sum_to`]'s loop. Each batch therefore ends in its own memory root.
///
/// Takes `4n + 35` steps for positive `n`.
pub fn batch_program(n: i16) -> Program {
    local_input_reader(local_ident::BATCH_INDEX)
        .with_code(&sum_loop(n))
        .with_code(&exit_ok())
}
