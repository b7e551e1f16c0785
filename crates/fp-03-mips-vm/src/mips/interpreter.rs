//! # MIPS Interpreter
//!
//! The single-step transition function. One call consumes a pre-state and
//! yields a fresh post-state; the pre-state is never mutated.
//!
//! Control flow follows MIPS branch-delay semantics: a taken branch or
//! jump writes its target to `next_pc`, so the instruction after it (the
//! delay slot) still executes before control transfers.

use fp_02_preimage_oracle::PreimageSource;

use super::memory::Memory;
use super::opcodes::{
    sign_extend_16, AluOp, BranchCond, HiLoOp, ImmOp, Instruction, LoadWidth, MulDivOp, ShiftOp,
    StoreWidth,
};
use super::syscalls::{handle_syscall, SyscallOutcome};
use crate::domain::VmState;
use crate::errors::{VmError, VmResult};
use crate::ports::{PreimageKeyDerivation, ShiftInKeyDerivation};

/// Return-address register written by JAL.
const REG_RA: usize = 31;

static SHIFT_IN: ShiftInKeyDerivation = ShiftInKeyDerivation;

/// Interpreter bound to one memory image and one oracle.
pub struct Interpreter<'a, O: PreimageSource + ?Sized> {
    memory: &'a mut Memory,
    oracle: &'a O,
    key_derivation: &'a dyn PreimageKeyDerivation,
}

/// Step once with the default key derivation.
pub fn step<O: PreimageSource + ?Sized>(
    pre: &VmState,
    memory: &mut Memory,
    oracle: &O,
) -> VmResult<VmState> {
    Interpreter::new(memory, oracle).step(pre)
}

impl<'a, O: PreimageSource + ?Sized> Interpreter<'a, O> {
    pub fn new(memory: &'a mut Memory, oracle: &'a O) -> Self {
        Self {
            memory,
            oracle,
            key_derivation: &SHIFT_IN,
        }
    }

    pub fn with_key_derivation(mut self, key_derivation: &'a dyn PreimageKeyDerivation) -> Self {
        self.key_derivation = key_derivation;
        self
    }

    /// Execute one instruction. Exited states are returned unchanged.
    pub fn step(&mut self, pre: &VmState) -> VmResult<VmState> {
        if pre.exited {
            return Ok(pre.clone());
        }

        let mut state = pre.clone();
        state.step += 1;

        let insn = self.memory.read_u32(state.pc)?;
        let instruction = Instruction::decode(insn)
            .ok_or(VmError::UnsupportedInstruction { insn, pc: state.pc })?;

        match instruction {
            Instruction::Syscall => {
                let outcome =
                    handle_syscall(&mut state, self.memory, self.oracle, self.key_derivation)?;
                if outcome == SyscallOutcome::Exit {
                    return Ok(state);
                }
                advance(&mut state);
            }
            Instruction::Jump { link, target } => {
                let region = state.pc.wrapping_add(4) & !0x0FFF_FFFF;
                let dest = region | ((target as u64) << 2);
                if link {
                    let ret = state.pc.wrapping_add(8);
                    set_reg(&mut state, REG_RA, ret);
                }
                branch_to(&mut state, dest);
            }
            Instruction::Jr { rs } => {
                let dest = state.registers[rs];
                branch_to(&mut state, dest);
            }
            Instruction::Jalr { rd, rs } => {
                let dest = state.registers[rs];
                let ret = state.pc.wrapping_add(8);
                set_reg(&mut state, rd, ret);
                branch_to(&mut state, dest);
            }
            Instruction::Branch {
                cond,
                rs,
                rt,
                offset,
            } => {
                let a = state.registers[rs];
                let b = state.registers[rt];
                let taken = match cond {
                    BranchCond::Eq => a == b,
                    BranchCond::Ne => a != b,
                    BranchCond::Lez => (a as i64) <= 0,
                    BranchCond::Gtz => (a as i64) > 0,
                };
                if taken {
                    let dest = state
                        .pc
                        .wrapping_add(4)
                        .wrapping_add(sign_extend_16(offset) << 2);
                    branch_to(&mut state, dest);
                } else {
                    advance(&mut state);
                }
            }
            other => {
                self.execute(&mut state, other)?;
                advance(&mut state);
            }
        }

        Ok(state)
    }

    /// Step until the program exits, failing after `max_steps` steps.
    pub fn run(&mut self, state: VmState, max_steps: u64) -> VmResult<VmState> {
        let mut state = state;
        for _ in 0..max_steps {
            if state.exited {
                return Ok(state);
            }
            state = self.step(&state)?;
        }
        if state.exited {
            Ok(state)
        } else {
            Err(VmError::MaxStepsExceeded { max_steps })
        }
    }

    /// Straight-line instructions (everything that does not redirect control).
    fn execute(&mut self, state: &mut VmState, instruction: Instruction) -> VmResult<()> {
        let regs = state.registers;
        match instruction {
            Instruction::Alu { op, rd, rs, rt } => {
                let (a, b) = (regs[rs], regs[rt]);
                let value = match op {
                    AluOp::Add | AluOp::Addu => a.wrapping_add(b),
                    AluOp::Sub | AluOp::Subu => a.wrapping_sub(b),
                    AluOp::And => a & b,
                    AluOp::Or => a | b,
                    AluOp::Xor => a ^ b,
                    AluOp::Nor => !(a | b),
                    AluOp::Slt => u64::from((a as i64) < (b as i64)),
                    AluOp::Sltu => u64::from(a < b),
                };
                set_reg(state, rd, value);
            }
            Instruction::Shift { op, rd, rt, shamt } => {
                set_reg(state, rd, shift(op, regs[rt], shamt));
            }
            Instruction::ShiftVariable { op, rd, rt, rs } => {
                set_reg(state, rd, shift(op, regs[rt], (regs[rs] & 0x3F) as u32));
            }
            Instruction::HiLo { op, reg } => match op {
                HiLoOp::Mfhi => {
                    let hi = state.hi;
                    set_reg(state, reg, hi);
                }
                HiLoOp::Mflo => {
                    let lo = state.lo;
                    set_reg(state, reg, lo);
                }
                HiLoOp::Mthi => state.hi = regs[reg],
                HiLoOp::Mtlo => state.lo = regs[reg],
            },
            Instruction::MulDiv { op, rs, rt } => {
                let (a, b) = (regs[rs], regs[rt]);
                match op {
                    MulDivOp::Mult => {
                        let product = (a as i64 as i128).wrapping_mul(b as i64 as i128) as u128;
                        state.lo = product as u64;
                        state.hi = (product >> 64) as u64;
                    }
                    MulDivOp::Multu => {
                        let product = (a as u128) * (b as u128);
                        state.lo = product as u64;
                        state.hi = (product >> 64) as u64;
                    }
                    // Division by zero leaves LO/HI untouched.
                    MulDivOp::Div if b != 0 => {
                        state.lo = (a as i64).wrapping_div(b as i64) as u64;
                        state.hi = (a as i64).wrapping_rem(b as i64) as u64;
                    }
                    MulDivOp::Divu if b != 0 => {
                        state.lo = a / b;
                        state.hi = a % b;
                    }
                    MulDivOp::Div | MulDivOp::Divu => {}
                }
            }
            Instruction::Imm { op, rt, rs, imm } => {
                let a = regs[rs];
                let signed = sign_extend_16(imm);
                let zero_ext = imm as u64;
                let value = match op {
                    ImmOp::Addi | ImmOp::Addiu => a.wrapping_add(signed),
                    ImmOp::Slti => u64::from((a as i64) < (signed as i64)),
                    ImmOp::Sltiu => u64::from(a < signed),
                    ImmOp::Andi => a & zero_ext,
                    ImmOp::Ori => a | zero_ext,
                    ImmOp::Xori => a ^ zero_ext,
                };
                set_reg(state, rt, value);
            }
            Instruction::Lui { rt, imm } => {
                set_reg(state, rt, ((imm as u32) << 16) as i32 as i64 as u64);
            }
            Instruction::Load {
                width,
                rt,
                base,
                offset,
            } => {
                let addr = regs[base].wrapping_add(sign_extend_16(offset));
                let value = match width {
                    LoadWidth::Word => self.memory.read_u32(addr)? as i32 as i64 as u64,
                    LoadWidth::WordUnsigned => self.memory.read_u32(addr)? as u64,
                    LoadWidth::Double => self.memory.read_word(addr)?,
                };
                set_reg(state, rt, value);
            }
            Instruction::Store {
                width,
                rt,
                base,
                offset,
            } => {
                let addr = regs[base].wrapping_add(sign_extend_16(offset));
                match width {
                    StoreWidth::Word => self.memory.write_u32(addr, regs[rt] as u32)?,
                    StoreWidth::Double => self.memory.write_word(addr, regs[rt])?,
                }
                state.mem_root = self.memory.root();
            }
            Instruction::Syscall
            | Instruction::Jump { .. }
            | Instruction::Jr { .. }
            | Instruction::Jalr { .. }
            | Instruction::Branch { .. } => {}
        }
        Ok(())
    }
}

fn shift(op: ShiftOp, value: u64, amount: u32) -> u64 {
    match op {
        ShiftOp::Sll => value << amount,
        ShiftOp::Srl => value >> amount,
        ShiftOp::Sra => ((value as i64) >> amount) as u64,
    }
}

/// Register 0 is hardwired: writes to it are dropped.
fn set_reg(state: &mut VmState, reg: usize, value: u64) {
    if reg != 0 {
        state.registers[reg] = value;
    }
}

fn advance(state: &mut VmState) {
    state.pc = state.next_pc;
    state.next_pc = state.next_pc.wrapping_add(4);
}

fn branch_to(state: &mut VmState, dest: u64) {
    state.pc = state.next_pc;
    state.next_pc = dest;
}
