//! # Syscall Dispatch
//!
//! MIPS64 Linux syscall numbers and the subset the VM emulates. The
//! number is read from `$v0`, arguments from `$a0..$a3`; the result goes
//! to `$v0` and the errno to `$a3`.

use fp_02_preimage_oracle::PreimageSource;
use tracing::trace;

use super::memory::Memory;
use crate::domain::VmState;
use crate::errors::VmResult;
use crate::ports::PreimageKeyDerivation;

pub const SYS_READ: u64 = 5000;
pub const SYS_WRITE: u64 = 5001;
pub const SYS_CLOSE: u64 = 5003;
pub const SYS_MMAP: u64 = 5009;
pub const SYS_MPROTECT: u64 = 5010;
pub const SYS_MUNMAP: u64 = 5011;
pub const SYS_BRK: u64 = 5012;
pub const SYS_SCHED_YIELD: u64 = 5023;
pub const SYS_MADVISE: u64 = 5027;
pub const SYS_NANOSLEEP: u64 = 5034;
pub const SYS_GETPID: u64 = 5038;
pub const SYS_EXIT: u64 = 5058;
pub const SYS_FCNTL: u64 = 5070;
pub const SYS_EXIT_GROUP: u64 = 5205;
pub const SYS_PRLIMIT64: u64 = 5297;

pub const FD_STDIN: u64 = 0;
pub const FD_STDOUT: u64 = 1;
pub const FD_STDERR: u64 = 2;
pub const FD_HINT_READ: u64 = 3;
pub const FD_HINT_WRITE: u64 = 4;
pub const FD_PREIMAGE_READ: u64 = 5;
pub const FD_PREIMAGE_WRITE: u64 = 6;

pub const EBADF: u64 = 0x9;
pub const EINVAL: u64 = 0x16;

/// fcntl command for reading file status flags.
pub const F_GETFL: u64 = 3;

/// Fixed program break returned by BRK.
pub const BRK_START: u64 = 0x4000_0000;
pub const PAGE_SIZE: u64 = 4096;
/// Constant process id returned by GETPID.
pub const PID: u64 = 1;

pub const REG_V0: usize = 2;
pub const REG_A0: usize = 4;
pub const REG_A1: usize = 5;
pub const REG_A2: usize = 6;
pub const REG_A3: usize = 7;

/// Whether execution continues after the syscall.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyscallOutcome {
    Continue,
    Exit,
}

/// Execute the syscall selected by `$v0` against `state`.
pub fn handle_syscall<O: PreimageSource + ?Sized>(
    state: &mut VmState,
    memory: &mut Memory,
    oracle: &O,
    key_derivation: &dyn PreimageKeyDerivation,
) -> VmResult<SyscallOutcome> {
    let number = state.registers[REG_V0];
    let a0 = state.registers[REG_A0];
    let a1 = state.registers[REG_A1];
    let a2 = state.registers[REG_A2];

    let (v0, errno) = match number {
        SYS_EXIT | SYS_EXIT_GROUP => {
            state.exited = true;
            state.exit_code = a0 as u8;
            return Ok(SyscallOutcome::Exit);
        }
        SYS_MMAP => {
            let mut size = a1;
            if size % PAGE_SIZE != 0 {
                size = (size & !(PAGE_SIZE - 1)).wrapping_add(PAGE_SIZE);
            }
            if a0 == 0 {
                let addr = state.heap;
                state.heap = state.heap.wrapping_add(size);
                (addr, 0)
            } else {
                (a0, 0)
            }
        }
        SYS_BRK => (BRK_START, 0),
        SYS_READ => read(state, memory, oracle, a0, a1, a2)?,
        SYS_WRITE => write(state, memory, key_derivation, a0, a1, a2)?,
        SYS_FCNTL => fcntl(a0, a1),
        SYS_GETPID => (PID, 0),
        SYS_CLOSE | SYS_MPROTECT | SYS_MUNMAP | SYS_MADVISE | SYS_PRLIMIT64
        | SYS_SCHED_YIELD | SYS_NANOSLEEP => (0, 0),
        unknown => {
            // Registers stay untouched so the program observes no effect.
            trace!("[mips] Ignoring unknown syscall {}", unknown);
            return Ok(SyscallOutcome::Continue);
        }
    };

    state.registers[REG_V0] = v0;
    state.registers[REG_A3] = errno;
    Ok(SyscallOutcome::Continue)
}

fn read<O: PreimageSource + ?Sized>(
    state: &mut VmState,
    memory: &mut Memory,
    oracle: &O,
    fd: u64,
    addr: u64,
    count: u64,
) -> VmResult<(u64, u64)> {
    match fd {
        FD_STDIN => Ok((0, 0)),
        // Hint responses carry no data; report everything as read.
        FD_HINT_READ => Ok((count, 0)),
        FD_PREIMAGE_READ => {
            let alignment = (addr & 7) as usize;
            let chunk = oracle.read_at(&state.preimage_key, state.preimage_offset)?;
            let n = (count as usize).min(8 - alignment).min(chunk.len);
            if n > 0 {
                let word_addr = addr & !7;
                let mut word = memory.read_word(word_addr)?.to_be_bytes();
                word[alignment..alignment + n].copy_from_slice(&chunk.bytes()[..n]);
                memory.write_word(word_addr, u64::from_be_bytes(word))?;
                state.mem_root = memory.root();
                state.preimage_offset += n as u64;
            }
            Ok((n as u64, 0))
        }
        _ => Ok((u64::MAX, EBADF)),
    }
}

fn write(
    state: &mut VmState,
    memory: &Memory,
    key_derivation: &dyn PreimageKeyDerivation,
    fd: u64,
    addr: u64,
    count: u64,
) -> VmResult<(u64, u64)> {
    match fd {
        FD_STDOUT | FD_STDERR | FD_HINT_WRITE => Ok((count, 0)),
        FD_PREIMAGE_WRITE => {
            let alignment = (addr & 7) as usize;
            let n = (count as usize).min(8 - alignment);
            let word = memory.read_word(addr & !7)?.to_be_bytes();
            state.preimage_key =
                key_derivation.derive_key(&state.preimage_key, &word[alignment..alignment + n]);
            state.preimage_offset = 0;
            Ok((n as u64, 0))
        }
        _ => Ok((u64::MAX, EBADF)),
    }
}

fn fcntl(fd: u64, cmd: u64) -> (u64, u64) {
    if cmd != F_GETFL {
        return (u64::MAX, EINVAL);
    }
    match fd {
        FD_STDIN | FD_HINT_READ | FD_PREIMAGE_READ => (0, 0),
        FD_STDOUT | FD_STDERR | FD_HINT_WRITE | FD_PREIMAGE_WRITE => (1, 0),
        _ => (u64::MAX, EBADF),
    }
}
