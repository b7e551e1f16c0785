//! # VM State Codec
//!
//! Fixed 444-byte big-endian record and the status-tagged state hash.
//!
//! ```text
//! offset  size  field
//!      0    32  mem_root
//!     32    32  preimage_key
//!     64     8  preimage_offset
//!     72     8  pc
//!     80     8  next_pc
//!     88     8  lo
//!     96     8  hi
//!    104     8  heap
//!    112     1  exit_code
//!    113     1  exited
//!    114     8  step
//!    122   256  registers[32]
//!    378    66  reserved, zero
//! ```

use serde::{Deserialize, Serialize};
use shared_types::{keccak256, Hash, ZERO_HASH};

use crate::errors::{VmError, VmResult};

/// Size of an encoded state.
pub const STATE_SIZE: usize = 444;

/// Coarse outcome carried in byte 0 of the state hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum VmStatus {
    Valid = 0,
    Invalid = 1,
    Panic = 2,
    Unfinished = 3,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmState {
    pub mem_root: Hash,
    pub preimage_key: Hash,
    pub preimage_offset: u64,
    pub pc: u64,
    pub next_pc: u64,
    pub lo: u64,
    pub hi: u64,
    pub heap: u64,
    pub exit_code: u8,
    pub exited: bool,
    pub step: u64,
    pub registers: [u64; 32],
}

impl VmState {
    pub fn encode(&self) -> [u8; STATE_SIZE] {
        let mut out = [0u8; STATE_SIZE];
        out[0..32].copy_from_slice(&self.mem_root);
        out[32..64].copy_from_slice(&self.preimage_key);
        let words = [
            self.preimage_offset,
            self.pc,
            self.next_pc,
            self.lo,
            self.hi,
            self.heap,
        ];
        for (i, word) in words.iter().enumerate() {
            out[64 + i * 8..72 + i * 8].copy_from_slice(&word.to_be_bytes());
        }
        out[112] = self.exit_code;
        out[113] = u8::from(self.exited);
        out[114..122].copy_from_slice(&self.step.to_be_bytes());
        for (i, reg) in self.registers.iter().enumerate() {
            out[122 + i * 8..130 + i * 8].copy_from_slice(&reg.to_be_bytes());
        }
        out
    }

    /// Decode the fixed record. Bytes beyond the field area are ignored.
    pub fn decode(data: &[u8]) -> VmResult<Self> {
        if data.len() < STATE_SIZE {
            return Err(VmError::InvalidStateData {
                len: data.len(),
                expected: STATE_SIZE,
            });
        }
        let hash = |at: usize| -> Hash {
            let mut out = ZERO_HASH;
            out.copy_from_slice(&data[at..at + 32]);
            out
        };
        let mem_root = hash(0);
        let preimage_key = hash(32);

        let mut registers = [0u64; 32];
        for (i, reg) in registers.iter_mut().enumerate() {
            *reg = be_u64(data, 122 + i * 8);
        }

        Ok(VmState {
            mem_root,
            preimage_key,
            preimage_offset: be_u64(data, 64),
            pc: be_u64(data, 72),
            next_pc: be_u64(data, 80),
            lo: be_u64(data, 88),
            hi: be_u64(data, 96),
            heap: be_u64(data, 104),
            exit_code: data[112],
            exited: data[113] != 0,
            step: be_u64(data, 114),
            registers,
        })
    }

    pub fn status(&self) -> VmStatus {
        match (self.exited, self.exit_code) {
            (false, _) => VmStatus::Unfinished,
            (true, 0) => VmStatus::Valid,
            (true, 1) => VmStatus::Invalid,
            (true, _) => VmStatus::Panic,
        }
    }

    /// keccak256 of the encoding with byte 0 replaced by the status.
    pub fn state_hash(&self) -> Hash {
        let mut hash = keccak256(&self.encode());
        hash[0] = self.status() as u8;
        hash
    }

    /// Map a terminal state to its outcome error, if any.
    pub fn exit_result(&self) -> VmResult<()> {
        match self.status() {
            VmStatus::Valid | VmStatus::Unfinished => Ok(()),
            VmStatus::Invalid => Err(VmError::Invalid),
            VmStatus::Panic => Err(VmError::Panic {
                exit_code: self.exit_code,
            }),
        }
    }
}

fn be_u64(data: &[u8], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&data[at..at + 8]);
    u64::from_be_bytes(word)
}
