//! # VM Memory
//!
//! Word-addressed memory committed to by a trie. Each 8-byte aligned word
//! is stored under its big-endian address; absent words read as zero and
//! zero words are removed, so the root only depends on the non-zero
//! contents.

use std::collections::BTreeMap;

use fp_01_trie::Trie;
use shared_types::Hash;

use crate::errors::{VmError, VmResult};

#[derive(Clone, Debug, Default)]
pub struct Memory {
    trie: Trie,
    /// Plain view of the same words, kept for witness export.
    words: BTreeMap<u64, u64>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild memory from `(address, word)` pairs.
    pub fn from_words(words: impl IntoIterator<Item = (u64, u64)>) -> VmResult<Self> {
        let mut memory = Memory::new();
        for (addr, value) in words {
            memory.write_word(addr, value)?;
        }
        Ok(memory)
    }

    /// Commitment to the full memory contents.
    pub fn root(&self) -> Hash {
        self.trie.root()
    }

    /// The committing trie itself, e.g. to prove single words against
    /// [`Memory::root`].
    pub fn trie(&self) -> &Trie {
        &self.trie
    }

    /// Non-zero words in address order.
    pub fn words(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.words.iter().map(|(addr, value)| (*addr, *value))
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn read_word(&self, addr: u64) -> VmResult<u64> {
        check_alignment(addr, 8)?;
        Ok(self.words.get(&addr).copied().unwrap_or(0))
    }

    pub fn write_word(&mut self, addr: u64, value: u64) -> VmResult<()> {
        check_alignment(addr, 8)?;
        let key = addr.to_be_bytes();
        if value == 0 {
            self.trie.delete(&key);
            self.words.remove(&addr);
        } else {
            self.trie.insert(&key, value.to_be_bytes().to_vec());
            self.words.insert(addr, value);
        }
        Ok(())
    }

    /// 32-bit read: the high half of the containing word when `addr & 4`
    /// is clear, the low half otherwise.
    pub fn read_u32(&self, addr: u64) -> VmResult<u32> {
        check_alignment(addr, 4)?;
        let word = self.read_word(addr & !7)?;
        Ok(if addr & 4 == 0 {
            (word >> 32) as u32
        } else {
            word as u32
        })
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> VmResult<()> {
        check_alignment(addr, 4)?;
        let word_addr = addr & !7;
        let word = self.read_word(word_addr)?;
        let updated = if addr & 4 == 0 {
            (word & 0x0000_0000_FFFF_FFFF) | ((value as u64) << 32)
        } else {
            (word & 0xFFFF_FFFF_0000_0000) | value as u64
        };
        self.write_word(word_addr, updated)
    }

    /// Copy raw bytes in at any address, big-endian within each word.
    pub fn set_bytes(&mut self, addr: u64, bytes: &[u8]) -> VmResult<()> {
        let mut cursor = addr;
        let mut rest = bytes;
        while !rest.is_empty() {
            let word_addr = cursor & !7;
            let offset = (cursor & 7) as usize;
            let take = rest.len().min(8 - offset);

            let mut word = self.read_word(word_addr)?.to_be_bytes();
            word[offset..offset + take].copy_from_slice(&rest[..take]);
            self.write_word(word_addr, u64::from_be_bytes(word))?;

            rest = &rest[take..];
            cursor = cursor.wrapping_add(take as u64);
        }
        Ok(())
    }
}

fn check_alignment(addr: u64, size: u64) -> VmResult<()> {
    if addr % size != 0 {
        return Err(VmError::UnalignedAccess { addr });
    }
    Ok(())
}
