use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{keccak256, Hash};

use crate::error::{PreimageError, PreimageResult};

/// Type tag carried in byte 0 of every preimage key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PreimageKeyType {
    Local = 1,
    Keccak256 = 2,
    Sha256 = 4,
    Blob = 5,
    Precompile = 6,
}

impl TryFrom<u8> for PreimageKeyType {
    type Error = PreimageError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(Self::Local),
            2 => Ok(Self::Keccak256),
            4 => Ok(Self::Sha256),
            5 => Ok(Self::Blob),
            6 => Ok(Self::Precompile),
            other => Err(PreimageError::InvalidKeyType(other)),
        }
    }
}

/// Type of a key, rejecting unknown tags.
pub fn key_type(key: &Hash) -> PreimageResult<PreimageKeyType> {
    PreimageKeyType::try_from(key[0])
}

pub fn local_key(ident: u64) -> Hash {
    let mut key = [0u8; 32];
    key[0] = PreimageKeyType::Local as u8;
    key[24..].copy_from_slice(&ident.to_be_bytes());
    key
}

pub fn keccak256_key(data: &[u8]) -> Hash {
    let mut key = keccak256(data);
    key[0] = PreimageKeyType::Keccak256 as u8;
    key
}

pub fn sha256_key(data: &[u8]) -> Hash {
    let mut key: Hash = Sha256::digest(data).into();
    key[0] = PreimageKeyType::Sha256 as u8;
    key
}

/// Up to 32 bytes read from a length-prefixed preimage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreimageChunk {
    pub data: [u8; 32],
    pub len: usize,
}

impl PreimageChunk {
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

/// Read from `len_be[8] ‖ preimage` at `offset`. Offsets past the end yield
/// an empty chunk.
pub fn read_chunk(preimage: &[u8], offset: u64) -> PreimageChunk {
    let mut chunk = PreimageChunk {
        data: [0u8; 32],
        len: 0,
    };
    let prefix = (preimage.len() as u64).to_be_bytes();
    let total = 8 + preimage.len() as u64;
    let mut cursor = offset;

    while chunk.len < 32 && cursor < total {
        let index = cursor as usize;
        chunk.data[chunk.len] = if index < 8 {
            prefix[index]
        } else {
            preimage[index - 8]
        };
        chunk.len += 1;
        cursor += 1;
    }
    chunk
}
