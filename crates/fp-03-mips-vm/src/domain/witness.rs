//! # Step Witness
//!
//! Everything a verifier needs besides the pre-state to replay one
//! instruction: the memory image behind `mem_root` and, when the step may
//! read from the oracle, the preimage under the current key.
//!
//! ```text
//! count   u32 BE
//! words   count × (addr u64 BE ‖ word u64 BE)
//! flag    u8           0 = no preimage, 1 = preimage follows
//! key     [32]         only when flag = 1
//! len     u64 BE       only when flag = 1
//! data    [len]        only when flag = 1
//! ```
//!
//! A witnessed preimage is only trusted when the verifier can check it:
//! hash-derived keys against their data, local keys against the game's
//! own local inputs. Blob and precompile keys cannot be checked here and
//! are refused.

use fp_02_preimage_oracle::{
    key_type, keccak256_key, sha256_key, PreimageKeyType, PreimageSource, PreimageStore,
};
use shared_types::Hash;

use crate::errors::{VmError, VmResult};
use crate::mips::Memory;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepWitness {
    pub words: Vec<(u64, u64)>,
    pub preimage: Option<(Hash, Vec<u8>)>,
}

impl StepWitness {
    pub fn capture(memory: &Memory, preimage: Option<(Hash, Vec<u8>)>) -> Self {
        Self {
            words: memory.words().collect(),
            preimage,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.words.len() * 16 + 1);
        out.extend_from_slice(&(self.words.len() as u32).to_be_bytes());
        for (addr, word) in &self.words {
            out.extend_from_slice(&addr.to_be_bytes());
            out.extend_from_slice(&word.to_be_bytes());
        }
        match &self.preimage {
            None => out.push(0),
            Some((key, data)) => {
                out.push(1);
                out.extend_from_slice(key);
                out.extend_from_slice(&(data.len() as u64).to_be_bytes());
                out.extend_from_slice(data);
            }
        }
        out
    }

    pub fn decode(data: &[u8]) -> VmResult<Self> {
        let mut reader = Reader { data, pos: 0 };

        let count = u32::from_be_bytes(reader.array()?) as usize;
        let mut words = Vec::with_capacity(count.min(data.len() / 16));
        for _ in 0..count {
            let addr = u64::from_be_bytes(reader.array()?);
            let word = u64::from_be_bytes(reader.array()?);
            words.push((addr, word));
        }

        let preimage = match reader.array::<1>()?[0] {
            0 => None,
            1 => {
                let key: Hash = reader.array()?;
                let len = u64::from_be_bytes(reader.array()?) as usize;
                Some((key, reader.take(len)?.to_vec()))
            }
            flag => {
                return Err(VmError::InvalidWitness(format!(
                    "unknown preimage flag {flag}"
                )))
            }
        };

        if reader.pos != data.len() {
            return Err(VmError::InvalidWitness(format!(
                "{} trailing bytes",
                data.len() - reader.pos
            )));
        }

        Ok(Self { words, preimage })
    }

    /// Rebuild the memory image.
    pub fn memory(&self) -> VmResult<Memory> {
        Memory::from_words(self.words.iter().copied())
    }

    /// Oracle holding only the witnessed preimage, once it checks out.
    /// `local_inputs` holds the data every local key must resolve to.
    pub fn oracle(&self, local_inputs: &dyn PreimageSource) -> VmResult<PreimageStore> {
        let store = PreimageStore::new();
        if let Some((key, data)) = &self.preimage {
            let matches = match key_type(key)? {
                PreimageKeyType::Keccak256 => keccak256_key(data) == *key,
                PreimageKeyType::Sha256 => sha256_key(data) == *key,
                PreimageKeyType::Local => local_inputs
                    .get_preimage(key)
                    .is_ok_and(|expected| expected == *data),
                other => {
                    return Err(VmError::InvalidWitness(format!(
                        "{other:?} preimages cannot be checked in a step"
                    )))
                }
            };
            if !matches {
                return Err(VmError::InvalidWitness(
                    "preimage does not match its key".to_string(),
                ));
            }
            store.insert(*key, data.clone());
        }
        Ok(store)
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> VmResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| VmError::InvalidWitness("truncated".to_string()))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> VmResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fp_02_preimage_oracle::{local_key, LocalContext, PreimageKeyType};

    fn no_local_inputs() -> LocalContext {
        LocalContext::new()
    }

    #[test]
    fn test_encode_layout() {
        let witness = StepWitness {
            words: vec![(0x1000, 7)],
            preimage: None,
        };
        let bytes = witness.encode();
        assert_eq!(bytes.len(), 4 + 16 + 1);
        assert_eq!(&bytes[..4], &[0, 0, 0, 1]);
        assert_eq!(StepWitness::decode(&bytes).unwrap(), witness);
    }

    #[test]
    fn test_preimage_entry_survives_decode() {
        let data = b"hello".to_vec();
        let witness = StepWitness {
            words: vec![(0, 1), (8, 2)],
            preimage: Some((keccak256_key(&data), data.clone())),
        };
        let decoded = StepWitness::decode(&witness.encode()).unwrap();
        let oracle = decoded.oracle(&no_local_inputs()).unwrap();
        assert_eq!(oracle.get_preimage(&keccak256_key(&data)).unwrap(), data);
    }

    #[test]
    fn test_truncated_and_trailing_rejected() {
        let bytes = StepWitness::default().encode();
        assert!(matches!(
            StepWitness::decode(&bytes[..2]),
            Err(VmError::InvalidWitness(_))
        ));

        let mut padded = bytes.clone();
        padded.push(0);
        assert!(matches!(
            StepWitness::decode(&padded),
            Err(VmError::InvalidWitness(_))
        ));

        let mut bad_flag = bytes;
        bad_flag[4] = 9;
        assert!(StepWitness::decode(&bad_flag).is_err());
    }

    #[test]
    fn test_forged_keccak_preimage_rejected() {
        let witness = StepWitness {
            words: Vec::new(),
            preimage: Some((keccak256_key(b"real"), b"forged".to_vec())),
        };
        assert!(matches!(
            witness.oracle(&no_local_inputs()),
            Err(VmError::InvalidWitness(_))
        ));
    }

    #[test]
    fn test_local_preimage_must_match_game_inputs() {
        let inputs = LocalContext::new().with_input(3, b"batch 3 inputs".to_vec());
        let honest = StepWitness {
            words: Vec::new(),
            preimage: Some((local_key(3), b"batch 3 inputs".to_vec())),
        };
        assert_eq!(honest.oracle(&inputs).unwrap().len(), 1);

        let forged = StepWitness {
            words: Vec::new(),
            preimage: Some((local_key(3), b"anything".to_vec())),
        };
        assert!(matches!(forged.oracle(&inputs), Err(VmError::InvalidWitness(_))));

        // Idents the game never supplied cannot be witnessed either.
        let unknown = StepWitness {
            words: Vec::new(),
            preimage: Some((local_key(4), b"anything".to_vec())),
        };
        assert!(matches!(unknown.oracle(&inputs), Err(VmError::InvalidWitness(_))));
    }

    #[test]
    fn test_uncheckable_key_types_rejected() {
        for tag in [PreimageKeyType::Blob, PreimageKeyType::Precompile] {
            let mut key = [0x11u8; 32];
            key[0] = tag as u8;
            let witness = StepWitness {
                words: Vec::new(),
                preimage: Some((key, b"blob data".to_vec())),
            };
            assert!(matches!(
                witness.oracle(&no_local_inputs()),
                Err(VmError::InvalidWitness(_))
            ));
        }
    }

    #[test]
    fn test_memory_rebuilds_root() {
        let mut memory = Memory::new();
        memory.write_word(0x40, 0xAA).unwrap();
        memory.write_word(0x48, 0xBB).unwrap();
        let witness = StepWitness::capture(&memory, None);
        assert_eq!(witness.memory().unwrap().root(), memory.root());
    }
}
