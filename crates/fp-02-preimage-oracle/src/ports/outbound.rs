//! Driven ports of the preimage oracle.

use shared_types::Hash;

use crate::domain::key::{read_chunk, PreimageChunk};
use crate::error::{PreimageError, PreimageResult};

/// Read access to preimages, as consumed by the interpreter's READ syscall.
pub trait PreimageSource: Send + Sync {
    fn get_preimage(&self, key: &Hash) -> PreimageResult<Vec<u8>>;

    /// Up to 32 bytes of `len_be[8] ‖ preimage` starting at `offset`.
    fn read_at(&self, key: &Hash, offset: u64) -> PreimageResult<PreimageChunk> {
        let preimage = self.get_preimage(key)?;
        Ok(read_chunk(&preimage, offset))
    }
}

/// Receives hints sent by the program. Errors are logged by the server and
/// never reach the program.
pub trait HintHandler: Send + Sync {
    fn handle_hint(&self, hint: &str) -> PreimageResult<()>;
}

/// Default handler: accepts and ignores every hint.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHintHandler;

impl HintHandler for NoopHintHandler {
    fn handle_hint(&self, _hint: &str) -> PreimageResult<()> {
        Ok(())
    }
}

impl<F> HintHandler for F
where
    F: Fn(&str) -> Result<(), String> + Send + Sync,
{
    fn handle_hint(&self, hint: &str) -> PreimageResult<()> {
        self(hint).map_err(PreimageError::HintRejected)
    }
}
