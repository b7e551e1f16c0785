//! Program-side ends of the two wire channels.

use shared_types::Hash;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{PreimageError, PreimageResult};
use crate::service::read_frame;

/// Requests preimages by key.
pub struct OracleClient<S> {
    stream: S,
}

impl<S> OracleClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Fetch the preimage for `key`. An unknown key comes back empty.
    pub async fn get(&mut self, key: &Hash) -> PreimageResult<Vec<u8>> {
        self.stream.write_all(key).await?;
        self.stream.flush().await?;

        let mut len = [0u8; 8];
        self.stream.read_exact(&mut len).await?;
        let mut value = vec![0u8; u64::from_be_bytes(len) as usize];
        if !value.is_empty() && !read_frame(&mut self.stream, &mut value).await? {
            return Err(PreimageError::UnexpectedEof);
        }
        Ok(value)
    }
}

/// Sends hints and waits for each acknowledgement.
pub struct HintWriter<S> {
    stream: S,
}

impl<S> HintWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub async fn hint(&mut self, hint: &str) -> PreimageResult<()> {
        self.stream.write_all(&(hint.len() as u32).to_be_bytes()).await?;
        self.stream.write_all(hint.as_bytes()).await?;
        self.stream.flush().await?;

        let mut ack = [0u8; 1];
        self.stream.read_exact(&mut ack).await?;
        Ok(())
    }
}
