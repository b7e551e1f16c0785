//! # Preimage Wire Server
//!
//! Serves the preimage and hint channels over any `AsyncRead + AsyncWrite`
//! transport (pipes, duplex streams, TCP).

use std::sync::Arc;

use shared_types::short_hex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::PreimageStore;
use crate::error::{PreimageError, PreimageResult};
use crate::ports::{HintHandler, NoopHintHandler};

/// Largest hint payload the server accepts. The length prefix comes from
/// the peer, so it is checked before anything is allocated.
pub const MAX_HINT_LEN: usize = 1 << 20;

pub struct PreimageServer {
    store: Arc<PreimageStore>,
    hint_handler: Arc<dyn HintHandler>,
}

impl PreimageServer {
    pub fn new(store: Arc<PreimageStore>) -> Self {
        Self {
            store,
            hint_handler: Arc::new(NoopHintHandler),
        }
    }

    pub fn with_hint_handler(mut self, handler: Arc<dyn HintHandler>) -> Self {
        self.hint_handler = handler;
        self
    }

    pub fn store(&self) -> &Arc<PreimageStore> {
        &self.store
    }

    /// Answer key requests until the peer closes the stream (`Ok`) or
    /// shutdown fires (`Cancelled`).
    pub async fn serve_preimages<S>(
        &self,
        mut stream: S,
        mut shutdown: watch::Receiver<bool>,
    ) -> PreimageResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let mut key = [0u8; 32];
            let got_request = tokio::select! {
                _ = shutdown.changed() => return Err(PreimageError::Cancelled),
                read = read_frame(&mut stream, &mut key) => read?,
            };
            if !got_request {
                debug!("[preimage] Preimage channel closed");
                return Ok(());
            }

            match self.store.get_preimage(&key) {
                Ok(value) => {
                    stream.write_all(&(value.len() as u64).to_be_bytes()).await?;
                    stream.write_all(&value).await?;
                    debug!("[preimage] Served key={} len={}", short_hex(&key), value.len());
                }
                Err(_) => {
                    stream.write_all(&0u64.to_be_bytes()).await?;
                    debug!("[preimage] Missing key={}", short_hex(&key));
                }
            }
            stream.flush().await?;
        }
    }

    /// Receive hints until the peer closes the stream (`Ok`) or shutdown
    /// fires (`Cancelled`). Every hint is acknowledged, even when the
    /// handler rejects it. A length prefix above [`MAX_HINT_LEN`] ends the
    /// channel with `HintTooLong`.
    pub async fn serve_hints<S>(
        &self,
        mut stream: S,
        mut shutdown: watch::Receiver<bool>,
    ) -> PreimageResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let mut len = [0u8; 4];
            let got_request = tokio::select! {
                _ = shutdown.changed() => return Err(PreimageError::Cancelled),
                read = read_frame(&mut stream, &mut len) => read?,
            };
            if !got_request {
                debug!("[preimage] Hint channel closed");
                return Ok(());
            }

            let len = u32::from_be_bytes(len) as usize;
            if len > MAX_HINT_LEN {
                warn!("[preimage] Dropping hint channel: {} byte hint", len);
                return Err(PreimageError::HintTooLong { len, max: MAX_HINT_LEN });
            }
            let mut payload = vec![0u8; len];
            if !payload.is_empty() && !read_frame(&mut stream, &mut payload).await? {
                return Err(PreimageError::UnexpectedEof);
            }

            match String::from_utf8(payload) {
                Ok(hint) => {
                    debug!("[preimage] Hint received: {}", hint);
                    if let Err(e) = self.hint_handler.handle_hint(&hint) {
                        warn!("[preimage] Hint handler error: {}", e);
                    }
                }
                Err(_) => warn!("[preimage] {}", PreimageError::InvalidHint),
            }

            stream.write_all(&[0u8]).await?;
            stream.flush().await?;
        }
    }

    /// Debug transport: serve the preimage channel on every accepted TCP
    /// connection until shutdown.
    pub async fn serve_tcp(
        self: Arc<Self>,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> PreimageResult<()> {
        info!("[preimage] Listening on {}", listener.local_addr()?);
        loop {
            let (socket, peer) = tokio::select! {
                _ = shutdown.changed() => {
                    info!("[preimage] Shutdown signal received");
                    return Ok(());
                }
                accepted = listener.accept() => accepted?,
            };
            debug!("[preimage] Connection from {}", peer);

            let server = Arc::clone(&self);
            let conn_shutdown = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = server.serve_preimages(socket, conn_shutdown).await {
                    debug!("[preimage] Connection {} ended: {}", peer, e);
                }
            });
        }
    }
}

/// Fill `buf` completely. `Ok(false)` means the stream ended cleanly before
/// the first byte; ending part-way through is an error.
pub(crate) async fn read_frame<S>(stream: &mut S, buf: &mut [u8]) -> PreimageResult<bool>
where
    S: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            return if filled == 0 {
                Ok(false)
            } else {
                Err(PreimageError::UnexpectedEof)
            };
        }
        filled += n;
    }
    Ok(true)
}
