//! # Preimage Wire Protocol
//!
//! Program-side clients against the server over real transports: TCP for
//! the preimage channel, in-memory duplex pipes for both channels at once.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use fp_02_preimage_oracle::{
        keccak256_key, local_key, HintWriter, OracleClient, PreimageServer, PreimageStore,
    };
    use parking_lot::Mutex;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::watch;

    fn store() -> Arc<PreimageStore> {
        let store = Arc::new(PreimageStore::new());
        store.add_preimage(b"block header rlp".to_vec());
        store.add_local_data(1, 901u64.to_be_bytes().to_vec());
        store
    }

    #[tokio::test]
    async fn test_tcp_clients_fetch_preimages() {
        let server = Arc::new(PreimageServer::new(store()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(Arc::clone(&server).serve_tcp(listener, rx));

        let mut first = OracleClient::new(TcpStream::connect(addr).await.unwrap());
        let mut second = OracleClient::new(TcpStream::connect(addr).await.unwrap());

        let header = first.get(&keccak256_key(b"block header rlp")).await.unwrap();
        assert_eq!(header, b"block header rlp");
        let chain_id = second.get(&local_key(1)).await.unwrap();
        assert_eq!(chain_id, 901u64.to_be_bytes());
        assert!(first.get(&local_key(99)).await.unwrap().is_empty());

        // Data added after connecting is visible to open connections.
        server.store().add_preimage(b"late".to_vec());
        assert_eq!(second.get(&keccak256_key(b"late")).await.unwrap(), b"late");

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_both_channels_over_pipes() {
        let recorded = Arc::new(Mutex::new(Vec::<String>::new()));
        let log = Arc::clone(&recorded);
        let server = Arc::new(PreimageServer::new(store()).with_hint_handler(Arc::new(
            move |hint: &str| -> Result<(), String> {
                log.lock().push(hint.to_string());
                Ok(())
            },
        )));
        let (_tx, rx) = watch::channel(false);

        let (preimage_client, preimage_server) = tokio::io::duplex(1024);
        let (hint_client, hint_server) = tokio::io::duplex(1024);
        let preimages = {
            let server = Arc::clone(&server);
            let rx = rx.clone();
            tokio::spawn(async move { server.serve_preimages(preimage_server, rx).await })
        };
        let hints = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.serve_hints(hint_server, rx).await })
        };

        let mut hinter = HintWriter::new(hint_client);
        let mut oracle = OracleClient::new(preimage_client);
        hinter.hint("l1-block-header 0xabc").await.unwrap();
        let header = oracle.get(&keccak256_key(b"block header rlp")).await.unwrap();
        hinter.hint("l2-output 7").await.unwrap();
        assert_eq!(header, b"block header rlp");

        // Closing each client ends its channel cleanly.
        drop(hinter);
        drop(oracle);
        preimages.await.unwrap().unwrap();
        hints.await.unwrap().unwrap();

        assert_eq!(
            *recorded.lock(),
            vec!["l1-block-header 0xabc".to_string(), "l2-output 7".to_string()]
        );
    }
}
