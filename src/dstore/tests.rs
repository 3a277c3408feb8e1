//! Dstore Module Tests
//!
//! ## Test Scopes
//! - **Disk**: the `FileStore` wrapper and file name validation.
//! - **Node**: a real Dstore talking to a scripted Controller and client over TCP.

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::net::{TcpListener, TcpStream};

    use crate::config::DstoreConfig;
    use crate::dstore::disk::{FileStore, validate_name};
    use crate::dstore::node::DstoreNode;

    // ============================================================
    // DISK TESTS
    // ============================================================

    #[tokio::test]
    async fn test_file_store_write_read_delete() {
        let dir = tempfile::tempdir().expect("Tempdir failed");
        let store = FileStore::open(dir.path().join("nested")).await.expect("Open failed");

        let written = store
            .write_from("a.txt", &mut &b"hello"[..], 5)
            .await
            .expect("Write failed");
        assert_eq!(written, 5);

        assert_eq!(
            store.read("a.txt").await.expect("Read failed"),
            Some(b"hello".to_vec())
        );
        assert_eq!(store.list().await.expect("List failed"), vec!["a.txt".to_string()]);

        assert!(store.delete("a.txt").await.expect("Delete failed"));
        assert!(!store.delete("a.txt").await.expect("Delete failed"));
        assert_eq!(store.read("a.txt").await.expect("Read failed"), None);
    }

    #[tokio::test]
    async fn test_file_store_refuses_escaping_names() {
        let dir = tempfile::tempdir().expect("Tempdir failed");
        let store = FileStore::open(dir.path()).await.expect("Open failed");

        assert!(store.write_from("../evil", &mut &b"x"[..], 1).await.is_err());
        assert!(store.write_from("sub/file", &mut &b"x"[..], 1).await.is_err());
        assert!(store.read("..").await.is_err());
        assert!(store.list().await.expect("List failed").is_empty());
    }

    #[tokio::test]
    async fn test_file_store_write_stops_at_declared_size() {
        let dir = tempfile::tempdir().expect("Tempdir failed");
        let store = FileStore::open(dir.path()).await.expect("Open failed");

        let written = store
            .write_from("head.txt", &mut &b"hello world"[..], 5)
            .await
            .expect("Write failed");
        assert_eq!(written, 5);
        assert_eq!(
            store.read("head.txt").await.expect("Read failed"),
            Some(b"hello".to_vec())
        );

        // A reader that ends early reports how much actually arrived.
        let written = store
            .write_from("short.txt", &mut &b"abc"[..], u64::MAX)
            .await
            .expect("Write failed");
        assert_eq!(written, 3);
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("report-2024.pdf").is_ok());
        assert!(validate_name(".hidden").is_ok());

        for bad in ["", ".", "..", "a/b", "a\\b", "nul\0byte"] {
            assert!(validate_name(bad).is_err(), "accepted {:?}", bad);
        }
    }

    // ============================================================
    // NODE TESTS
    // ============================================================

    /// The Controller's side of a Dstore's connection.
    struct FakeController {
        lines: Lines<BufReader<OwnedReadHalf>>,
        writer: OwnedWriteHalf,
    }

    impl FakeController {
        async fn next_line(&mut self) -> String {
            tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
                .await
                .expect("Timed out waiting for Dstore")
                .expect("Read failed")
                .expect("Dstore closed the connection")
        }

        async fn send(&mut self, line: &str) {
            self.writer
                .write_all(format!("{}\n", line).as_bytes())
                .await
                .expect("Write failed");
        }
    }

    async fn start_node(folder: &std::path::Path, timeout: Duration) -> (u16, FakeController) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Bind failed");
        let controller_port = listener.local_addr().expect("No addr").port();

        let node = DstoreNode::start(DstoreConfig {
            port: 0,
            controller_host: "127.0.0.1".to_string(),
            controller_port,
            timeout,
            folder: folder.to_path_buf(),
        })
        .await
        .expect("Dstore failed to start");
        let port = node.port();

        let (stream, _) = listener.accept().await.expect("Accept failed");
        tokio::spawn(node.run());

        let (read_half, writer) = stream.into_split();
        let controller = FakeController {
            lines: BufReader::new(read_half).lines(),
            writer,
        };
        (port, controller)
    }

    async fn store(port: u16, name: &str, contents: &[u8]) -> TcpStream {
        let mut client = TcpStream::connect(("127.0.0.1", port)).await.expect("Connect failed");
        client
            .write_all(format!("STORE {} {}\n", name, contents.len()).as_bytes())
            .await
            .expect("Write failed");

        let mut ack = [0u8; 4];
        client.read_exact(&mut ack).await.expect("No ACK");
        assert_eq!(&ack, b"ACK\n");

        client.write_all(contents).await.expect("Write failed");
        client
    }

    #[tokio::test]
    async fn test_node_joins_stores_loads_and_removes() {
        let dir = tempfile::tempdir().expect("Tempdir failed");
        let (port, mut controller) = start_node(dir.path(), Duration::from_secs(2)).await;

        assert_eq!(controller.next_line().await, format!("JOIN {}", port));

        let _client = store(port, "a.txt", b"payload").await;
        assert_eq!(controller.next_line().await, "STORE_ACK a.txt");
        assert_eq!(
            std::fs::read(dir.path().join("a.txt")).expect("File missing"),
            b"payload"
        );

        let mut loader = TcpStream::connect(("127.0.0.1", port)).await.expect("Connect failed");
        loader.write_all(b"LOAD_DATA a.txt\n").await.expect("Write failed");
        let mut contents = Vec::new();
        loader.read_to_end(&mut contents).await.expect("Read failed");
        assert_eq!(contents, b"payload");

        controller.send("REMOVE a.txt").await;
        assert_eq!(controller.next_line().await, "REMOVE_ACK a.txt");
        assert!(!dir.path().join("a.txt").exists());

        controller.send("REMOVE a.txt").await;
        assert_eq!(controller.next_line().await, "ERROR_FILE_DOES_NOT_EXIST a.txt");
    }

    #[tokio::test]
    async fn test_load_data_for_missing_file_closes_without_data() {
        let dir = tempfile::tempdir().expect("Tempdir failed");
        let (port, mut controller) = start_node(dir.path(), Duration::from_secs(2)).await;
        controller.next_line().await;

        let mut loader = TcpStream::connect(("127.0.0.1", port)).await.expect("Connect failed");
        loader.write_all(b"LOAD_DATA ghost\n").await.expect("Write failed");
        let mut contents = Vec::new();
        loader.read_to_end(&mut contents).await.expect("Read failed");

        assert!(contents.is_empty());
    }

    #[tokio::test]
    async fn test_store_times_out_when_data_is_short() {
        let dir = tempfile::tempdir().expect("Tempdir failed");
        let (port, mut controller) = start_node(dir.path(), Duration::from_millis(200)).await;
        controller.next_line().await;

        let mut client = TcpStream::connect(("127.0.0.1", port)).await.expect("Connect failed");
        client.write_all(b"STORE short.bin 10\n").await.expect("Write failed");
        let mut ack = [0u8; 4];
        client.read_exact(&mut ack).await.expect("No ACK");
        client.write_all(b"abc").await.expect("Write failed");

        // The Dstore gives up and closes the connection.
        let mut rest = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut rest))
            .await
            .expect("Dstore kept the connection open")
            .expect("Read failed");

        assert!(!dir.path().join("short.bin").exists());

        // The Controller never hears about it; the next message is for a later store.
        let _client = store(port, "next.bin", b"ok").await;
        assert_eq!(controller.next_line().await, "STORE_ACK next.bin");
    }

    #[tokio::test]
    async fn test_store_with_huge_declared_size_is_dropped_without_storing() {
        let dir = tempfile::tempdir().expect("Tempdir failed");
        let (port, mut controller) = start_node(dir.path(), Duration::from_millis(200)).await;
        controller.next_line().await;

        for size in [1u64 << 40, u64::MAX] {
            let mut client = TcpStream::connect(("127.0.0.1", port)).await.expect("Connect failed");
            client
                .write_all(format!("STORE huge.bin {}\n", size).as_bytes())
                .await
                .expect("Write failed");
            let mut ack = [0u8; 4];
            client.read_exact(&mut ack).await.expect("No ACK");
            assert_eq!(&ack, b"ACK\n");
            client.write_all(b"abc").await.expect("Write failed");

            let mut rest = Vec::new();
            tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut rest))
                .await
                .expect("Dstore kept the connection open")
                .expect("Read failed");
            assert!(!dir.path().join("huge.bin").exists());
        }

        // The node is still serving.
        let _client = store(port, "after.bin", b"fine").await;
        assert_eq!(controller.next_line().await, "STORE_ACK after.bin");
    }

    #[tokio::test]
    async fn test_store_cut_short_by_client_is_discarded() {
        let dir = tempfile::tempdir().expect("Tempdir failed");
        let (port, mut controller) = start_node(dir.path(), Duration::from_secs(2)).await;
        controller.next_line().await;

        let mut client = TcpStream::connect(("127.0.0.1", port)).await.expect("Connect failed");
        client.write_all(b"STORE cut.bin 10\n").await.expect("Write failed");
        let mut ack = [0u8; 4];
        client.read_exact(&mut ack).await.expect("No ACK");
        client.write_all(b"abc").await.expect("Write failed");
        client.shutdown().await.expect("Shutdown failed");

        let mut rest = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut rest))
            .await
            .expect("Dstore kept the connection open")
            .expect("Read failed");

        assert!(!dir.path().join("cut.bin").exists());
        let _client = store(port, "whole.bin", b"ok").await;
        assert_eq!(controller.next_line().await, "STORE_ACK whole.bin");
    }

    #[tokio::test]
    async fn test_remove_of_invalid_name_is_answered() {
        let dir = tempfile::tempdir().expect("Tempdir failed");
        let (_, mut controller) = start_node(dir.path(), Duration::from_secs(2)).await;
        controller.next_line().await;

        controller.send("REMOVE ../outside").await;

        assert_eq!(
            controller.next_line().await,
            "ERROR_FILE_DOES_NOT_EXIST ../outside"
        );
    }

    #[tokio::test]
    async fn test_node_stops_when_controller_goes_away() {
        let dir = tempfile::tempdir().expect("Tempdir failed");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Bind failed");
        let controller_port = listener.local_addr().expect("No addr").port();

        let node = DstoreNode::start(DstoreConfig {
            port: 0,
            controller_host: "127.0.0.1".to_string(),
            controller_port,
            timeout: Duration::from_secs(1),
            folder: dir.path().to_path_buf(),
        })
        .await
        .expect("Dstore failed to start");
        let (stream, _) = listener.accept().await.expect("Accept failed");
        let handle = tokio::spawn(node.run());

        let mut lines = BufReader::new(stream).lines();
        let join = lines.next_line().await.expect("Read failed");
        assert!(join.is_some_and(|line| line.starts_with("JOIN ")));
        drop(lines);

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("Dstore kept running")
            .expect("Task panicked");
        assert!(result.is_ok());
    }
}
