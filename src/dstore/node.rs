use anyhow::Result;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};

use super::disk::{FileStore, validate_name};
use crate::config::DstoreConfig;
use crate::protocol::message::{Command, Response};
use crate::registry::types::ReplicaId;
use crate::transport::{ConnectionId, LineSender, spawn_writer};

/// A storage node: holds file bytes on disk and answers the Controller.
pub struct DstoreNode {
    config: DstoreConfig,
    port: u16,
    listener: TcpListener,
    controller: TcpStream,
    store: FileStore,
}

impl DstoreNode {
    /// Prepares the storage folder, binds the client port and connects to the
    /// Controller. Nothing is announced until `run`.
    pub async fn start(config: DstoreConfig) -> Result<Self> {
        let store = FileStore::open(&config.folder).await?;
        let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
        let port = listener.local_addr()?.port();
        let controller = TcpStream::connect(config.controller_addr()).await?;

        Ok(Self {
            config,
            port,
            listener,
            controller,
            store,
        })
    }

    /// The port clients reach this node on, which is also its replica id.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Joins the cluster and serves until the Controller connection closes.
    pub async fn run(self) -> Result<()> {
        let existing = self.store.list().await?;
        tracing::info!(
            "Dstore listening on {} with {} existing file(s) in {}",
            self.port,
            existing.len(),
            self.store.root().display()
        );

        let (read_half, write_half) = self.controller.into_split();
        let controller = spawn_writer(ConnectionId::new(), write_half);
        controller.send_line(
            Command::Join {
                port: ReplicaId(self.port),
            }
            .to_string(),
        );

        let control = serve_controller(read_half, self.store.clone(), controller.clone());
        tokio::pin!(control);

        loop {
            tokio::select! {
                result = &mut control => {
                    tracing::warn!("Lost connection to Controller at {}, stopping", self.config.controller_addr());
                    return result;
                }
                accepted = self.listener.accept() => {
                    let (stream, peer_addr) = accepted?;
                    let store = self.store.clone();
                    let controller = controller.clone();
                    let timeout = self.config.timeout;

                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, store, controller, timeout).await {
                            tracing::warn!("Client {} failed: {}", peer_addr, e);
                        }
                    });
                }
            }
        }
    }
}

/// Executes Controller requests until the connection closes.
async fn serve_controller(
    read_half: OwnedReadHalf,
    store: FileStore,
    controller: LineSender,
) -> Result<()> {
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Ok(Command::Remove { name }) => {
                if let Err(e) = validate_name(&name) {
                    tracing::warn!("REMOVE for a name this node cannot hold: {}", e);
                    controller.send_line(Command::FileMissing { name }.to_string());
                    continue;
                }

                let reply = match store.delete(&name).await {
                    Ok(true) => {
                        tracing::info!("Removed {}", name);
                        Command::RemoveAck { name }
                    }
                    Ok(false) => Command::FileMissing { name },
                    Err(e) => {
                        tracing::error!("Failed to remove {}: {}", name, e);
                        continue;
                    }
                };
                controller.send_line(reply.to_string());
            }
            Ok(other) => {
                tracing::warn!("Unexpected {} from Controller", other.token());
            }
            Err(e) => {
                tracing::warn!("Ignoring malformed line {:?} from Controller: {}", line, e);
            }
        }
    }

    Ok(())
}

async fn handle_client(
    stream: TcpStream,
    store: FileStore,
    controller: LineSender,
    timeout: Duration,
) -> Result<()> {
    let peer_addr: SocketAddr = stream.peer_addr()?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }

        match Command::parse(&line) {
            Ok(Command::Store { name, size }) => {
                validate_name(&name)?;

                write_half
                    .write_all(format!("{}\n", Response::Ack).as_bytes())
                    .await?;

                let received =
                    tokio::time::timeout(timeout, store.write_from(&name, &mut reader, size)).await;
                match received {
                    Ok(Ok(written)) if written == size => {}
                    Ok(Ok(written)) => {
                        tracing::warn!(
                            "STORE {} from {} ended after {} of {} bytes",
                            name,
                            peer_addr,
                            written,
                            size
                        );
                        store.delete(&name).await?;
                        return Ok(());
                    }
                    Ok(Err(e)) => {
                        store.delete(&name).await?;
                        return Err(e);
                    }
                    Err(_) => {
                        tracing::warn!("STORE {} from {} timed out waiting for data", name, peer_addr);
                        store.delete(&name).await?;
                        return Ok(());
                    }
                }

                tracing::info!("Stored {} ({} bytes)", name, size);
                controller.send_line(Command::StoreAck { name }.to_string());
            }
            Ok(Command::LoadData { name }) => {
                match store.read(&name).await? {
                    Some(contents) => {
                        write_half.write_all(&contents).await?;
                        tracing::debug!("Served {} ({} bytes) to {}", name, contents.len(), peer_addr);
                    }
                    None => {
                        tracing::warn!("LOAD_DATA {} from {}: no such file", name, peer_addr);
                    }
                }
                write_half.shutdown().await?;
                return Ok(());
            }
            Ok(other) => {
                tracing::warn!("Unexpected {} from client {}", other.token(), peer_addr);
            }
            Err(e) => {
                tracing::warn!("Ignoring malformed line {:?} from {}: {}", line.trim_end(), peer_addr, e);
            }
        }
    }
}
