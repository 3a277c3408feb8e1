use std::sync::Arc;

use super::coordinator::ReplicationCoordinator;
use super::error::ControllerError;
use crate::protocol::message::{Command, Response};
use crate::transport::{ConnectionId, LineSender};

/// Routes parsed lines from any connection to the coordinator and writes the
/// immediate reply, if there is one.
#[derive(Clone)]
pub struct ProtocolDispatcher {
    coordinator: Arc<ReplicationCoordinator>,
}

impl ProtocolDispatcher {
    pub fn new(coordinator: Arc<ReplicationCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn dispatch(&self, peer: &LineSender, line: &str) {
        let connection = peer.connection();
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!("Ignoring malformed line {:?} from {}: {}", line, connection, e);
                return;
            }
        };
        tracing::debug!("{} <- {}", connection, command);

        match command {
            Command::Join { port } => self.coordinator.join(peer, port),
            Command::Store { name, size } => {
                if let Err(e) = self.coordinator.store(peer, &name, size) {
                    self.reject(peer, &name, e);
                }
            }
            Command::StoreAck { name } => self.coordinator.store_ack(connection, &name),
            Command::Load { name } => {
                let result = self.coordinator.load(connection, &name);
                self.reply(peer, &name, result);
            }
            Command::Reload { name } => {
                let result = self.coordinator.reload(connection, &name);
                self.reply(peer, &name, result);
            }
            Command::Remove { name } => {
                if let Err(e) = self.coordinator.remove(peer, &name) {
                    self.reject(peer, &name, e);
                }
            }
            Command::RemoveAck { name } | Command::FileMissing { name } => {
                self.coordinator.remove_ack(connection, &name)
            }
            Command::List => {
                let result = self.coordinator.list();
                self.reply(peer, "*", result);
            }
            Command::LoadData { name } => {
                tracing::warn!(
                    "Ignoring LOAD_DATA {} from {}: data is served by Dstores",
                    name,
                    connection
                );
            }
        }
    }

    pub fn disconnected(&self, connection: ConnectionId) {
        self.coordinator.handle_disconnect(connection);
    }

    fn reply(&self, peer: &LineSender, name: &str, result: Result<Response, ControllerError>) {
        match result {
            Ok(response) => {
                peer.send_line(response.to_string());
            }
            Err(e) => self.reject(peer, name, e),
        }
    }

    fn reject(&self, peer: &LineSender, name: &str, error: ControllerError) {
        tracing::debug!("Rejecting request for {} from {}: {}", name, peer.connection(), error);
        peer.send_line(error.token());
    }
}
