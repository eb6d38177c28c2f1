use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec};

use crate::api::command_dto::{CommandDto, ResponseDto};
use crate::api::topology_dto::TopologySnapshotDto;
use crate::domain::admission::AdmissionController;
use crate::domain::events::{EventHandler, NetworkEvent};
use crate::domain::id::{HostId, PortNo, SwitchId};
use crate::error::{Error, Result};

const MAX_LINE_LENGTH: usize = 1 << 20;

/// Thin transport adapter: newline-delimited JSON commands over TCP.
///
/// Every connection is an independent task; the commands themselves serialize
/// inside the AdmissionController, so the server needs no coordination of its
/// own. Client requests and the inbound topology/learning feeds share the
/// same vocabulary.
pub struct CommandServer {
    controller: Arc<AdmissionController>,
}

impl CommandServer {
    pub fn new(controller: Arc<AdmissionController>) -> Self {
        Self { controller }
    }

    pub async fn run(&self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        log::info!("Command server listening on {}", addr);

        loop {
            let (stream, peer) = listener.accept().await?;
            log::debug!("Client connected: {}", peer);

            let controller = self.controller.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, controller).await {
                    log::warn!("Connection {} closed with error: {}", peer, e);
                }
            });
        }
    }
}

async fn handle_connection(stream: TcpStream, controller: Arc<AdmissionController>) -> Result<()> {
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));

    while let Some(line) = framed.next().await {
        let line = line.map_err(|e| Error::IoError(std::io::Error::other(e)))?;
        if line.trim().is_empty() {
            continue;
        }

        let response = dispatch_line(&controller, &line).await;
        let text = serde_json::to_string(&response)?;
        framed.send(text).await.map_err(|e| Error::IoError(std::io::Error::other(e)))?;
    }

    Ok(())
}

/// Parses one command line and runs it. Malformed input is answered, never
/// dropped, so an interactive client always sees why a request went nowhere.
pub async fn dispatch_line(controller: &AdmissionController, line: &str) -> ResponseDto {
    match serde_json::from_str::<CommandDto>(line) {
        Ok(command) => dispatch(controller, command).await,
        Err(e) => ResponseDto::error(format!("malformed command: {}", e)),
    }
}

pub async fn dispatch(controller: &AdmissionController, command: CommandDto) -> ResponseDto {
    match command {
        CommandDto::AllocateFlow { src, dst, bandwidth } => {
            match controller.allocate(HostId::new(src), HostId::new(dst), bandwidth).await {
                Ok(outcome) => ResponseDto::ok_with_path(outcome.path.iter().map(|s| s.0).collect()),
                Err(e) => ResponseDto::error(e.to_string()),
            }
        }
        CommandDto::DeleteFlow { src, dst } => match controller.delete(HostId::new(src), HostId::new(dst)).await {
            Ok(()) => ResponseDto::ok(),
            Err(e) => ResponseDto::error(e.to_string()),
        },
        CommandDto::ShowReservation => ResponseDto::ok_with_reservations(controller.query()),
        CommandDto::TopologyUpdate { nodes, links } => {
            controller.handle_event(NetworkEvent::TopologyUpdate(TopologySnapshotDto { nodes, links }));
            ResponseDto::ok()
        }
        CommandDto::HostSeen { host, switch, port, ip } => {
            controller.handle_event(NetworkEvent::HostSeen { host: HostId::new(host), switch: SwitchId(switch), port: PortNo(port), ip });
            ResponseDto::ok()
        }
        CommandDto::SwitchUp { switch } => {
            controller.handle_event(NetworkEvent::SwitchUp(SwitchId(switch)));
            ResponseDto::ok()
        }
        CommandDto::SwitchDown { switch } => {
            controller.handle_event(NetworkEvent::SwitchDown(SwitchId(switch)));
            ResponseDto::ok()
        }
    }
}
