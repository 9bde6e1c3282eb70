use crate::error::{AppError, AppResult};
use crate::hub::NotificationHub;
use crate::models::{LedgerSnapshot, ParkingRecordView, ParkingSpaceView, SpaceId};
use crate::recognition::Detection;
use crate::services::FacilityService;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{error, info, warn};
use uuid::Uuid;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Messages sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    Connected {
        client_id: String,
        message: String,
    },
    /// Full facility state after ledger event `sequence`
    Snapshot {
        sequence: u64,
        spaces: Vec<ParkingSpaceView>,
        records: Vec<ParkingRecordView>,
    },
    /// Answer to exactly one client command
    Result {
        success: bool,
        message: String,
        data: Option<serde_json::Value>,
    },
    Error {
        message: String,
    },
}

impl WsMessage {
    pub fn snapshot(sequence: u64, snapshot: &LedgerSnapshot) -> Self {
        WsMessage::Snapshot {
            sequence,
            spaces: snapshot.spaces.clone(),
            records: snapshot.records.clone(),
        }
    }

    fn success<T: Serialize>(message: &str, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => WsMessage::Result {
                success: true,
                message: message.to_string(),
                data: Some(value),
            },
            Err(e) => WsMessage::failure(&AppError::Serialization(e)),
        }
    }

    fn failure(err: &AppError) -> Self {
        WsMessage::Result {
            success: false,
            message: err.to_string(),
            data: None,
        }
    }
}

/// Commands accepted from clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Without `space_id` the lowest free space is used
    Entry {
        space_id: Option<SpaceId>,
        plate_number: String,
    },
    Exit {
        space_id: SpaceId,
    },
    ToggleCharging {
        space_id: SpaceId,
    },
    DeleteRecord {
        record_id: Uuid,
    },
    ListSpaces,
    ListRecords,
    EstimateFee {
        plate_number: String,
    },
    ChargingEstimate {
        space_id: SpaceId,
    },
    Recognize {
        detections: Vec<Detection>,
        /// Hex-encoded frame to cache on first sighting
        image_hex: Option<String>,
    },
}

/// WebSocket server: every connection is one observer and may issue commands
#[derive(Clone)]
pub struct WebSocketServer {
    hub: Arc<NotificationHub>,
    service: Arc<FacilityService>,
}

impl WebSocketServer {
    pub fn new(hub: Arc<NotificationHub>, service: Arc<FacilityService>) -> Self {
        Self { hub, service }
    }

    /// Run one command and build its reply
    pub async fn dispatch(&self, command: ClientCommand) -> WsMessage {
        let result = match command {
            ClientCommand::Entry {
                space_id,
                plate_number,
            } => self
                .service
                .entry(space_id, &plate_number)
                .await
                .map(|record| WsMessage::success("Vehicle entered", &record)),
            ClientCommand::Exit { space_id } => self
                .service
                .exit(space_id)
                .await
                .map(|record| WsMessage::success("Vehicle exited", &record)),
            ClientCommand::ToggleCharging { space_id } => self
                .service
                .toggle_charging(space_id)
                .await
                .map(|space| WsMessage::success("Charging toggled", &space)),
            ClientCommand::DeleteRecord { record_id } => self
                .service
                .delete_record(record_id)
                .await
                .map(|record| WsMessage::success("Record deleted", &record)),
            ClientCommand::ListSpaces => Ok(WsMessage::success(
                "Spaces",
                &self.service.list_spaces().await,
            )),
            ClientCommand::ListRecords => Ok(WsMessage::success(
                "Records",
                &self.service.list_records().await,
            )),
            ClientCommand::EstimateFee { plate_number } => self
                .service
                .estimate_fee(&plate_number)
                .await
                .map(|estimate| WsMessage::success("Fee estimate", &estimate)),
            ClientCommand::ChargingEstimate { space_id } => self
                .service
                .charging_estimate(space_id)
                .await
                .map(|cost| WsMessage::success("Charging estimate", &cost)),
            ClientCommand::Recognize {
                detections,
                image_hex,
            } => self.recognize(detections, image_hex).await,
        };

        result.unwrap_or_else(|e| {
            warn!("Command failed ({}): {}", e.status_code(), e);
            WsMessage::failure(&e)
        })
    }

    async fn recognize(
        &self,
        detections: Vec<Detection>,
        image_hex: Option<String>,
    ) -> AppResult<WsMessage> {
        let image = image_hex
            .map(|h| hex::decode(h.trim()))
            .transpose()
            .map_err(|e| AppError::Validation(format!("image_hex is not valid hex: {}", e)))?;

        let recognition = self.service.recognize(&detections, image.as_deref()).await;
        let message = if recognition.plate_number.is_some() {
            "Plate recognized"
        } else {
            "No plate recognized"
        };
        Ok(WsMessage::success(message, &recognition))
    }

    /// Serve one connection until either side goes away
    pub async fn handle_connection(&self, stream: TcpStream) -> AppResult<()> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| AppError::Message(format!("WebSocket handshake failed: {}", e)))?;

        let (ws_sender, mut ws_receiver) = ws_stream.split();
        let ws_sender = Arc::new(Mutex::new(ws_sender));

        // Subscribe before reading the snapshot so no event falls in between
        let mut observer = self.hub.subscribe().await;
        let client_id = observer.id();
        info!("New WebSocket connection: {}", client_id);

        let welcome = WsMessage::Connected {
            client_id: client_id.to_string(),
            message: "Connected to parking facility".to_string(),
        };
        let (mut seen, snapshot) = self.service.versioned_snapshot().await;
        if send(&ws_sender, &welcome).await.is_err()
            || send(&ws_sender, &WsMessage::snapshot(seen, &snapshot)).await.is_err()
        {
            warn!("Client {} left during handshake", client_id);
            self.hub.unsubscribe(client_id).await;
            return Ok(());
        }

        let server = self.clone();
        let sender_for_replies = Arc::clone(&ws_sender);
        let mut reader = tokio::spawn(async move {
            while let Some(msg) = ws_receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        let reply = match serde_json::from_str::<ClientCommand>(&text) {
                            Ok(command) => server.dispatch(command).await,
                            Err(e) => {
                                warn!("Failed to parse message from client {}: {}", client_id, e);
                                WsMessage::Error {
                                    message: format!("Invalid message format: {}", e),
                                }
                            }
                        };
                        if send(&sender_for_replies, &reply).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("WebSocket connection closed: {}", client_id);
                        break;
                    }
                    Err(e) => {
                        error!("WebSocket error on {}: {}", client_id, e);
                        break;
                    }
                    _ => {}
                }
            }
        });

        loop {
            tokio::select! {
                _ = &mut reader => break,
                event = observer.recv() => match event {
                    Some(event) => {
                        // Already covered by the snapshot sent on connect
                        if event.sequence <= seen {
                            continue;
                        }
                        seen = event.sequence;
                        let update = WsMessage::snapshot(event.sequence, &event.snapshot);
                        if send(&ws_sender, &update).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        warn!("Client {} fell behind and was dropped", client_id);
                        let _ = ws_sender.lock().await.send(Message::Close(None)).await;
                        break;
                    }
                },
            }
        }

        reader.abort();
        self.hub.unsubscribe(client_id).await;
        info!("WebSocket session {} finished", client_id);
        Ok(())
    }
}

async fn send(sender: &Mutex<WsSink>, message: &WsMessage) -> Result<(), ()> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize message: {}", e);
            return Ok(());
        }
    };
    let mut sender = sender.lock().await;
    sender.send(Message::Text(json)).await.map_err(|e| {
        warn!("Failed to send to client: {}", e);
    })
}
