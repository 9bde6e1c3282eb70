//! Parking Facility Backend Library
//!
//! This module exposes the backend components for use by tests and other consumers.

pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod fees;
pub mod hub;
pub mod images;
pub mod ledger;
pub mod models;
pub mod recognition;
pub mod repositories;
pub mod services;
pub mod websocket;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use clock::Clock;
use database::Database;
use hub::NotificationHub;
use images::ImageStore;
use ledger::{Ledger, LedgerEvents, LedgerSettings};
use recognition::PlatePolicy;
use services::FacilityService;
use std::sync::Arc;
use websocket::WebSocketServer;

/// Everything a request handler needs. Built once at startup, shared by handle.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub hub: Arc<NotificationHub>,
    pub images: Arc<ImageStore>,
    pub service: Arc<FacilityService>,
}

impl AppState {
    /// Load the ledger and wire up the hub, image store and service.
    ///
    /// The returned event stream must be handed to [`NotificationHub::run`]
    /// for observers to see any updates.
    pub async fn initialize(
        config: &AppConfig,
        database: Database,
        clock: Arc<dyn Clock>,
    ) -> AppResult<(Self, LedgerEvents)> {
        let (ledger, events) =
            Ledger::load(database, LedgerSettings::from_config(config), clock).await?;
        let ledger = Arc::new(ledger);

        let images = ImageStore::new(config.images.directory.clone())
            .with_grace_period(config.images.grace_period());
        images.ensure_directory().await?;
        let images = Arc::new(images);

        let service = Arc::new(FacilityService::new(
            ledger.clone(),
            images.clone(),
            PlatePolicy::from(&config.recognition),
        ));

        let state = Self {
            ledger,
            hub: Arc::new(NotificationHub::new(config.observer_queue_capacity)),
            images,
            service,
        };
        Ok((state, events))
    }

    pub fn websocket_server(&self) -> WebSocketServer {
        WebSocketServer::new(self.hub.clone(), self.service.clone())
    }
}
