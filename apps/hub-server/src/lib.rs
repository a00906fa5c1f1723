pub mod config;
pub mod counters;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;
pub mod store;

use std::sync::Arc;

use config::Config;
use counters::labour::LabourBoard;
use counters::votes::VoteBoard;
use gateway::calls::CallCoordinator;
use gateway::fanout::HubBroadcast;
use gateway::registry::ConnectionRegistry;
use gateway::relay::EventRelay;
use store::CommunityStore;

/// Shared application state available to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ConnectionRegistry>,
    pub broadcast: HubBroadcast,
    pub relay: Arc<EventRelay>,
    pub calls: Arc<CallCoordinator>,
    pub votes: Arc<VoteBoard>,
    pub labour: Arc<LabourBoard>,
    pub store: Arc<dyn CommunityStore>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn CommunityStore>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcast = HubBroadcast::new();
        let relay = Arc::new(EventRelay::new(
            Arc::clone(&registry),
            broadcast.clone(),
            Arc::clone(&store),
        ));
        Self {
            config: Arc::new(config),
            registry,
            broadcast,
            relay,
            calls: Arc::new(CallCoordinator::new()),
            votes: Arc::new(VoteBoard::new()),
            labour: Arc::new(LabourBoard::new()),
            store,
        }
    }
}
