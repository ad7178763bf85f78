//! Wires the in-process components together and starts their background
//! loops.

use std::sync::Arc;

use parley_core::clock::Clock;
use parley_core::directory::{IdentityDirectory, MembershipDirectory};
use parley_core::ephemeral::EphemeralStore;
use parley_core::repository::ChatRepository;
use parley_ephemeral::InMemoryEphemeralStore;
use parley_event_log::{InMemoryEventLog, spawn_partition_consumers};
use parley_gateway::{
    GatewayServices, RealtimeDispatcher, SubscriptionAuthorizer, SubscriptionHub, TokenVerifier,
};
use parley_presence::{PresenceTracker, TypingTracker, spawn_expiration_router};
use parley_projection::domain::read_model::ReadModelStore;
use parley_projection::{ProjectionEngine, ReadModelDirectory};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::state::AppState;

const PROJECTION_GROUP: &str = "projection";
const GATEWAY_GROUP: &str = "gateway";

/// Running platform: request state plus the background tasks feeding it.
pub struct Platform {
    pub state: AppState,
    pub tasks: Vec<JoinHandle<()>>,
}

impl Platform {
    /// Builds every component and spawns the projection consumers, the
    /// gateway dispatcher consumers and the expiration router.
    ///
    /// Membership questions are answered from `read_model`, so a room is
    /// visible to subscriptions once its `RoomCreated` has been projected.
    /// Passing the same write store and read model to a later `start`
    /// resumes where the previous platform stopped.
    #[must_use]
    pub fn start(
        config: &Config,
        clock: Arc<dyn Clock>,
        chat_repository: Arc<dyn ChatRepository>,
        read_model: Arc<dyn ReadModelStore>,
        identity: Arc<dyn IdentityDirectory>,
        verifier: TokenVerifier,
    ) -> Self {
        let event_log = Arc::new(InMemoryEventLog::new(config.event_log_partitions));
        let membership: Arc<dyn MembershipDirectory> =
            Arc::new(ReadModelDirectory::new(Arc::clone(&read_model)));

        let ephemeral: Arc<dyn EphemeralStore> = Arc::new(InMemoryEphemeralStore::new());
        let expirations = ephemeral.subscribe_expirations();
        let hub = Arc::new(SubscriptionHub::new());
        let presence = Arc::new(PresenceTracker::new(
            Arc::clone(&ephemeral),
            Arc::clone(&membership),
            hub.clone(),
            config.presence_ttl,
            config.collaborator_policy,
        ));
        let typing = Arc::new(TypingTracker::new(ephemeral, hub.clone(), config.typing_ttl));
        let gateway = Arc::new(GatewayServices {
            verifier,
            hub: hub.clone(),
            authorizer: SubscriptionAuthorizer::new(membership, config.collaborator_policy),
            presence: Arc::clone(&presence),
            typing: Arc::clone(&typing),
        });

        let projection = Arc::new(ProjectionEngine::new(
            Arc::clone(&read_model),
            event_log.clone(),
            Arc::clone(&clock),
            config.publish_policy,
        ));
        let mut tasks = spawn_partition_consumers(
            PROJECTION_GROUP,
            event_log.subscribe(PROJECTION_GROUP),
            projection,
        );
        tasks.extend(spawn_partition_consumers(
            GATEWAY_GROUP,
            event_log.subscribe(GATEWAY_GROUP),
            Arc::new(RealtimeDispatcher::new(hub)),
        ));
        tasks.push(spawn_expiration_router(expirations, presence, typing));
        info!(
            partitions = event_log.partitions(),
            tasks = tasks.len(),
            "platform started"
        );

        let state = AppState {
            clock,
            chat_repository,
            identity,
            publisher: event_log,
            read_model,
            gateway,
            collaborator_policy: config.collaborator_policy,
            publish_policy: config.publish_policy,
        };
        Self { state, tasks }
    }

    /// Stops every background task.
    pub fn shutdown(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}
