//! Shared application state.

use std::sync::Arc;

use parley_command::application::command_handlers::CommandContext;
use parley_core::clock::Clock;
use parley_core::directory::{CallPolicy, IdentityDirectory};
use parley_core::publisher::EventPublisher;
use parley_core::repository::ChatRepository;
use parley_gateway::GatewayServices;
use parley_projection::domain::read_model::ReadModelStore;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub clock: Arc<dyn Clock>,
    /// Relational write store behind the command handlers.
    pub chat_repository: Arc<dyn ChatRepository>,
    pub identity: Arc<dyn IdentityDirectory>,
    /// Event log the command handlers publish to.
    pub publisher: Arc<dyn EventPublisher>,
    /// Read model maintained by the projection engine.
    pub read_model: Arc<dyn ReadModelStore>,
    /// Token verification, subscriptions, presence and typing.
    pub gateway: Arc<GatewayServices>,
    pub collaborator_policy: CallPolicy,
    pub publish_policy: CallPolicy,
}

impl AppState {
    /// Borrows the collaborators a command handler needs.
    #[must_use]
    pub fn command_context(&self) -> CommandContext<'_> {
        CommandContext {
            clock: self.clock.as_ref(),
            repo: self.chat_repository.as_ref(),
            identity: self.identity.as_ref(),
            publisher: self.publisher.as_ref(),
            collaborator_policy: self.collaborator_policy,
            publish_policy: self.publish_policy,
        }
    }
}
