use std::sync::Arc;

use crate::config::Config;
use crate::gateway::arbiter::EditArbiter;
use crate::gateway::handler::EditHandler;
use crate::gateway::registry::SessionRegistry;
use crate::middleware::auth::IdentityResolver;
use crate::pipeline::{EventPublisher, Pipeline};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub arbiter: Arc<EditArbiter>,
    pub handler: Arc<EditHandler>,
    pub publisher: EventPublisher,
    pub identity: Arc<dyn IdentityResolver>,
    pub outbound_queue: usize,
}

impl AppState {
    /// Wire up shared state and start the event pipeline.
    ///
    /// The returned [`Pipeline`] must be kept alive for as long as the
    /// server accepts events.
    pub fn new(config: &Config, identity: Arc<dyn IdentityResolver>) -> (Self, Pipeline) {
        let registry = Arc::new(SessionRegistry::new());
        let arbiter = Arc::new(EditArbiter::new());
        let handler = Arc::new(EditHandler::new(
            Arc::clone(&registry),
            Arc::clone(&arbiter),
            config.send_timeout,
        ));
        let (pipeline, publisher) = Pipeline::start(&config.pipeline(), Arc::clone(&handler));

        let state = Self {
            registry,
            arbiter,
            handler,
            publisher,
            identity,
            outbound_queue: config.outbound_queue.max(1),
        };
        (state, pipeline)
    }
}
