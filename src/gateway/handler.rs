use std::sync::Arc;
use std::time::Duration;

use super::arbiter::{Acquire, EditArbiter, EditHolder};
use super::dispatcher::Dispatcher;
use super::events::{EditAction, EditEvent, EditEventKind, EditResponse};
use super::registry::SessionRegistry;
use super::session::EditSession;
use crate::pipeline::EventProcessor;

/// Applies edit events to the registry and arbiter and fans out the results.
///
/// Pipeline workers call [`EditHandler::handle_event`]; the gateway calls
/// [`EditHandler::handle_open`] and [`EditHandler::handle_disconnect`]
/// directly from the connection task.
pub struct EditHandler {
    registry: Arc<SessionRegistry>,
    arbiter: Arc<EditArbiter>,
    dispatcher: Dispatcher,
}

impl EditHandler {
    pub fn new(
        registry: Arc<SessionRegistry>,
        arbiter: Arc<EditArbiter>,
        send_timeout: Duration,
    ) -> Self {
        let dispatcher = Dispatcher::new(Arc::clone(&registry), send_timeout);
        Self {
            registry,
            arbiter,
            dispatcher,
        }
    }

    pub async fn handle_open(&self, session: &Arc<EditSession>) {
        let watchers = self.registry.join(Arc::clone(session));
        tracing::debug!(
            picture_id = session.picture_id,
            user_id = session.user.id,
            watchers,
            "session joined watch group"
        );
        self.dispatcher
            .broadcast(session.picture_id, &EditResponse::joined(&session.user), None)
            .await;
    }

    pub async fn handle_event(&self, event: EditEvent) {
        let session = &event.session;
        if !session.is_open() {
            tracing::debug!(
                picture_id = event.picture_id,
                session_id = %session.session_id,
                "dropping event from closed session"
            );
            return;
        }
        match event.kind {
            EditEventKind::Enter => self.handle_enter(session).await,
            EditEventKind::Action(action) => self.handle_action(session, action).await,
            EditEventKind::Exit => self.handle_exit(session).await,
            EditEventKind::QueryStatus => self.handle_query(session).await,
        }
    }

    async fn handle_enter(&self, session: &Arc<EditSession>) {
        let picture_id = session.picture_id;
        match self
            .arbiter
            .try_acquire(picture_id, EditHolder::from(session.as_ref()))
        {
            Acquire::Granted => {
                // The socket may have closed between dispatch and acquisition;
                // its cleanup could then have run before this grant existed.
                if !session.is_open() {
                    self.arbiter
                        .release_session(picture_id, &session.session_id);
                    return;
                }
                tracing::info!(picture_id, user_id = session.user.id, "edit token granted");
                self.dispatcher
                    .broadcast(picture_id, &EditResponse::enter_edit(&session.user), None)
                    .await;
            }
            Acquire::AlreadyHolding => {
                self.dispatcher
                    .unicast(session, &EditResponse::held_by(&session.user))
                    .await;
            }
            Acquire::HeldByOther(holder) => {
                tracing::debug!(
                    picture_id,
                    user_id = session.user.id,
                    holder_id = holder.user.id,
                    "edit token already held"
                );
                self.dispatcher
                    .unicast(session, &EditResponse::held_by(&holder.user))
                    .await;
            }
        }
    }

    async fn handle_action(&self, session: &Arc<EditSession>, action: EditAction) {
        let picture_id = session.picture_id;
        if !self.arbiter.is_held_by(picture_id, session.user.id) {
            tracing::debug!(picture_id, user_id = session.user.id, "dropping action from non-holder");
            return;
        }
        self.dispatcher
            .broadcast(
                picture_id,
                &EditResponse::edit_action(&session.user, action),
                Some(&session.session_id),
            )
            .await;
    }

    async fn handle_exit(&self, session: &Arc<EditSession>) {
        let picture_id = session.picture_id;
        if let Some(holder) = self.arbiter.release(picture_id, session.user.id) {
            tracing::info!(picture_id, user_id = holder.user.id, "edit token released");
            self.dispatcher
                .broadcast(picture_id, &EditResponse::exit_edit(&holder.user), None)
                .await;
        }
    }

    async fn handle_query(&self, session: &Arc<EditSession>) {
        let holder = self.arbiter.holder(session.picture_id);
        self.dispatcher
            .unicast(
                session,
                &EditResponse::current_status(holder.as_ref().map(|h| &h.user)),
            )
            .await;
    }

    /// Implicit exit on socket close. Runs inline on the connection task so a
    /// backlogged pipeline can never delay the token release.
    pub async fn handle_disconnect(&self, session: &Arc<EditSession>) {
        if !session.close() {
            return;
        }
        let picture_id = session.picture_id;
        self.registry.leave(picture_id, &session.session_id);

        if let Some(holder) = self.arbiter.release_session(picture_id, &session.session_id) {
            tracing::info!(
                picture_id,
                user_id = holder.user.id,
                "edit token released on disconnect"
            );
            self.dispatcher
                .broadcast(picture_id, &EditResponse::exit_edit(&holder.user), None)
                .await;
        }

        tracing::debug!(
            picture_id,
            user_id = session.user.id,
            "session left watch group"
        );
        self.dispatcher
            .broadcast(picture_id, &EditResponse::left(&session.user), None)
            .await;
    }
}

impl EventProcessor for EditHandler {
    async fn process(&self, event: EditEvent) {
        self.handle_event(event).await
    }
}
