//! Session runtime executor

use super::store::MessageStore;
use super::traits::{ChatClient, HistoryPersistence};
use super::SessionUpdate;

use crate::client::AskRequest;
use crate::state_machine::{transition, Effect, Event, SessionContext, SessionMode, SessionState};
use crate::typing::{TypingSignal, TypingSimulator};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Generic session runtime that can work with any persistence and client implementations
pub struct SessionRuntime<P, C>
where
    P: HistoryPersistence + 'static,
    C: ChatClient + 'static,
{
    context: SessionContext,
    state: SessionState,
    store: MessageStore<P>,
    typing: TypingSignal,
    simulator: TypingSimulator,
    client: Arc<C>,
    event_rx: mpsc::Receiver<Event>,
    /// Weak so the loop ends once every handle is dropped
    event_tx: mpsc::WeakSender<Event>,
    broadcast_tx: broadcast::Sender<SessionUpdate>,
    /// Token to cancel the in-flight remote call
    request_cancel_token: Option<CancellationToken>,
    /// Token to cancel the pending tour step delay
    step_cancel_token: Option<CancellationToken>,
}

impl<P, C> SessionRuntime<P, C>
where
    P: HistoryPersistence + 'static,
    C: ChatClient + 'static,
{
    pub fn new(
        context: SessionContext,
        persistence: P,
        client: C,
        simulator: TypingSimulator,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::WeakSender<Event>,
        broadcast_tx: broadcast::Sender<SessionUpdate>,
    ) -> Self {
        let store = MessageStore::hydrate(persistence, broadcast_tx.clone());
        Self {
            context,
            state: SessionState::Idle,
            store,
            typing: TypingSignal::default(),
            simulator,
            client: Arc::new(client),
            event_rx,
            event_tx,
            broadcast_tx,
            request_cancel_token: None,
            step_cancel_token: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.store.subscribe()
    }

    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.context.session_id,
            entries = self.store.snapshot().len(),
            api_configured = self.context.api_configured,
            "Starting session runtime"
        );

        let _ = self.broadcast_tx.send(SessionUpdate::Init {
            entries: self.store.snapshot().to_vec(),
            mode: self.state.mode(),
        });

        // Process events in a loop - one at a time, so every transition sees
        // the effects of the previous one
        loop {
            tokio::select! {
                Some(event) = self.event_rx.recv() => {
                    self.process_event(event);
                }
                else => break,
            }
        }

        // Every handle is gone; stop anything still in flight
        if let Some(token) = self.request_cancel_token.take() {
            token.cancel();
        }
        if let Some(token) = self.step_cancel_token.take() {
            token.cancel();
        }

        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) if e.is_user_facing() => {
                tracing::info!(
                    session_id = %self.context.session_id,
                    reason = %e,
                    "Command rejected"
                );
                let _ = self.broadcast_tx.send(SessionUpdate::Rejected {
                    reason: e.to_string(),
                });
                return;
            }
            Err(e) => {
                // Late completions after a cancel land here
                tracing::debug!(
                    session_id = %self.context.session_id,
                    error = %e,
                    "Ignoring stale event"
                );
                return;
            }
        };

        let old_state = std::mem::replace(&mut self.state, result.new_state);
        let old_mode = old_state.mode();
        let new_mode = self.state.mode();

        // Observers see the mode go busy before its entries, and go idle after them
        let announce_first = new_mode != old_mode && new_mode != SessionMode::Idle;
        if announce_first {
            self.announce_mode(new_mode);
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }

        // Nothing is in flight once idle
        if self.state.is_idle() {
            self.request_cancel_token = None;
            self.step_cancel_token = None;
        }

        if new_mode != old_mode && !announce_first {
            self.announce_mode(new_mode);
        }
    }

    fn announce_mode(&self, mode: SessionMode) {
        tracing::info!(session_id = %self.context.session_id, mode = ?mode, "Session mode changed");
        let _ = self.broadcast_tx.send(SessionUpdate::ModeChanged { mode });
    }

    /// Execute an effect. Remote calls and delays run as background tasks
    /// that report back through the event channel.
    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendEntry(entry) => {
                self.store.append(entry);
            }

            Effect::ClearHistory => {
                self.store.clear();
            }

            Effect::SetTyping(active) => {
                let changed = if active {
                    self.typing.show()
                } else {
                    self.typing.hide()
                };
                if changed {
                    let _ = self.broadcast_tx.send(SessionUpdate::Typing { active });
                }
            }

            Effect::RequestAnswer {
                request_id,
                question,
            } => {
                // Snapshot taken after the user entry was appended
                let request = AskRequest {
                    question,
                    history: self.store.snapshot().to_vec(),
                };
                let cancel_token = CancellationToken::new();
                self.request_cancel_token = Some(cancel_token.clone());
                let client = Arc::clone(&self.client);
                let event_tx = self.event_tx.clone();

                tokio::spawn(async move {
                    tokio::select! {
                        biased;

                        () = cancel_token.cancelled() => {
                            tracing::info!("Ask request cancelled");
                        }

                        result = client.ask(&request) => {
                            let event = match result {
                                Ok(answer) => Event::AnswerReceived { request_id, answer },
                                Err(e) => Event::AskFailed {
                                    request_id,
                                    message: e.message,
                                },
                            };
                            if !cancel_token.is_cancelled() {
                                report(&event_tx, event).await;
                            }
                        }
                    }
                });
            }

            Effect::RequestTour { request_id } => {
                let cancel_token = CancellationToken::new();
                self.request_cancel_token = Some(cancel_token.clone());
                let client = Arc::clone(&self.client);
                let event_tx = self.event_tx.clone();

                tokio::spawn(async move {
                    tokio::select! {
                        biased;

                        () = cancel_token.cancelled() => {
                            tracing::info!("Tour request cancelled");
                        }

                        result = client.fetch_tour() => {
                            let event = match result {
                                Ok(script) => Event::TourLoaded { request_id, script },
                                Err(e) => Event::TourFailed {
                                    request_id,
                                    message: e.message,
                                },
                            };
                            if !cancel_token.is_cancelled() {
                                report(&event_tx, event).await;
                            }
                        }
                    }
                });
            }

            Effect::ScheduleTourStep {
                request_id,
                text,
                step,
            } => {
                let cancel_token = CancellationToken::new();
                self.step_cancel_token = Some(cancel_token.clone());
                let simulator = self.simulator;
                let event_tx = self.event_tx.clone();

                tokio::spawn(async move {
                    tokio::select! {
                        biased;

                        () = cancel_token.cancelled() => {
                            tracing::debug!(step, "Tour step cancelled");
                        }

                        () = simulator.simulate_delay(&text) => {
                            report(&event_tx, Event::TourStepElapsed { request_id, step }).await;
                        }
                    }
                });
            }

            Effect::AbortRequest => {
                if let Some(token) = self.request_cancel_token.take() {
                    token.cancel();
                }
            }

            Effect::AbortTourStep => {
                if let Some(token) = self.step_cancel_token.take() {
                    token.cancel();
                }
            }
        }
    }
}

/// Send a completion back to the runtime, unless the session has shut down.
///
/// A completion that loses a race with a cancel still arrives, tagged with
/// its old request id, and is dropped by the transition.
async fn report(event_tx: &mpsc::WeakSender<Event>, event: Event) {
    if let Some(tx) = event_tx.upgrade() {
        let _ = tx.send(event).await;
    }
}
