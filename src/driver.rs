// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Async session driver
//!
//! Owns one [`AuthSession`], feeds it events from an mpsc channel and
//! forwards the frames it produces. A session parked in RESPONSE_PENDING
//! is abandoned once the configured timeout passes; dropping it wipes its
//! keys.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::auth::{Action, AuthSession};
use crate::bootstrap::BootstrapInfo;
use crate::error::{DppError, Result};
use crate::protocol::{parse_public_action, OutgoingFrame};

/// Input to a running session
#[derive(Debug, Clone)]
pub enum DriverEvent {
    /// Public Action frame body (category octet onwards)
    Frame(Vec<u8>),
    /// A QR code was scanned while the session may be waiting for it
    NewQrCode(Arc<BootstrapInfo>),
}

/// How a driven session ended
pub enum DriverOutcome {
    /// Exchange finished; the session is returned for the Configuration phase
    Completed {
        session: AuthSession,
        result: Result<()>,
    },
    /// Session failed and was torn down
    Dropped(DppError),
    /// RESPONSE_PENDING outlived the timeout; the session was failed and discarded
    TimedOut(DppError),
    /// Event or frame channel closed before the exchange finished
    Closed(AuthSession),
}

impl fmt::Debug for DriverOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed { result, .. } => f.debug_struct("Completed").field("result", result).finish(),
            Self::Dropped(err) => f.debug_tuple("Dropped").field(err).finish(),
            Self::TimedOut(err) => f.debug_tuple("TimedOut").field(err).finish(),
            Self::Closed(_) => f.write_str("Closed"),
        }
    }
}

enum Step {
    Continue,
    Complete(Result<()>),
    Drop(DppError),
    Closed,
}

/// Drives one session to completion
pub struct SessionDriver {
    session: AuthSession,
    events: mpsc::Receiver<DriverEvent>,
    outgoing: mpsc::Sender<OutgoingFrame>,
    pending_timeout: Duration,
}

impl SessionDriver {
    pub fn new(
        session: AuthSession,
        events: mpsc::Receiver<DriverEvent>,
        outgoing: mpsc::Sender<OutgoingFrame>,
        pending_timeout: Duration,
    ) -> Self {
        Self {
            session,
            events,
            outgoing,
            pending_timeout,
        }
    }

    /// Run until the exchange ends, starting from events only
    pub async fn run(self) -> DriverOutcome {
        self.run_from(Action::AwaitExternalEvent(crate::auth::AwaitReason::PeerFrame))
            .await
    }

    /// Run until the exchange ends, first applying `initial`
    ///
    /// # Arguments
    ///
    /// * `initial` - The action returned when the session was created (the
    ///   Authentication Request to send, or the Responder's first step)
    ///
    /// # Example
    ///
    /// ```ignore
    /// let (session, request) = engine.auth_init(peer_id, None, &InitiatorParams::default())?;
    /// let driver = SessionDriver::new(session, events_rx, frames_tx, timeout);
    /// let outcome = driver
    ///     .run_from(Action::ReplyWithFrame { frame: request, completion: None })
    ///     .await;
    /// ```
    pub async fn run_from(mut self, initial: Action) -> DriverOutcome {
        match self.apply(initial).await {
            Step::Continue => {}
            step => return self.finish(step),
        }

        let mut deadline: Option<Instant> = None;
        loop {
            // 1. Pending deadline starts when the session parks, not per event
            if self.session.is_response_pending() {
                if deadline.is_none() {
                    debug!(
                        "DPP: Session parked in RESPONSE_PENDING for at most {:?}",
                        self.pending_timeout
                    );
                }
                deadline.get_or_insert_with(|| Instant::now() + self.pending_timeout);
            } else {
                deadline = None;
            }

            // 2. Next event
            let event = match deadline {
                Some(at) => match tokio::time::timeout_at(at, self.events.recv()).await {
                    Ok(event) => event,
                    Err(_) => {
                        let err = self.session.fail(DppError::InvalidState(
                            "RESPONSE_PENDING timed out".to_string(),
                        ));
                        return DriverOutcome::TimedOut(err);
                    }
                },
                None => self.events.recv().await,
            };
            let Some(event) = event else {
                debug!("DPP: Event channel closed");
                return DriverOutcome::Closed(self.session);
            };

            // 3. Feed it to the session
            let action = match event {
                DriverEvent::Frame(frame) => match parse_public_action(&frame) {
                    Ok((_, hdr, attrs)) => self.session.handle_incoming(hdr, attrs),
                    Err(e) => {
                        warn!("DPP: Dropping malformed frame: {}", e);
                        continue;
                    }
                },
                DriverEvent::NewQrCode(bi) => match self.session.notify_new_qr_code(&bi) {
                    Some(action) => action,
                    None => continue,
                },
            };

            match self.apply(action).await {
                Step::Continue => {}
                step => return self.finish(step),
            }
        }
    }

    async fn apply(&mut self, action: Action) -> Step {
        match action {
            Action::ReplyWithFrame { frame, completion } => {
                debug!("DPP: Sending {:?} ({} octets)", frame.frame_type, frame.attrs.len());
                if self.outgoing.send(frame).await.is_err() {
                    return Step::Closed;
                }
                match completion {
                    Some(result) => Step::Complete(result),
                    None => Step::Continue,
                }
            }
            Action::AwaitExternalEvent(reason) => {
                debug!("DPP: Waiting for {:?}", reason);
                Step::Continue
            }
            Action::SessionComplete(result) => Step::Complete(result),
            Action::FatalDrop(err) => Step::Drop(err),
        }
    }

    fn finish(self, step: Step) -> DriverOutcome {
        match step {
            Step::Complete(result) => {
                info!("DPP: Session driver finished ok={}", result.is_ok());
                DriverOutcome::Completed {
                    session: self.session,
                    result,
                }
            }
            Step::Drop(err) => DriverOutcome::Dropped(err),
            Step::Closed | Step::Continue => DriverOutcome::Closed(self.session),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{auth_req_rx, InitiatorParams, SessionOptions};
    use crate::bootstrap::{BootstrapGenParams, BootstrapRegistry};
    use crate::protocol::{AllowedRoles, ProtocolVersion};

    fn options(allowed_roles: AllowedRoles, qr_mutual: bool) -> SessionOptions {
        SessionOptions {
            allowed_roles,
            qr_mutual,
            version: ProtocolVersion::LATEST,
        }
    }

    fn gen(registry: &mut BootstrapRegistry) -> Arc<BootstrapInfo> {
        let id = registry.bootstrap_gen(&BootstrapGenParams::default()).unwrap();
        registry.get(id).unwrap()
    }

    fn frame_of(action: Action) -> OutgoingFrame {
        match action {
            Action::ReplyWithFrame { frame, .. } => frame,
            other => panic!("expected a frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_initiator_driven_to_completion() {
        let mut conf = BootstrapRegistry::new(ProtocolVersion::LATEST);
        let mut enrollee = BootstrapRegistry::new(ProtocolVersion::LATEST);
        let enrollee_key = gen(&mut enrollee);
        let peer = conf.add_qr_code(&enrollee_key.uri).unwrap();

        let (session, request) = AuthSession::auth_init(
            &options(AllowedRoles::Configurator, false),
            peer,
            None,
            &InitiatorParams::default(),
        )
        .unwrap();

        let (events_tx, events_rx) = mpsc::channel(4);
        let (frames_tx, mut frames_rx) = mpsc::channel(4);
        let driver = SessionDriver::new(session, events_rx, frames_tx, Duration::from_secs(5));
        let handle = tokio::spawn(driver.run_from(Action::ReplyWithFrame {
            frame: request,
            completion: None,
        }));

        let request = frames_rx.recv().await.unwrap();
        let (mut responder, action) = auth_req_rx(
            &enrollee,
            &options(AllowedRoles::Enrollee, false),
            &request.header(),
            &request.attrs,
        )
        .unwrap();
        let response = frame_of(action);

        // Garbage first; the driver keeps going
        events_tx.send(DriverEvent::Frame(vec![0x04, 0x09])).await.unwrap();
        events_tx
            .send(DriverEvent::Frame(response.to_public_action()))
            .await
            .unwrap();

        let confirm = frames_rx.recv().await.unwrap();
        assert!(matches!(
            responder.handle_incoming(&confirm.header(), &confirm.attrs),
            Action::SessionComplete(Ok(()))
        ));

        match handle.await.unwrap() {
            DriverOutcome::Completed { session, result } => {
                assert!(result.is_ok());
                assert_eq!(session.ke(), responder.ke());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    fn parked_responder() -> (AuthSession, Action, Arc<BootstrapInfo>, AuthSession) {
        let mut conf = BootstrapRegistry::new(ProtocolVersion::LATEST);
        let mut enrollee = BootstrapRegistry::new(ProtocolVersion::LATEST);
        let enrollee_key = gen(&mut enrollee);
        let own = gen(&mut conf);
        let peer = conf.add_qr_code(&enrollee_key.uri).unwrap();

        let (initiator, request) = AuthSession::auth_init(
            &options(AllowedRoles::Configurator, false),
            peer,
            Some(Arc::clone(&own)),
            &InitiatorParams::default(),
        )
        .unwrap();
        let (responder, action) = auth_req_rx(
            &enrollee,
            &options(AllowedRoles::Enrollee, true),
            &request.header(),
            &request.attrs,
        )
        .unwrap();
        assert!(responder.is_response_pending());

        let scanned = enrollee.add_qr_code(&own.uri).unwrap();
        (responder, action, scanned, initiator)
    }

    #[tokio::test]
    async fn test_response_pending_times_out() {
        let (responder, action, _scanned, _initiator) = parked_responder();

        let (_events_tx, events_rx) = mpsc::channel(4);
        let (frames_tx, mut frames_rx) = mpsc::channel(4);
        let driver =
            SessionDriver::new(responder, events_rx, frames_tx, Duration::from_millis(50));
        let outcome = driver.run_from(action).await;

        match outcome {
            DriverOutcome::TimedOut(err) => {
                assert_eq!(err, DppError::InvalidState("RESPONSE_PENDING timed out".to_string()));
                assert!(err.to_string().contains("RESPONSE_PENDING timed out"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        // The RESPONSE_PENDING status frame still went out
        assert!(frames_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_qr_code_resumes_parked_responder() {
        let (responder, action, scanned, mut initiator) = parked_responder();

        let (events_tx, events_rx) = mpsc::channel(4);
        let (frames_tx, mut frames_rx) = mpsc::channel(4);
        let driver = SessionDriver::new(responder, events_rx, frames_tx, Duration::from_secs(5));
        let handle = tokio::spawn(driver.run_from(action));

        let pending = frames_rx.recv().await.unwrap();
        assert!(matches!(
            initiator.handle_incoming(&pending.header(), &pending.attrs),
            Action::AwaitExternalEvent(_)
        ));

        events_tx.send(DriverEvent::NewQrCode(scanned)).await.unwrap();
        let response = frames_rx.recv().await.unwrap();
        let confirm = frame_of(initiator.handle_incoming(&response.header(), &response.attrs));
        events_tx
            .send(DriverEvent::Frame(confirm.to_public_action()))
            .await
            .unwrap();

        match handle.await.unwrap() {
            DriverOutcome::Completed { session, result } => {
                assert!(result.is_ok());
                assert!(session.is_mutual());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_event_channel_returns_session() {
        let (responder, _action, _scanned, _initiator) = parked_responder();
        let (events_tx, events_rx) = mpsc::channel(1);
        let (frames_tx, _frames_rx) = mpsc::channel(1);
        drop(events_tx);

        let driver = SessionDriver::new(responder, events_rx, frames_tx, Duration::from_secs(5));
        match driver.run().await {
            DriverOutcome::Closed(session) => assert!(session.is_response_pending()),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
