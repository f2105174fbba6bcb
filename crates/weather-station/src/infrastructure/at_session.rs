//! The modem session: bring-up, the service loop, and tear-down.
//!
//! # States
//!
//! ```text
//!                enter_access_point_mode          start_server
//! Uninitialized ───────────────────────▶ ApConfigured ──────────▶ Listening
//!       ▲   (any failure returns here)         ▲                      │
//!       │                                      │ start_server         │ stop_server
//!       └──────────────────────────────────── Stopped ◀──────────────┘
//! ```
//!
//! While `Listening`, every frame the reader task delivers is a notification:
//! it is parsed, handed to the [`RequestHandler`], and the reply (if any) is
//! sent back on the same connection with `AT+CIPSEND`.  Frames that arrive
//! in any other state are dropped as [`DropReason::Inactive`].
//!
//! Dispatch runs to completion before the next frame is taken off the
//! channel, so at most one request is ever in flight.  A slow handler delays
//! every frame queued behind it.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use weather_core::{
    at::{find_subslice, LINE_TERMINATOR, SEND_OK},
    classify, parse_notification, AtCommand, DropReason, LinkEventKind, ModemResponse,
    Notification, RequestHandler, RxFrame,
};

use crate::domain::AccessPointConfig;

/// How often [`AtSession::run`] checks the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    ApConfigured,
    Listening,
    Stopped,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("server is already listening")]
    AlreadyListening,

    #[error("modem answered ERROR to {command}")]
    CommandFailed { command: &'static str },

    #[error("no valid modem response to {command}")]
    NoValidResponse { command: &'static str },

    /// The modem did not accept a reply announcement.  Its state for that
    /// connection is now unknown.
    #[error("reply on connection {connection_id} not accepted by modem ({response:?})")]
    Transmission {
        connection_id: u8,
        response: ModemResponse,
    },

    #[error("modem serial link closed")]
    LinkClosed,

    #[error("modem serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What servicing one notification frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing was received.
    KeepAlive,
    /// A client connected or disconnected.
    LinkEvent {
        kind: LinkEventKind,
        connection_id: Option<u8>,
    },
    /// The handler chose not to reply.
    NoReply { connection_id: u8 },
    /// A reply of `length` bytes was sent.  `acknowledged` is false when the
    /// modem's final `SEND OK` was not seen.
    Replied {
        connection_id: u8,
        length: usize,
        acknowledged: bool,
    },
    /// The frame was discarded.
    Dropped(DropReason),
}

pub struct AtSession<W, H> {
    writer: W,
    frames: mpsc::Receiver<RxFrame>,
    handler: Arc<Mutex<H>>,
    state: SessionState,
    response_timeout: Duration,
}

impl<W, H> AtSession<W, H>
where
    W: AsyncWrite + Unpin,
    H: RequestHandler + 'static,
{
    /// `frames` is the receiving end of [`spawn_frame_reader`]; `handler`
    /// serves every request for the lifetime of the session.
    ///
    /// [`spawn_frame_reader`]: super::frame_receiver::spawn_frame_reader
    pub fn new(
        writer: W,
        frames: mpsc::Receiver<RxFrame>,
        handler: H,
        response_timeout: Duration,
    ) -> Self {
        Self {
            writer,
            frames,
            handler: Arc::new(Mutex::new(handler)),
            state: SessionState::Uninitialized,
            response_timeout,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    // ── Bring-up and tear-down ────────────────────────────────────────────────

    /// Puts the modem into soft access-point mode with the given credentials.
    ///
    /// # Errors
    ///
    /// Rejected while listening.  Any command failure leaves the session
    /// `Uninitialized`; commands already accepted are not rolled back.
    pub async fn enter_access_point_mode(
        &mut self,
        access_point: &AccessPointConfig,
    ) -> Result<(), SessionError> {
        if self.state == SessionState::Listening {
            return Err(SessionError::InvalidState {
                operation: "configure access point",
                state: self.state,
            });
        }
        self.state = SessionState::Uninitialized;

        self.expect_success(&AtCommand::AccessPointMode).await?;
        self.expect_success(&AtCommand::ConfigureAccessPoint {
            ssid: access_point.ssid.clone(),
            password: access_point.password.clone(),
            channel: access_point.channel,
            encryption: access_point.encryption,
        })
        .await?;

        self.state = SessionState::ApConfigured;
        info!(ssid = %access_point.ssid, "access point configured");
        Ok(())
    }

    /// Enables multiplexing and starts listening on `port`.
    ///
    /// The listen command's response is logged but not enforced: the modem
    /// often answers it with `no change` rather than `OK`.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadyListening`] if a server is active,
    /// [`SessionError::InvalidState`] before the access point is configured,
    /// or the multiplex command's failure.
    pub async fn start_server(&mut self, port: u16) -> Result<(), SessionError> {
        match self.state {
            SessionState::Listening => return Err(SessionError::AlreadyListening),
            SessionState::Uninitialized => {
                return Err(SessionError::InvalidState {
                    operation: "start server",
                    state: self.state,
                })
            }
            SessionState::ApConfigured | SessionState::Stopped => {}
        }

        self.expect_success(&AtCommand::EnableMultiplex).await?;
        let response = self.command(&AtCommand::Listen { port }).await?;
        if response != ModemResponse::Success {
            warn!(port, ?response, "listen not confirmed; assuming server is up");
        }

        self.state = SessionState::Listening;
        info!(port, "server listening");
        Ok(())
    }

    /// Stops the server.  Does nothing, and sends nothing, if not listening.
    ///
    /// # Errors
    ///
    /// Only I/O or link failures; the session is `Stopped` either way.
    pub async fn stop_server(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Listening {
            return Ok(());
        }
        self.state = SessionState::Stopped;

        let response = self.command(&AtCommand::StopListening).await?;
        if response != ModemResponse::Success {
            warn!(?response, "stop-listening not confirmed by modem");
        }
        info!("server stopped");
        Ok(())
    }

    // ── Serving ───────────────────────────────────────────────────────────────

    /// Parses one notification frame and answers it.
    ///
    /// # Errors
    ///
    /// [`SessionError::Transmission`] if the reply announcement is refused;
    /// I/O and link failures otherwise.  Malformed input is never an error,
    /// it is [`DispatchOutcome::Dropped`].
    pub async fn service_frame(&mut self, frame: RxFrame) -> Result<DispatchOutcome, SessionError> {
        if self.state != SessionState::Listening {
            return Ok(self.dropped(DropReason::Inactive));
        }

        let request = match parse_notification(&frame) {
            Ok(Notification::KeepAlive) => return Ok(DispatchOutcome::KeepAlive),
            Ok(Notification::Link {
                kind,
                connection_id,
            }) => {
                debug!(?kind, ?connection_id, "link event");
                return Ok(DispatchOutcome::LinkEvent {
                    kind,
                    connection_id,
                });
            }
            Ok(Notification::Data(request)) => request,
            Err(reason) => return Ok(self.dropped(reason)),
        };

        let connection_id = request.connection_id;
        let reply = self.respond(request.payload.to_vec()).await;
        if reply.is_empty() {
            debug!(connection_id, "handler returned no reply");
            return Ok(DispatchOutcome::NoReply { connection_id });
        }

        let announce = AtCommand::Send {
            connection_id,
            length: reply.len(),
        };
        let response = self.command(&announce).await?;
        if response != ModemResponse::Success {
            return Err(SessionError::Transmission {
                connection_id,
                response,
            });
        }

        self.writer.write_all(&reply).await?;
        self.writer.write_all(LINE_TERMINATOR).await?;
        self.writer.flush().await?;

        let ack = self.await_response().await?;
        let acknowledged = find_subslice(ack.as_bytes(), SEND_OK).is_some();
        if !acknowledged {
            warn!(connection_id, "reply sent but SEND OK not seen");
        }
        debug!(connection_id, length = reply.len(), "reply sent");

        Ok(DispatchOutcome::Replied {
            connection_id,
            length: reply.len(),
            acknowledged,
        })
    }

    /// Waits for the next frame and services it.
    ///
    /// # Errors
    ///
    /// [`SessionError::LinkClosed`] once the reader task has ended, otherwise
    /// as [`service_frame`](Self::service_frame).
    pub async fn service_next(&mut self) -> Result<DispatchOutcome, SessionError> {
        let frame = self.frames.recv().await.ok_or(SessionError::LinkClosed)?;
        self.service_frame(frame).await
    }

    /// Serves notifications until `running` is cleared or the link closes.
    ///
    /// A refused reply is logged and serving continues.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] if not listening, and any error other
    /// than [`SessionError::Transmission`] from servicing a frame.
    pub async fn run(&mut self, running: Arc<AtomicBool>) -> Result<(), SessionError> {
        if self.state != SessionState::Listening {
            return Err(SessionError::InvalidState {
                operation: "serve",
                state: self.state,
            });
        }

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping service loop");
                return Ok(());
            }

            let frame = match timeout(SHUTDOWN_POLL, self.frames.recv()).await {
                Err(_) => continue,
                Ok(None) => return Err(SessionError::LinkClosed),
                Ok(Some(frame)) => frame,
            };

            match self.service_frame(frame).await {
                Ok(outcome) => debug!(?outcome, "frame serviced"),
                Err(e @ SessionError::Transmission { .. }) => warn!("{e}"),
                Err(e) => return Err(e),
            }
        }
    }

    /// Runs the handler on the blocking pool; it may touch the EEPROM image.
    /// A panicked handler counts as "no reply".
    async fn respond(&self, payload: Vec<u8>) -> Vec<u8> {
        let handler = Arc::clone(&self.handler);
        let joined = tokio::task::spawn_blocking(move || match handler.lock() {
            Ok(mut handler) => handler.respond(&payload),
            Err(_) => {
                error!("request handler poisoned by an earlier panic");
                Vec::new()
            }
        })
        .await;
        joined.unwrap_or_else(|e| {
            error!("request handler failed: {e}");
            Vec::new()
        })
    }

    // ── Command plumbing ──────────────────────────────────────────────────────

    /// Sends `command` and classifies whatever comes back.
    async fn command(&mut self, command: &AtCommand) -> Result<ModemResponse, SessionError> {
        debug!("→ {command}");
        self.writer.write_all(&command.encode()).await?;
        self.writer.flush().await?;

        let frame = self.await_response().await?;
        let response = classify(&frame);
        if response != ModemResponse::Success {
            warn!(
                command = command.name(),
                ?response,
                overflowed = frame.is_overflowed(),
                "unexpected modem response"
            );
        }
        Ok(response)
    }

    async fn expect_success(&mut self, command: &AtCommand) -> Result<(), SessionError> {
        match self.command(command).await? {
            ModemResponse::Success => Ok(()),
            ModemResponse::Failure => Err(SessionError::CommandFailed {
                command: command.name(),
            }),
            ModemResponse::Indeterminate => Err(SessionError::NoValidResponse {
                command: command.name(),
            }),
        }
    }

    /// Next frame, or an empty one if the modem stays silent for
    /// `response_timeout`.
    async fn await_response(&mut self) -> Result<RxFrame, SessionError> {
        match timeout(self.response_timeout, self.frames.recv()).await {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => Err(SessionError::LinkClosed),
            Err(_) => Ok(RxFrame::empty()),
        }
    }

    fn dropped(&self, reason: DropReason) -> DispatchOutcome {
        debug!(%reason, "notification dropped");
        DispatchOutcome::Dropped(reason)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
