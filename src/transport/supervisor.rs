//! Background task owning the connection: handshake, heartbeat, dispatch
//! and reconnection.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Notify, mpsc, watch};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};
use url::Url;

use super::connector::{Connection, Connector};
use super::error::{TransportError, TransportResult};
use super::packet::{EnginePacket, Handshake, SocketPacket};
use super::policy::ReconnectPolicy;
use super::registry::Registry;
use super::{CONNECT_EVENT, ConnectionState, ConnectionStatus, DISCONNECT_EVENT, OutboundEvent};

/// An established Socket.IO session.
struct Link {
    connection: Connection,
    handshake: Handshake,
    socket_sid: Option<String>,
}

/// Why a live session ended.
enum SessionEnd {
    Shutdown,
    Lost(Option<TransportError>),
}

enum Flow {
    Continue,
    Closed,
}

enum Step {
    Shutdown,
    Frame(Option<String>),
    HeartbeatExpired,
    Outbound(OutboundEvent),
}

pub(crate) struct Supervisor {
    pub(crate) endpoint: Url,
    pub(crate) connect_timeout: Duration,
    pub(crate) policy: ReconnectPolicy,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) registry: Arc<Registry>,
    pub(crate) outbound: mpsc::UnboundedReceiver<OutboundEvent>,
    pub(crate) status: watch::Sender<ConnectionStatus>,
    pub(crate) shutdown: Arc<Notify>,
    /// Event taken off the queue whose send failed; goes out first next session.
    pub(crate) pending: Option<OutboundEvent>,
}

impl Supervisor {
    /// Connect, serve, and reconnect until shutdown or the policy gives up.
    pub(crate) async fn run(mut self) {
        let shutdown = Arc::clone(&self.shutdown);
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                if !self.policy.allows(attempt) {
                    warn!(attempts = attempt - 1, "Giving up on reconnection");
                    self.status.send_modify(|s| s.exhausted = true);
                    break;
                }
                let delay = self.policy.delay_for(attempt);
                debug!(attempt, ?delay, "Scheduling reconnect");
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = shutdown.notified() => break,
                }
            }
            self.status.send_modify(|s| s.attempts = attempt);

            let established = tokio::select! {
                result = self.establish() => result,
                () = shutdown.notified() => break,
            };

            match established {
                Ok(link) => match self.serve(link).await {
                    SessionEnd::Shutdown => break,
                    SessionEnd::Lost(reason) => {
                        self.mark_disconnected(reason);
                        attempt = 1;
                    }
                },
                Err(err) => {
                    warn!(%err, attempt, "Connection attempt failed");
                    let retryable = err.is_retryable();
                    self.status.send_modify(|s| s.last_error = Some(err));
                    if !retryable {
                        self.status.send_modify(|s| s.exhausted = true);
                        break;
                    }
                    attempt = attempt.saturating_add(1);
                }
            }
        }

        debug!("Transport supervisor stopped");
    }

    /// Open the socket and complete both handshakes.
    async fn establish(&self) -> TransportResult<Link> {
        let deadline = Instant::now() + self.connect_timeout;
        let mut connection = self.connector.connect(&self.endpoint).await?;

        let first = timeout_at(deadline, connection.incoming.recv())
            .await
            .map_err(|_| TransportError::Handshake("timed out waiting for open packet".into()))?
            .ok_or_else(|| TransportError::Handshake("closed before open packet".into()))?;
        let EnginePacket::Open(handshake) = EnginePacket::decode(&first)? else {
            return Err(TransportError::Handshake(format!(
                "expected open packet, got {first:?}"
            )));
        };

        send_frame(&connection, SocketPacket::Connect(None).to_frame())?;

        loop {
            let frame = timeout_at(deadline, connection.incoming.recv())
                .await
                .map_err(|_| TransportError::Handshake("timed out waiting for connect ack".into()))?
                .ok_or_else(|| TransportError::Handshake("closed before connect ack".into()))?;

            match EnginePacket::decode(&frame)? {
                EnginePacket::Ping => send_frame(&connection, EnginePacket::Pong.encode())?,
                EnginePacket::Message(data) => match SocketPacket::decode(&data)? {
                    SocketPacket::Connect(ack) => {
                        let socket_sid = ack
                            .as_ref()
                            .and_then(|v| v.get("sid"))
                            .and_then(Value::as_str)
                            .map(str::to_string);
                        return Ok(Link {
                            connection,
                            handshake,
                            socket_sid,
                        });
                    }
                    SocketPacket::ConnectError(reason) => {
                        return Err(TransportError::Rejected(reason.to_string()));
                    }
                    other => debug!(?other, "Ignoring packet before connect ack"),
                },
                EnginePacket::Close => {
                    return Err(TransportError::Handshake("server closed the transport".into()));
                }
                _ => {}
            }
        }
    }

    /// Pump frames for one live session.
    async fn serve(&mut self, link: Link) -> SessionEnd {
        let Link {
            mut connection,
            handshake,
            socket_sid,
        } = link;
        let shutdown = Arc::clone(&self.shutdown);
        let heartbeat = Duration::from_millis(handshake.ping_interval + handshake.ping_timeout);

        self.status.send_modify(|s| {
            s.state = ConnectionState::Connected;
            s.session_id.clone_from(&socket_sid);
            s.attempts = 0;
            s.last_error = None;
            s.exhausted = false;
        });
        info!(
            sid = socket_sid.as_deref().unwrap_or("-"),
            engine_sid = %handshake.sid,
            "Connected to Helix server"
        );
        self.registry.dispatch(CONNECT_EVENT, &Value::Null);

        if let Some(event) = self.pending.take() {
            if let Err(event) = send_event(&connection, event) {
                self.pending = Some(event);
                return SessionEnd::Lost(None);
            }
        }

        let mut deadline = Instant::now() + heartbeat;
        loop {
            let step = tokio::select! {
                () = shutdown.notified() => Step::Shutdown,
                frame = timeout_at(deadline, connection.incoming.recv()) => match frame {
                    Ok(frame) => Step::Frame(frame),
                    Err(_) => Step::HeartbeatExpired,
                },
                Some(event) = self.outbound.recv() => Step::Outbound(event),
            };

            match step {
                Step::Shutdown => {
                    let _ = connection.outgoing.send(SocketPacket::Disconnect.to_frame());
                    self.mark_disconnected(None);
                    return SessionEnd::Shutdown;
                }
                Step::HeartbeatExpired => {
                    return SessionEnd::Lost(Some(TransportError::PingTimeout(heartbeat)));
                }
                Step::Frame(None) => return SessionEnd::Lost(None),
                Step::Frame(Some(frame)) => {
                    deadline = Instant::now() + heartbeat;
                    match self.handle_frame(&connection, &frame) {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Closed) => return SessionEnd::Lost(None),
                        Err(err) => return SessionEnd::Lost(Some(err)),
                    }
                }
                Step::Outbound(event) => {
                    if let Err(event) = send_event(&connection, event) {
                        warn!(event = %event.name, "Connection closed while sending, event kept for next session");
                        self.pending = Some(event);
                        return SessionEnd::Lost(None);
                    }
                }
            }
        }
    }

    fn handle_frame(&self, connection: &Connection, frame: &str) -> TransportResult<Flow> {
        match EnginePacket::decode(frame)? {
            EnginePacket::Ping => send_frame(connection, EnginePacket::Pong.encode())?,
            EnginePacket::Message(data) => match SocketPacket::decode(&data)? {
                SocketPacket::Event { name, payload } => {
                    let handlers = self.registry.dispatch(&name, &payload);
                    debug!(event = %name, handlers, "Dispatched event");
                }
                SocketPacket::Disconnect => {
                    info!("Server closed the Socket.IO session");
                    return Ok(Flow::Closed);
                }
                SocketPacket::ConnectError(reason) => {
                    return Err(TransportError::Rejected(reason.to_string()));
                }
                SocketPacket::Connect(_) => {}
            },
            EnginePacket::Close => return Ok(Flow::Closed),
            EnginePacket::Open(_) => {
                return Err(TransportError::Protocol("unexpected open packet".into()));
            }
            EnginePacket::Pong | EnginePacket::Upgrade | EnginePacket::Noop => {}
        }
        Ok(Flow::Continue)
    }

    fn mark_disconnected(&self, reason: Option<TransportError>) {
        match &reason {
            Some(err) => warn!(%err, "Disconnected from Helix server"),
            None => info!("Disconnected from Helix server"),
        }
        self.status.send_modify(|s| {
            s.state = ConnectionState::Disconnected;
            s.session_id = None;
            if reason.is_some() {
                s.last_error = reason;
            }
        });
        self.registry.dispatch(DISCONNECT_EVENT, &Value::Null);
    }
}

fn send_frame(connection: &Connection, frame: String) -> TransportResult<()> {
    connection
        .outgoing
        .send(frame)
        .map_err(|_| TransportError::Connect("connection closed".into()))
}

/// Send one queued event, handing it back if the connection is gone.
fn send_event(connection: &Connection, event: OutboundEvent) -> Result<(), OutboundEvent> {
    let frame = SocketPacket::Event {
        name: event.name.clone(),
        payload: event.payload.clone(),
    }
    .to_frame();
    if send_frame(connection, frame).is_err() {
        return Err(event);
    }
    debug!(event = %event.name, "Emitted event");
    Ok(())
}
