//! Local Event Gateway
//!
//! Bridges the in-process event bus to external agent processes over
//! WebSocket:
//! - every bus event is broadcast to all connected peers
//! - inbound peer messages are re-published onto the bus (tagged with the
//!   proposing agent) and acknowledged
//!
//! The gateway enforces no policy itself; permission checks happen
//! downstream when a re-published event reaches an engine.
//!
//! Concurrency: one dedicated OS thread owns a current-thread tokio runtime
//! running the accept loop, all peer connections, and the broadcast fan-out.
//! Bus publishes from arbitrary threads are handed over through an unbounded
//! channel, never by touching the peer set directly. Events that arrive
//! before any peer is connected are buffered and flushed to the first peer.

pub mod protocol;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use crate::bus::{Event, EventBus, SYSTEM_CHANNEL};
use crate::core::{HubError, HubResult};

use self::protocol::{parse_inbound, Frame};

/// Gateway bind configuration
///
/// Port 0 asks the OS for a free port; the actual address is reported on
/// the returned handle.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8765,
        }
    }
}

/// WebSocket fan-out gateway for the event bus
pub struct LocalEventGateway {
    config: GatewayConfig,
    bus: Arc<EventBus>,
}

/// Handle to a running gateway
///
/// Dropping the handle signals shutdown; `stop` additionally joins the
/// gateway thread.
pub struct GatewayHandle {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl GatewayHandle {
    /// The actual bound address
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and wait for the gateway thread to exit
    pub fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for GatewayHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

impl LocalEventGateway {
    /// Create a gateway over the given bus
    pub fn new(config: GatewayConfig, bus: Arc<EventBus>) -> Self {
        Self { config, bus }
    }

    /// Subscribe to the bus and start serving on a background thread
    ///
    /// Returns once the listening socket is bound. Bind failures are
    /// returned as errors and leave the hosting process intact.
    pub fn start(self) -> HubResult<GatewayHandle> {
        let (events_tx, events_rx) = mpsc::unbounded_channel::<Event>();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<SocketAddr, String>>();

        // Hand every bus event over to the gateway's own loop. Once the
        // gateway is gone the send fails and the event is simply not relayed.
        self.bus.subscribe(SYSTEM_CHANNEL, move |event: &Event| {
            let _ = events_tx.send(event.clone());
            Ok(())
        });

        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let bus = self.bus.clone();

        let thread = std::thread::Builder::new()
            .name("event-gateway".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("runtime build failed: {}", e)));
                        return;
                    }
                };
                runtime.block_on(run_gateway(bind_addr, events_rx, shutdown_rx, bus, ready_tx));
            })
            .map_err(|e| HubError::other(format!("Failed to spawn gateway thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(addr)) => {
                tracing::info!("[LocalEventGateway] listening on ws://{}", addr);
                Ok(GatewayHandle {
                    addr,
                    shutdown: shutdown_tx,
                    thread: Some(thread),
                })
            }
            Ok(Err(msg)) => {
                let _ = thread.join();
                Err(HubError::other(format!("Gateway startup failed: {}", msg)))
            }
            Err(_) => {
                let _ = thread.join();
                Err(HubError::other("Gateway thread exited during startup"))
            }
        }
    }
}

/// The gateway's single event loop
///
/// Owns the peer set. Peers register through `conn_rx` once their
/// handshake completes and deregister through `gone_rx`; broadcasts walk
/// the registered senders and prune any that fail.
async fn run_gateway(
    bind_addr: String,
    mut events_rx: mpsc::UnboundedReceiver<Event>,
    mut shutdown_rx: watch::Receiver<bool>,
    bus: Arc<EventBus>,
    ready_tx: std::sync::mpsc::Sender<Result<SocketAddr, String>>,
) {
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("[LocalEventGateway] Failed to bind {}: {}", bind_addr, e);
            let _ = ready_tx.send(Err(e.to_string()));
            return;
        }
    };
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            let _ = ready_tx.send(Err(e.to_string()));
            return;
        }
    };
    let _ = ready_tx.send(Ok(addr));

    let (conn_tx, mut conn_rx) = mpsc::unbounded_channel::<(u64, mpsc::UnboundedSender<Message>)>();
    let (gone_tx, mut gone_rx) = mpsc::unbounded_channel::<u64>();

    let mut peers: HashMap<u64, mpsc::UnboundedSender<Message>> = HashMap::new();
    // Events relayed while no peer is connected wait here for the first one
    let mut pending: Vec<String> = Vec::new();
    let mut next_peer_id: u64 = 0;

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,

            maybe_event = events_rx.recv() => match maybe_event {
                Some(event) => {
                    let frame = match serde_json::to_string(&event) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!("[LocalEventGateway] Unserializable event {}: {}", event.event_type, e);
                            continue;
                        }
                    };
                    if peers.is_empty() {
                        pending.push(frame);
                    } else {
                        peers.retain(|id, tx| {
                            if tx.send(Message::Text(frame.clone())).is_ok() {
                                true
                            } else {
                                tracing::debug!("[LocalEventGateway] Dropping dead peer {}", id);
                                false
                            }
                        });
                    }
                }
                None => break,
            },

            registration = conn_rx.recv() => {
                if let Some((id, tx)) = registration {
                    for frame in pending.drain(..) {
                        let _ = tx.send(Message::Text(frame));
                    }
                    peers.insert(id, tx);
                }
            }

            departed = gone_rx.recv() => {
                if let Some(id) = departed {
                    peers.remove(&id);
                }
            }

            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    next_peer_id += 1;
                    tokio::spawn(handle_connection(
                        next_peer_id,
                        stream,
                        peer_addr,
                        conn_tx.clone(),
                        gone_tx.clone(),
                        bus.clone(),
                    ));
                }
                Err(e) => {
                    tracing::warn!("[LocalEventGateway] Accept failed: {}", e);
                }
            },
        }
    }

    tracing::info!("[LocalEventGateway] shut down");
}

/// One peer connection: handshake, hello banner, then full-duplex relay
async fn handle_connection(
    id: u64,
    stream: TcpStream,
    peer_addr: SocketAddr,
    conn_tx: mpsc::UnboundedSender<(u64, mpsc::UnboundedSender<Message>)>,
    gone_tx: mpsc::UnboundedSender<u64>,
    bus: Arc<EventBus>,
) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!("[LocalEventGateway] Handshake failed for {}: {}", peer_addr, e);
            return;
        }
    };
    let (mut sink, mut source) = ws.split();

    if sink
        .send(Message::Text(Frame::hello().to_text()))
        .await
        .is_err()
    {
        return;
    }

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
    if conn_tx.send((id, out_tx)).is_err() {
        return;
    }
    tracing::info!("[LocalEventGateway] Peer {} connected from {}", id, peer_addr);

    loop {
        tokio::select! {
            outbound = out_rx.recv() => match outbound {
                Some(message) => {
                    if sink.send(message).await.is_err() {
                        break;
                    }
                }
                None => break,
            },

            inbound = source.next() => match inbound {
                Some(Ok(Message::Text(raw))) => {
                    let reply = handle_agent_message(&bus, &raw);
                    if sink.send(Message::Text(reply.to_text())).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // binary/ping/pong frames carry no protocol meaning
                Some(Err(e)) => {
                    tracing::debug!("[LocalEventGateway] Peer {} read error: {}", id, e);
                    break;
                }
            },
        }
    }

    let _ = gone_tx.send(id);
    tracing::info!("[LocalEventGateway] Peer {} disconnected", id);
}

/// Validate one inbound frame, re-publish it, and build the reply
///
/// Malformed input only elicits a `gateway.error` reply; it never closes
/// the connection.
fn handle_agent_message(bus: &EventBus, raw: &str) -> Frame {
    match parse_inbound(raw) {
        Err(reason) => Frame::error(reason.message()),
        Ok(inbound) => {
            let mut payload = inbound.payload;
            payload.insert("_agent".into(), inbound.agent);
            bus.emit(inbound.event_type.clone(), serde_json::Value::Object(payload));
            Frame::ack(&inbound.event_type)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio_tungstenite::connect_async;

    type WsClient = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn start_gateway(bus: Arc<EventBus>) -> GatewayHandle {
        let config = GatewayConfig {
            host: "127.0.0.1".into(),
            port: 0,
        };
        LocalEventGateway::new(config, bus).start().unwrap()
    }

    async fn connect(handle: &GatewayHandle) -> WsClient {
        let url = format!("ws://{}", handle.local_addr());
        let (ws, _) = connect_async(url).await.unwrap();
        ws
    }

    async fn next_json(ws: &mut WsClient) -> Value {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for frame")
                .expect("connection closed")
                .expect("read error");
            if let Message::Text(text) = message {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_hello_on_connect() {
        let bus = Arc::new(EventBus::new());
        let handle = start_gateway(bus).await;

        let mut ws = connect(&handle).await;
        let hello = next_json(&mut ws).await;
        assert_eq!(hello["type"], "gateway.hello");
        assert_eq!(hello["payload"]["status"], "connected");

        handle.stop();
    }

    #[tokio::test]
    async fn test_inbound_message_acked_and_republished() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            bus.subscribe(SYSTEM_CHANNEL, move |event: &Event| {
                seen.lock().unwrap().push(event.clone());
                Ok(())
            });
        }
        let handle = start_gateway(bus).await;

        let mut ws = connect(&handle).await;
        next_json(&mut ws).await; // hello

        ws.send(Message::Text(
            json!({
                "type": "agent.intent.proposed",
                "payload": {"intent": "x"},
                "agent": {"id": "a1"}
            })
            .to_string(),
        ))
        .await
        .unwrap();

        // The ack and the echoed broadcast both arrive; order is unspecified
        let mut got_ack = false;
        let mut got_echo = false;
        for _ in 0..2 {
            let frame = next_json(&mut ws).await;
            match frame["type"].as_str().unwrap() {
                "gateway.ack" => {
                    assert_eq!(frame["payload"]["received"], "agent.intent.proposed");
                    got_ack = true;
                }
                "agent.intent.proposed" => got_echo = true,
                other => panic!("unexpected frame type {}", other),
            }
        }
        assert!(got_ack && got_echo);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].event_type, "agent.intent.proposed");
        assert_eq!(seen[0].payload["intent"], "x");
        assert_eq!(seen[0].payload["_agent"]["id"], "a1");

        drop(seen);
        handle.stop();
    }

    #[tokio::test]
    async fn test_missing_type_keeps_connection_open() {
        let bus = Arc::new(EventBus::new());
        let handle = start_gateway(bus).await;

        let mut ws = connect(&handle).await;
        next_json(&mut ws).await; // hello

        ws.send(Message::Text(json!({"payload": {}}).to_string()))
            .await
            .unwrap();
        let error = next_json(&mut ws).await;
        assert_eq!(error["type"], "gateway.error");
        assert_eq!(error["payload"]["error"], "Missing 'type' field");

        // Connection still accepts valid messages
        ws.send(Message::Text(
            json!({"type": "ping", "payload": {}}).to_string(),
        ))
        .await
        .unwrap();
        loop {
            let frame = next_json(&mut ws).await;
            if frame["type"] == "gateway.ack" {
                assert_eq!(frame["payload"]["received"], "ping");
                break;
            }
        }

        handle.stop();
    }

    #[tokio::test]
    async fn test_invalid_json_yields_error_reply() {
        let bus = Arc::new(EventBus::new());
        let handle = start_gateway(bus).await;

        let mut ws = connect(&handle).await;
        next_json(&mut ws).await; // hello

        ws.send(Message::Text("{definitely not json".into()))
            .await
            .unwrap();
        let error = next_json(&mut ws).await;
        assert_eq!(error["type"], "gateway.error");
        assert_eq!(error["payload"]["error"], "Invalid JSON");

        handle.stop();
    }

    #[tokio::test]
    async fn test_events_before_first_peer_are_buffered() {
        let bus = Arc::new(EventBus::new());
        let handle = start_gateway(bus.clone()).await;

        bus.emit("system.started", json!({"component": "test"}));

        let mut ws = connect(&handle).await;
        let hello = next_json(&mut ws).await;
        assert_eq!(hello["type"], "gateway.hello");

        let buffered = next_json(&mut ws).await;
        assert_eq!(buffered["type"], "system.started");
        assert_eq!(buffered["payload"]["component"], "test");

        handle.stop();
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_peers_and_prunes_dead_ones() {
        let bus = Arc::new(EventBus::new());
        let handle = start_gateway(bus.clone()).await;

        let mut ws1 = connect(&handle).await;
        let mut ws2 = connect(&handle).await;
        next_json(&mut ws1).await;
        next_json(&mut ws2).await;

        bus.emit("media.registered", json!({"media_id": "m1"}));
        let f1 = next_json(&mut ws1).await;
        let f2 = next_json(&mut ws2).await;
        assert_eq!(f1, f2);
        assert_eq!(f1["type"], "media.registered");

        // Kill one peer; the other must still receive subsequent events
        ws1.close(None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        bus.emit("media.registered", json!({"media_id": "m2"}));
        let frame = next_json(&mut ws2).await;
        assert_eq!(frame["payload"]["media_id"], "m2");

        handle.stop();
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported_not_fatal() {
        let bus = Arc::new(EventBus::new());
        let first = start_gateway(bus.clone()).await;
        let taken = first.local_addr().port();

        let config = GatewayConfig {
            host: "127.0.0.1".into(),
            port: taken,
        };
        let result = LocalEventGateway::new(config, bus).start();
        assert!(result.is_err());

        first.stop();
    }
}
