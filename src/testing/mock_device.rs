//! Mock `AirPlay` device for testing purposes.
//!
//! An in-process TCP server that speaks the device side of the remote-control
//! protocol: pair-verify, PIN pair-setup, the command endpoints, status
//! polling and the reverse event channel. Requests are recorded so tests can
//! assert on exactly what the client sent.

use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rand::Rng;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;

use crate::protocol::crypto::{
    Aes128Ctr, Aes128Gcm, AesMaterial, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature,
    SrpGroup, SrpServer, X25519KeyPair, X25519PublicKey,
};
use crate::protocol::http::{HttpCodec, HttpResponse, OCTET_STREAM};
use crate::protocol::plist::{self, DictBuilder, PlistValue};
use crate::types::{AirPlayDevice, PlaybackState};

/// Identifier reported by [`MockAirPlayDevice::device`]
pub const MOCK_DEVICE_ID: &str = "AA:BB:CC:DD:EE:FF";

const REVERSE_UPGRADE_REPLY: &[u8] =
    b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: PTTH/1.0\r\nConnection: Upgrade\r\n\r\n";

/// A request as received by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Request method
    pub method: String,
    /// Path including query
    pub path: String,
    /// `Content-Type`, if sent
    pub content_type: Option<String>,
    /// Raw body
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Handshake and polling requests are not commands
    #[must_use]
    pub fn is_command(&self) -> bool {
        !self.path.starts_with("/pair-")
            && self.path != "/playback-info"
            && self.path != "/reverse"
    }
}

struct MockState {
    pin: String,
    paired_keys: HashSet<[u8; 32]>,
    playback_info: PlistValue,
    status_overrides: HashMap<String, u16>,
    requests: Vec<RecordedRequest>,
    connections: usize,
    refuse: bool,
    event_acks: usize,
}

struct Shared {
    identity: Ed25519KeyPair,
    state: Mutex<MockState>,
    events: broadcast::Sender<Vec<u8>>,
    drops: broadcast::Sender<()>,
}

/// Per-connection handshake progress
#[derive(Default)]
struct Session {
    verify: Option<VerifyProgress>,
    srp: Option<SrpServer>,
    session_key: Option<Vec<u8>>,
}

struct VerifyProgress {
    cipher: Aes128Ctr,
    client_ephemeral: [u8; 32],
    device_ephemeral: [u8; 32],
    client_long_term: Ed25519PublicKey,
}

/// A mock `AirPlay` device.
///
/// Listens on `127.0.0.1` with an ephemeral port. The accept loop stops when
/// the mock is dropped.
pub struct MockAirPlayDevice {
    address: SocketAddr,
    shared: Arc<Shared>,
    accept: JoinHandle<()>,
}

impl MockAirPlayDevice {
    /// Start a device that pairs with `pin`
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start(pin: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let address = listener.local_addr()?;

        let (events, _) = broadcast::channel(16);
        let (drops, _) = broadcast::channel(4);
        let shared = Arc::new(Shared {
            identity: Ed25519KeyPair::generate(),
            state: Mutex::new(MockState {
                pin: pin.to_string(),
                paired_keys: HashSet::new(),
                playback_info: PlistValue::empty_dict(),
                status_overrides: HashMap::new(),
                requests: Vec::new(),
                connections: 0,
                refuse: false,
                event_acks: 0,
            }),
            events,
            drops,
        });

        let accept = tokio::spawn(Self::accept_loop(listener, shared.clone()));
        tracing::debug!(%address, "Mock device listening");

        Ok(Self {
            address,
            shared,
            accept,
        })
    }

    /// Address the mock listens on
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Device identity pointing at this mock
    #[must_use]
    pub fn device(&self) -> AirPlayDevice {
        AirPlayDevice::new(MOCK_DEVICE_ID, Ipv4Addr::LOCALHOST, self.address.port())
            .with_name("Mock Apple TV")
    }

    /// Accept `key` in pair-verify without pairing first
    pub async fn register_client(&self, key: &Ed25519PublicKey) {
        self.shared
            .state
            .lock()
            .await
            .paired_keys
            .insert(*key.as_bytes());
    }

    /// Whether `key` has been registered
    pub async fn is_paired(&self, key: &Ed25519PublicKey) -> bool {
        self.shared
            .state
            .lock()
            .await
            .paired_keys
            .contains(key.as_bytes())
    }

    /// Replace the `/playback-info` body
    pub async fn set_playback_info(&self, info: PlistValue) {
        self.shared.state.lock().await.playback_info = info;
    }

    /// Report `state` at `position`/`duration` seconds from `/playback-info`
    pub async fn set_playback(&self, state: PlaybackState, position: f64, duration: f64) {
        let info = match state {
            PlaybackState::Stopped => PlistValue::empty_dict(),
            PlaybackState::Playing | PlaybackState::Paused => {
                let rate = if state == PlaybackState::Playing { 1.0 } else { 0.0 };
                DictBuilder::new()
                    .insert("rate", rate)
                    .insert("position", position)
                    .insert("duration", duration)
                    .insert("readyToPlay", true)
                    .build()
            }
        };
        self.set_playback_info(info).await;
    }

    /// Answer every request for `path` with `status` instead of handling it
    pub async fn respond_with(&self, path: &str, status: u16) {
        self.shared
            .state
            .lock()
            .await
            .status_overrides
            .insert(path.to_string(), status);
    }

    /// Handle `path` normally again
    pub async fn clear_response(&self, path: &str) {
        self.shared.state.lock().await.status_overrides.remove(path);
    }

    /// Every request received so far
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.state.lock().await.requests.clone()
    }

    /// Requests other than handshakes, polling and the reverse upgrade
    pub async fn commands(&self) -> Vec<RecordedRequest> {
        self.requests()
            .await
            .into_iter()
            .filter(RecordedRequest::is_command)
            .collect()
    }

    /// Number of requests received for `path`
    pub async fn request_count(&self, path: &str) -> usize {
        self.shared
            .state
            .lock()
            .await
            .requests
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    /// Poll until at least `count` requests for `path` arrived
    ///
    /// Returns false if that does not happen within five seconds.
    pub async fn wait_for_requests(&self, path: &str, count: usize) -> bool {
        let wait = async {
            while self.request_count(path).await < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .is_ok()
    }

    /// TCP connections accepted so far
    pub async fn connection_count(&self) -> usize {
        self.shared.state.lock().await.connections
    }

    /// Poll until at least `count` connections were accepted
    ///
    /// Returns false if that does not happen within five seconds. A counted
    /// connection already listens for [`MockAirPlayDevice::drop_connections`].
    pub async fn wait_for_connections(&self, count: usize) -> bool {
        let wait = async {
            while self.connection_count().await < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .is_ok()
    }

    /// Close every live connection
    pub fn drop_connections(&self) {
        let _ = self.shared.drops.send(());
    }

    /// Close new connections straight after accepting them
    pub async fn refuse_connections(&self, refuse: bool) {
        self.shared.state.lock().await.refuse = refuse;
    }

    /// Push an event to every upgraded reverse channel
    ///
    /// Returns the number of channels it was queued for.
    pub fn push_event(&self, content_type: &str, body: &[u8]) -> usize {
        let mut message = format!(
            "POST /event HTTP/1.1\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        message.extend_from_slice(body);
        self.shared.events.send(message).unwrap_or(0)
    }

    /// Poll until a reverse channel is upgraded and listening for events
    ///
    /// Returns false if that does not happen within five seconds.
    pub async fn wait_for_event_channel(&self) -> bool {
        let wait = async {
            while self.shared.events.receiver_count() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .is_ok()
    }

    /// Acknowledgements received for pushed events
    pub async fn event_acks(&self) -> usize {
        self.shared.state.lock().await.event_acks
    }

    async fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::error!(error = %e, "Mock accept failed");
                    return;
                }
            };

            // Subscribed before the connection is counted
            let drops = shared.drops.subscribe();
            let refuse = {
                let mut state = shared.state.lock().await;
                state.connections += 1;
                state.refuse
            };
            if refuse {
                tracing::debug!(%peer, "Mock refusing connection");
                drop(stream);
                continue;
            }

            tokio::spawn(Self::serve(stream, shared.clone(), drops));
        }
    }

    async fn serve(stream: TcpStream, shared: Arc<Shared>, mut drops: broadcast::Receiver<()>) {
        let _ = stream.set_nodelay(true);
        let (read, mut write) = stream.into_split();
        let mut frames = FramedRead::new(read, HttpCodec::new());
        let mut events = None;
        let mut session = Session::default();

        loop {
            tokio::select! {
                _ = drops.recv() => break,
                Some(message) = next_event(&mut events) => {
                    if write.write_all(&message).await.is_err() {
                        break;
                    }
                }
                frame = frames.next() => {
                    let Some(Ok(message)) = frame else {
                        break;
                    };
                    // Anything with a status line is an event acknowledgement
                    if message.status.is_some() {
                        shared.state.lock().await.event_acks += 1;
                        continue;
                    }
                    let (reply, upgrade) = Self::handle(&shared, &mut session, message).await;
                    if upgrade && events.is_none() {
                        events = Some(shared.events.subscribe());
                    }
                    if write_reply(&mut write, &reply).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    /// Returns the reply bytes and whether the connection became a reverse channel
    async fn handle(
        shared: &Shared,
        session: &mut Session,
        message: HttpResponse,
    ) -> (Vec<u8>, bool) {
        let mut parts = message.start_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();

        let overridden = {
            let mut state = shared.state.lock().await;
            state.requests.push(RecordedRequest {
                method,
                path: path.clone(),
                content_type: message.headers.content_type().map(str::to_string),
                body: message.body.clone(),
            });
            state.status_overrides.get(&path).copied()
        };
        if let Some(status) = overridden {
            return (response(status, None, &[]), false);
        }

        let reply = match path.as_str() {
            "/pair-verify" => Self::pair_verify(shared, session, &message.body).await,
            "/pair-pin-start" => response(200, None, &[]),
            "/pair-setup-pin" => Self::pair_setup(shared, session, &message.body).await,
            "/playback-info" => {
                let info = shared.state.lock().await.playback_info.clone();
                match plist::encode(&info) {
                    Ok(body) => response(200, Some(plist::CONTENT_TYPE), &body),
                    Err(_) => response(500, None, &[]),
                }
            }
            "/reverse" => return (REVERSE_UPGRADE_REPLY.to_vec(), true),
            "/play" | "/stop" | "/photo" => response(200, None, &[]),
            p if p.starts_with("/scrub?position=") || p.starts_with("/rate?value=") => {
                response(200, None, &[])
            }
            _ => response(404, None, &[]),
        };
        (reply, false)
    }

    async fn pair_verify(shared: &Shared, session: &mut Session, body: &[u8]) -> Vec<u8> {
        match body.first() {
            Some(1) if body.len() >= 68 => {
                let mut client_ephemeral = [0u8; 32];
                client_ephemeral.copy_from_slice(&body[4..36]);
                let Ok(client_long_term) = Ed25519PublicKey::from_bytes(&body[36..68]) else {
                    return response(400, None, &[]);
                };
                if !shared
                    .state
                    .lock()
                    .await
                    .paired_keys
                    .contains(client_long_term.as_bytes())
                {
                    return response(470, None, &[]);
                }
                let Ok(peer) = X25519PublicKey::from_bytes(&client_ephemeral) else {
                    return response(400, None, &[]);
                };

                let ephemeral = X25519KeyPair::generate();
                let device_ephemeral = *ephemeral.public_key().as_bytes();
                let shared_secret = ephemeral.diffie_hellman(&peer);
                let material = AesMaterial::derive(
                    b"Pair-Verify-AES-Key",
                    b"Pair-Verify-AES-IV",
                    shared_secret.as_bytes(),
                );
                let Ok(mut cipher) = Aes128Ctr::new(&material.key, &material.iv) else {
                    return response(500, None, &[]);
                };

                let mut signed = device_ephemeral.to_vec();
                signed.extend_from_slice(&client_ephemeral);
                let tail = cipher.process(&shared.identity.sign(&signed).to_bytes());

                let mut reply = device_ephemeral.to_vec();
                reply.extend_from_slice(&tail);
                session.verify = Some(VerifyProgress {
                    cipher,
                    client_ephemeral,
                    device_ephemeral,
                    client_long_term,
                });
                response(200, Some(OCTET_STREAM), &reply)
            }
            Some(0) if body.len() >= 4 => {
                let Some(mut progress) = session.verify.take() else {
                    return response(470, None, &[]);
                };
                let decrypted = progress.cipher.process(&body[4..]);
                let mut signed = progress.client_ephemeral.to_vec();
                signed.extend_from_slice(&progress.device_ephemeral);

                let verified = Ed25519Signature::from_bytes(&decrypted)
                    .and_then(|signature| progress.client_long_term.verify(&signed, &signature));
                if verified.is_ok() {
                    response(200, None, &[])
                } else {
                    response(470, None, &[])
                }
            }
            _ => response(400, None, &[]),
        }
    }

    async fn pair_setup(shared: &Shared, session: &mut Session, body: &[u8]) -> Vec<u8> {
        let Ok(request) = plist::decode(body) else {
            return response(400, None, &[]);
        };

        if let Some(user) = request.get("user").and_then(PlistValue::as_str) {
            let pin = shared.state.lock().await.pin.clone();
            let mut salt = [0u8; 16];
            let mut secret = [0u8; 32];
            {
                let mut rng = rand::thread_rng();
                rng.fill(&mut salt);
                rng.fill(&mut secret);
            }
            secret[0] |= 1;
            let Ok(server) = SrpServer::new(
                SrpGroup::rfc5054_2048(),
                user.as_bytes(),
                pin.as_bytes(),
                &salt,
                &secret,
            ) else {
                return response(500, None, &[]);
            };
            let reply = DictBuilder::new()
                .insert("salt", server.salt())
                .insert("pk", server.public_key())
                .build();
            session.srp = Some(server);
            return plist_response(&reply);
        }

        if let (Some(a_pub), Some(proof)) = (
            request.get("pk").and_then(PlistValue::as_bytes),
            request.get("proof").and_then(PlistValue::as_bytes),
        ) {
            let Some(server) = session.srp.take() else {
                return response(470, None, &[]);
            };
            return match server.verify_client(a_pub, proof) {
                Ok((key, m2)) => {
                    session.session_key = Some(key.as_bytes().to_vec());
                    plist_response(&DictBuilder::new().insert("proof", m2).build())
                }
                Err(_) => response(470, None, &[]),
            };
        }

        if let (Some(epk), Some(tag)) = (
            request.get("epk").and_then(PlistValue::as_bytes),
            request.get("authTag").and_then(PlistValue::as_bytes),
        ) {
            let Some(key) = session.session_key.take() else {
                return response(470, None, &[]);
            };
            let material = AesMaterial::derive(b"Pair-Setup-AES-Key", b"Pair-Setup-AES-IV", &key);
            let mut nonce = material.iv;
            nonce[15] = nonce[15].wrapping_add(1);

            let registered = Aes128Gcm::new(&material.key)
                .and_then(|cipher| cipher.decrypt(&nonce, epk, tag))
                .ok()
                .and_then(|plain| <[u8; 32]>::try_from(plain.as_slice()).ok());
            return match registered {
                Some(public_key) => {
                    shared.state.lock().await.paired_keys.insert(public_key);
                    response(200, None, &[])
                }
                None => response(470, None, &[]),
            };
        }

        response(400, None, &[])
    }
}

impl Drop for MockAirPlayDevice {
    fn drop(&mut self) {
        self.accept.abort();
        let _ = self.shared.drops.send(());
    }
}

impl std::fmt::Debug for MockAirPlayDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAirPlayDevice")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        470 => "Connection Authorization Required",
        _ => "Error",
    }
}

fn response(status: u16, content_type: Option<&str>, body: &[u8]) -> Vec<u8> {
    let mut head = format!("HTTP/1.1 {status} {}\r\n", reason(status));
    if let Some(content_type) = content_type {
        head.push_str(&format!("Content-Type: {content_type}\r\n"));
    }
    head.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));

    let mut out = head.into_bytes();
    out.extend_from_slice(body);
    out
}

fn plist_response(value: &PlistValue) -> Vec<u8> {
    match plist::encode(value) {
        Ok(body) => response(200, Some(plist::CONTENT_TYPE), &body),
        Err(_) => response(500, None, &[]),
    }
}

async fn next_event(events: &mut Option<broadcast::Receiver<Vec<u8>>>) -> Option<Vec<u8>> {
    match events {
        Some(events) => events.recv().await.ok(),
        None => std::future::pending().await,
    }
}

async fn write_reply(write: &mut OwnedWriteHalf, reply: &[u8]) -> std::io::Result<()> {
    write.write_all(reply).await?;
    write.flush().await
}
