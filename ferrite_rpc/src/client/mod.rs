use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use futures::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot, watch, Mutex},
};
use tokio_util::codec::Framed;

use ferrite_messages::{
    hash::BlockHash,
    message::{Call, EventClass, Hello, Message, Reply, Request},
};

use crate::{
    codec::MessageCodec,
    config::{ConnectionConfig, TransportKind},
    constants, Error,
};

mod dispatch;
mod handlers;

pub use handlers::{BlockHandler, NotificationHandlers};

type FramedStream = Framed<TcpStream, MessageCodec>;

/// Lifecycle of a client. Transitions are monotonic; no state is
/// re-enterable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum LifecycleState {
    Connecting,
    Ready,
    ShuttingDown,
    Closed,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LifecycleState::Connecting => write!(f, "connecting"),
            LifecycleState::Ready => write!(f, "ready"),
            LifecycleState::ShuttingDown => write!(f, "shutting down"),
            LifecycleState::Closed => write!(f, "closed"),
        }
    }
}

pub(crate) struct PendingCall {
    reply: oneshot::Sender<Result<Reply, Error>>,
    /// Event classes to activate when the matching ack routes back. Kept
    /// here so the dispatch task updates the subscription set before it
    /// reads the next frame.
    subscribing: Option<Vec<EventClass>>,
}

pub(crate) struct Shared {
    pending: Mutex<HashMap<u64, PendingCall>>,
    subscriptions: Mutex<HashSet<EventClass>>,
    state: watch::Sender<LifecycleState>,
    next_id: AtomicU64,
}

impl Shared {
    /// Moves the lifecycle forward, never backward.
    fn advance(&self, to: LifecycleState) {
        self.state.send_if_modified(|current| {
            if *current < to {
                trace!("lifecycle: {} -> {}", current, to);
                *current = to;
                true
            } else {
                false
            }
        });
    }
}

/// A connection to a ferrited node, multiplexing synchronous calls with
/// server pushed notifications over one transport. Cheap to clone; all
/// clones share the connection.
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
    outbound: mpsc::Sender<Message>,
    state: watch::Receiver<LifecycleState>,
    transport: TransportKind,
}

impl Client {
    /// Establishes the transport and authenticates against the node.
    pub async fn connect(
        config: ConnectionConfig,
        handlers: NotificationHandlers,
    ) -> Result<Client, Error> {
        let stream = TcpStream::connect(&config.host).await?;
        debug!("connected to [{}]", config.host);
        let mut frame = Framed::new(stream, MessageCodec::new());
        frame
            .send(Message::Hello(Hello {
                version: constants::VERSION,
                streaming: config.transport == TransportKind::Streaming,
                user: config.user.clone(),
                secret: config.secret.clone(),
            }))
            .await?;
        match frame.next().await {
            Some(Ok(Message::HelloAck(ack))) => {
                if let Some(expected) = &config.certificates {
                    if expected != &ack.certificate {
                        return Err(Error::TrustError);
                    }
                }
                debug!("authenticated as [{}]", config.user);
            }
            Some(Ok(Message::Reject(reject))) => {
                return Err(Error::ConnectionError(reject.reason))
            }
            Some(Ok(msg)) => {
                return Err(Error::ProtocolError(format!(
                    "unexpected {} during handshake",
                    msg.message_type()
                )))
            }
            Some(Err(e)) => return Err(e.into()),
            None => {
                return Err(Error::ConnectionError(String::from(
                    "connection closed during handshake",
                )))
            }
        }

        let (state_tx, state_rx) = watch::channel(LifecycleState::Connecting);
        let shared = Arc::new(Shared {
            pending: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(HashSet::new()),
            state: state_tx,
            next_id: AtomicU64::new(1),
        });
        shared.advance(LifecycleState::Ready);

        let (outbound_tx, outbound_rx) = mpsc::channel(constants::CHANNEL_CAPACITY);
        let (ntfn_tx, ntfn_rx) = mpsc::unbounded_channel();
        let (sink, stream) = frame.split();
        tokio::spawn(dispatch::write_loop(
            outbound_rx,
            sink,
            shared.state.subscribe(),
        ));
        tokio::spawn(dispatch::dispatch_loop(
            stream,
            shared.clone(),
            ntfn_tx,
            shared.state.subscribe(),
        ));
        tokio::spawn(dispatch::notification_loop(
            ntfn_rx,
            handlers,
            shared.state.subscribe(),
        ));

        Ok(Client {
            shared,
            outbound: outbound_tx,
            state: state_rx,
            transport: config.transport,
        })
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Issues a call and waits for the matching response. There is no
    /// per-call timeout: a server that never answers holds the caller until
    /// the client shuts down.
    pub async fn call(&self, call: Call) -> Result<Reply, Error> {
        self.issue(call, None).await
    }

    async fn issue(
        &self,
        call: Call,
        subscribing: Option<Vec<EventClass>>,
    ) -> Result<Reply, Error> {
        if *self.state.borrow() >= LifecycleState::ShuttingDown {
            return Err(Error::ConnectionClosed);
        }
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.shared.pending.lock().await.insert(
            id,
            PendingCall {
                reply: reply_tx,
                subscribing,
            },
        );
        if self
            .outbound
            .send(Message::Request(Request { id, call }))
            .await
            .is_err()
        {
            self.shared.pending.lock().await.remove(&id);
            return Err(Error::ConnectionClosed);
        }
        if *self.state.borrow() >= LifecycleState::ShuttingDown {
            // the dispatch task may already have drained the table; if our
            // slot is still there nobody will ever cancel it
            if self.shared.pending.lock().await.remove(&id).is_some() {
                return Err(Error::ConnectionClosed);
            }
        }
        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::ConnectionClosed),
        }
    }

    /// Registers for server pushed notifications of the given classes.
    /// Requires a streaming transport. A connection that drops before the
    /// acknowledgement arrives surfaces as [`Error::ConnectionClosed`];
    /// [`Error::ProtocolError`] means the server refused the subscription.
    pub async fn subscribe(&self, classes: &[EventClass]) -> Result<(), Error> {
        if self.transport != TransportKind::Streaming {
            return Err(Error::ProtocolError(String::from(
                "notifications require a streaming transport",
            )));
        }
        match self
            .issue(Call::Subscribe(classes.to_vec()), Some(classes.to_vec()))
            .await?
        {
            Reply::Ack => Ok(()),
            other => Err(Error::ProtocolError(format!(
                "unexpected reply to subscribe: {:?}",
                other
            ))),
        }
    }

    /// Registers for block connect and disconnect notifications.
    pub async fn notify_blocks(&self) -> Result<(), Error> {
        self.subscribe(&[EventClass::BlockConnected, EventClass::BlockDisconnected])
            .await
    }

    pub async fn get_block_count(&self) -> Result<u64, Error> {
        match self.call(Call::BlockCount).await? {
            Reply::BlockCount(count) => Ok(count),
            other => Err(Error::ProtocolError(format!(
                "unexpected reply to block count: {:?}",
                other
            ))),
        }
    }

    pub async fn get_best_block_hash(&self) -> Result<BlockHash, Error> {
        match self.call(Call::BestBlockHash).await? {
            Reply::BlockHash(hash) => Ok(hash),
            other => Err(Error::ProtocolError(format!(
                "unexpected reply to best block hash: {:?}",
                other
            ))),
        }
    }

    /// Stops the client: no new calls are accepted, every pending call is
    /// cancelled with `ConnectionClosed` and the transport is released.
    /// Idempotent and safe to invoke from any task.
    pub async fn shutdown(&self) {
        self.shared.advance(LifecycleState::ShuttingDown);
        self.wait_for_shutdown().await;
    }

    /// Blocks until the client is fully closed; returns immediately if it
    /// already is.
    pub async fn wait_for_shutdown(&self) {
        let mut state = self.state.clone();
        let _ = state
            .wait_for(|state| *state == LifecycleState::Closed)
            .await;
    }
}
