use crate::relay::channel_state::ChannelState;
use crate::{ChannelPhase, ProgressEvent, RelayCommand, StreamError, StreamResult};

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::{Mutex, mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// One delivery on the channel: a progress record or a non-fatal error.
pub type RelayEvent = StreamResult<ProgressEvent>;

/// Opens long-lived channels to the backend's progress stream.
pub struct StreamingRelay;

impl StreamingRelay {
    /// Begin connecting to `url` and return immediately.
    ///
    /// Commands sent before the socket opens are buffered and flushed in
    /// order once it does. Must be called from within a tokio runtime.
    pub fn open(url: impl Into<String>) -> (RelayHandle, RelayEvents) {
        let url = url.into();
        let state = Arc::new(Mutex::new(ChannelState::connecting()));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        debug!("Opening streaming channel to {url}");
        tokio::spawn(run_connection(
            url.clone(),
            Arc::clone(&state),
            events_tx,
            shutdown_rx,
        ));

        let handle = RelayHandle {
            url,
            state,
            shutdown: Arc::new(shutdown_tx),
        };

        (handle, RelayEvents { rx: events_rx })
    }

    /// Callback flavour of [`StreamingRelay::open`].
    ///
    /// Handlers run on a dedicated task until the channel closes.
    pub fn open_with_handlers<M, E>(
        url: impl Into<String>,
        mut on_message: M,
        mut on_error: E,
    ) -> RelayHandle
    where
        M: FnMut(ProgressEvent) + Send + 'static,
        E: FnMut(StreamError) + Send + 'static,
    {
        let (handle, mut events) = Self::open(url);

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    Ok(progress) => on_message(progress),
                    Err(e) => on_error(e),
                }
            }
        });

        handle
    }
}

/// Caller-side handle to one streaming channel. Cheap to clone.
#[derive(Clone)]
pub struct RelayHandle {
    url: String,
    state: Arc<Mutex<ChannelState>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl RelayHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn phase(&self) -> ChannelPhase {
        self.state.lock().await.phase()
    }

    /// Ask the backend to start streaming progress for `task_id`.
    pub async fn start_task(&self, task_id: &str) -> StreamResult<()> {
        self.send(RelayCommand::start_task(task_id)).await
    }

    /// Send now if open, buffer if still connecting, reject once closed.
    pub async fn send(&self, command: RelayCommand) -> StreamResult<()> {
        let mut state = self.state.lock().await;

        match &mut *state {
            ChannelState::Connecting { pending } => {
                debug!(
                    "Channel not open yet, buffering command for task {}",
                    command.task_id()
                );
                pending.push_back(command);
                Ok(())
            }
            ChannelState::Open { outbound } => {
                let message = command.encode()?;
                outbound.send(message).map_err(|_| StreamError::closed())
            }
            ChannelState::Closed => Err(StreamError::closed()),
        }
    }

    /// Close the channel. Idempotent; buffered commands are discarded.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if !matches!(*state, ChannelState::Closed) {
            info!("Closing streaming channel to {}", self.url);
        }
        *state = ChannelState::Closed;
        drop(state);

        self.shutdown.send_replace(true);
    }
}

/// Inbound deliveries for one channel.
///
/// Ends (`None`) once the channel is closed from either side.
pub struct RelayEvents {
    rx: mpsc::UnboundedReceiver<RelayEvent>,
}

impl RelayEvents {
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        self.rx.recv().await
    }
}

impl Stream for RelayEvents {
    type Item = RelayEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// =========================================================================
// Connection Task
// =========================================================================

async fn run_connection(
    url: String,
    state: Arc<Mutex<ChannelState>>,
    events: mpsc::UnboundedSender<RelayEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = shutdown.changed() => {
            debug!("Streaming channel to {url} closed before it opened");
            return;
        }
    };

    let socket = match connected {
        Ok((socket, _response)) => socket,
        Err(e) => {
            warn!("Streaming channel to {url} failed to open: {e}");
            *state.lock().await = ChannelState::Closed;
            let _ = events.send(Err(StreamError::transport(e)));
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

    if !flush_pending(&state, outbound_tx, &events).await {
        let _ = sink.close().await;
        return;
    }
    info!("Streaming channel open: {url}");

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => match outbound {
                Some(message) => {
                    if let Err(e) = sink.send(message).await {
                        warn!("Streaming send failed: {e}");
                        let _ = events.send(Err(StreamError::transport(e)));
                    }
                }
                None => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => deliver(&events, ProgressEvent::parse(text.as_str())),
                Some(Ok(Message::Binary(bytes))) => deliver(&events, ProgressEvent::parse_bytes(&bytes)),
                Some(Ok(Message::Close(frame))) => {
                    debug!("Backend closed the streaming channel: {frame:?}");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Streaming receive failed: {e}");
                    let _ = events.send(Err(StreamError::transport(e)));
                }
                None => {
                    debug!("Streaming channel to {url} ended");
                    break;
                }
            },
            _ = shutdown.changed() => break,
        }
    }

    *state.lock().await = ChannelState::Closed;
    if let Err(e) = sink.close().await {
        debug!("Streaming close handshake failed: {e}");
    }
}

/// Move buffered commands into the outbound queue and mark the channel open.
///
/// Returns false if the caller closed the channel while it was connecting.
async fn flush_pending(
    state: &Mutex<ChannelState>,
    outbound: mpsc::UnboundedSender<Message>,
    events: &mpsc::UnboundedSender<RelayEvent>,
) -> bool {
    let mut state = state.lock().await;

    let pending = match &mut *state {
        ChannelState::Connecting { pending } => std::mem::take(pending),
        ChannelState::Open { .. } | ChannelState::Closed => return false,
    };

    if !pending.is_empty() {
        debug!("Flushing {} buffered command(s)", pending.len());
    }

    for command in pending {
        match command.encode() {
            // Receiver is held by the caller of this function
            Ok(message) => {
                let _ = outbound.send(message);
            }
            Err(e) => {
                let _ = events.send(Err(e));
            }
        }
    }

    *state = ChannelState::Open { outbound };
    true
}

fn deliver(events: &mpsc::UnboundedSender<RelayEvent>, event: RelayEvent) {
    if let Err(e) = &event {
        warn!("Malformed progress record on streaming channel: {e}");
    }
    let _ = events.send(event);
}
