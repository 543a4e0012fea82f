//! The three background tasks behind a [`Client`](super::Client): a writer
//! owning the sink, a dispatch task owning the read half (the sole reader
//! of the transport) and a notification worker running user callbacks so a
//! slow handler can never stall response routing.

use std::sync::Arc;

use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::{mpsc, watch};

use ferrite_messages::message::{Message, Notification, Response};

use super::{FramedStream, LifecycleState, NotificationHandlers, Shared};
use crate::Error;

pub(super) async fn write_loop(
    mut outbound: mpsc::Receiver<Message>,
    mut sink: SplitSink<FramedStream, Message>,
    mut state: watch::Receiver<LifecycleState>,
) {
    loop {
        tokio::select! {
            message = outbound.recv() => match message {
                Some(message) => {
                    if let Err(e) = sink.send(message).await {
                        warn!("could not write to server: {}", e);
                        break;
                    }
                }
                None => break,
            },
            changed = state.changed() => {
                if changed.is_err() || *state.borrow() >= LifecycleState::ShuttingDown {
                    break;
                }
            }
        }
    }
    let _ = sink.close().await;
}

pub(super) async fn dispatch_loop(
    mut stream: SplitStream<FramedStream>,
    shared: Arc<Shared>,
    ntfn_sender: mpsc::UnboundedSender<Notification>,
    // handed over by `connect` before this task is spawned, so a shutdown
    // racing the first poll is still seen as a change
    mut state: watch::Receiver<LifecycleState>,
) {
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() || *state.borrow() >= LifecycleState::ShuttingDown {
                    break;
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Response(response))) => {
                    route_response(&shared, response).await;
                }
                Some(Ok(Message::Notif(ntfn))) => {
                    let subscribed = shared
                        .subscriptions
                        .lock()
                        .await
                        .contains(&ntfn.event_class());
                    if subscribed {
                        // unbounded so a slow worker never blocks routing
                        let _ = ntfn_sender.send(ntfn);
                    } else {
                        trace!("dropping unsubscribed {} notification", ntfn.event_class());
                    }
                }
                Some(Ok(message)) => {
                    warn!("unexpected {} from server", message.message_type());
                }
                Some(Err(e)) => {
                    warn!("transport error: {}", e);
                    break;
                }
                None => {
                    info!("server closed the connection");
                    break;
                }
            }
        }
    }
    shared.advance(LifecycleState::ShuttingDown);
    cancel_pending(&shared).await;
    shared.advance(LifecycleState::Closed);
}

async fn route_response(shared: &Shared, response: Response) {
    let slot = match shared.pending.lock().await.remove(&response.id) {
        Some(slot) => slot,
        None => {
            warn!("response for unknown request {}", response.id);
            return;
        }
    };
    let result = match response.result {
        Ok(reply) => {
            if let Some(classes) = &slot.subscribing {
                shared
                    .subscriptions
                    .lock()
                    .await
                    .extend(classes.iter().copied());
            }
            Ok(reply)
        }
        Err(reason) => Err(Error::ProtocolError(reason)),
    };
    if slot.reply.send(result).is_err() {
        trace!("caller for request {} went away", response.id);
    }
}

async fn cancel_pending(shared: &Shared) {
    let mut pending = shared.pending.lock().await;
    for (id, slot) in pending.drain() {
        trace!("cancelling pending request {}", id);
        let _ = slot.reply.send(Err(Error::ConnectionClosed));
    }
}

pub(super) async fn notification_loop(
    mut ntfns: mpsc::UnboundedReceiver<Notification>,
    handlers: NotificationHandlers,
    mut state: watch::Receiver<LifecycleState>,
) {
    loop {
        tokio::select! {
            ntfn = ntfns.recv() => match ntfn {
                // events still queued at closure are dropped, not delivered
                Some(_) if *state.borrow() == LifecycleState::Closed => break,
                Some(Notification::BlockConnected { hash, height }) => {
                    if let Some(handler) = &handlers.on_block_connected {
                        handler(&hash, height);
                    }
                }
                Some(Notification::BlockDisconnected { hash, height }) => {
                    if let Some(handler) = &handlers.on_block_disconnected {
                        handler(&hash, height);
                    }
                }
                None => break,
            },
            changed = state.changed() => {
                if changed.is_err() || *state.borrow() == LifecycleState::Closed {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use ferrite_messages::hash::BlockHash;

    #[tokio::test]
    async fn worker_drops_events_queued_at_closure() {
        let (ntfn_tx, ntfn_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(LifecycleState::Ready);

        let delivered = Arc::new(AtomicUsize::new(0));
        let count = delivered.clone();
        let handlers = NotificationHandlers {
            on_block_connected: Some(Box::new(move |_hash, _height| {
                count.fetch_add(1, Ordering::SeqCst);
            })),
            ..NotificationHandlers::default()
        };

        ntfn_tx
            .send(Notification::BlockConnected {
                hash: BlockHash([7; 32]),
                height: 7,
            })
            .unwrap();
        let _ = state_tx.send(LifecycleState::Closed);

        notification_loop(ntfn_rx, handlers, state_rx).await;
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }
}
