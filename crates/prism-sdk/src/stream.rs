//! Live stream subscriber.
//!
//! A [`StreamSession`] is one authenticated NATS connection. The access
//! token is presented once at connect time and never refreshed on a live
//! connection; when it expires the caller opens a new session.
//!
//! Endpoints are NATS subjects (see
//! [`StreamEndpoints`](crate::StreamEndpoints)). Payloads are JSON.
//!
//! ```rust,no_run
//! use prism_models::UserCounts;
//! use prism_sdk::{StreamEndpoints, StreamSession};
//!
//! # async fn run() -> Result<(), prism_sdk::StreamError> {
//! let mut session = StreamSession::open("nats://localhost:4222", None).await?;
//! let mut counts = session.subscribe::<UserCounts>(&StreamEndpoints::user_counts()).await?;
//! while let Some(c) = counts.next().await {
//!     println!("{} online", c.total());
//! }
//! session.close().await;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use async_nats::ConnectOptions;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use prism_models::Credential;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::StreamError;

const CLIENT_NAME: &str = "prism-admin";

/// Messages buffered between a NATS subscription and its consumer.
const BUFFER: usize = 64;

type EndpointTable = Arc<Mutex<BTreeMap<String, usize>>>;
type Outgoing = (Bytes, oneshot::Sender<Result<(), StreamError>>);

/// One connection to the stream transport.
///
/// Every subscription and channel is served by a pump task owned by the
/// session. [`close`](Self::close) stops the pumps, which unsubscribe on
/// their way out, and then drops the connection.
pub struct StreamSession {
    client: Option<async_nats::Client>,
    closed: watch::Sender<bool>,
    endpoints: EndpointTable,
    pumps: Mutex<Vec<JoinHandle<()>>>,
}

impl StreamSession {
    /// Connect, presenting the access token of `credential` when given.
    ///
    /// # Errors
    ///
    /// [`StreamError::Connect`] when the server is unreachable or rejects
    /// the token. The session is unusable; open a new one.
    pub async fn open(url: &str, credential: Option<&Credential>) -> Result<Self, StreamError> {
        let options = match credential {
            Some(c) => ConnectOptions::with_token(c.access_token.clone()),
            None => ConnectOptions::new(),
        }
        .name(CLIENT_NAME);

        let client = async_nats::connect_with_options(url, options).await?;
        info!(url, authenticated = credential.is_some(), "stream session opened");
        Ok(Self::with_client(Some(client)))
    }

    fn with_client(client: Option<async_nats::Client>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            client,
            closed,
            endpoints: EndpointTable::default(),
            pumps: Mutex::default(),
        }
    }

    /// Subscribe to a server-to-client endpoint.
    pub async fn subscribe<T>(&self, endpoint: &str) -> Result<Subscription<T>, StreamError>
    where
        T: DeserializeOwned,
    {
        let subscriber = self.client()?.subscribe(endpoint.to_string()).await?;
        debug!(endpoint, "subscribed");
        let (tx, rx) = mpsc::channel(BUFFER);
        self.spawn_pump(Pump {
            endpoint: endpoint.to_string(),
            subscriber,
            inbound: tx,
            outbound: None,
            closed: self.closed.subscribe(),
        });
        Ok(self.attach(endpoint, receiver_stream(rx)))
    }

    /// Open a bidirectional sub-connection on `endpoint`.
    ///
    /// Messages sent through the channel carry a private reply inbox;
    /// replies published there are decoded as `T`.
    pub async fn channel<T>(&self, endpoint: &str) -> Result<Channel<T>, StreamError>
    where
        T: DeserializeOwned,
    {
        let client = self.client()?;
        let inbox = client.new_inbox();
        let subscriber = client.subscribe(inbox.clone()).await?;
        debug!(endpoint, inbox = %inbox, "channel opened");

        let (reply_tx, reply_rx) = mpsc::channel(BUFFER);
        let (send_tx, send_rx) = mpsc::channel(BUFFER);
        self.spawn_pump(Pump {
            endpoint: endpoint.to_string(),
            subscriber,
            inbound: reply_tx,
            outbound: Some(Outbound {
                client: client.clone(),
                inbox,
                requests: send_rx,
            }),
            closed: self.closed.subscribe(),
        });
        Ok(self.link_channel(endpoint, receiver_stream(reply_rx), send_tx))
    }

    /// Endpoints with at least one live subscription or channel.
    pub fn active_endpoints(&self) -> Vec<String> {
        self.endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Unsubscribe everything, then release the connection.
    ///
    /// Idempotent. No message is delivered by any subscription or channel
    /// of this session afterwards.
    pub async fn close(&mut self) {
        self.closed.send_replace(true);

        let pumps = std::mem::take(
            self.pumps
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for pump in pumps {
            if let Err(e) = pump.await {
                warn!(error = %e, "stream pump ended abnormally");
            }
        }

        if let Some(client) = self.client.take() {
            if let Err(e) = client.flush().await {
                warn!(error = %e, "flush on close failed");
            }
            info!("stream session closed");
        }
        self.endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn client(&self) -> Result<&async_nats::Client, StreamError> {
        self.client.as_ref().ok_or(StreamError::Closed)
    }

    fn spawn_pump(&self, pump: Pump) {
        let handle = tokio::spawn(pump.run());
        let mut pumps = self.pumps.lock().unwrap_or_else(PoisonError::into_inner);
        pumps.retain(|p| !p.is_finished());
        pumps.push(handle);
    }

    fn attach<T>(&self, endpoint: &str, payloads: BoxStream<'static, Bytes>) -> Subscription<T> {
        *self
            .endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(endpoint.to_string())
            .or_default() += 1;
        Subscription {
            endpoint: endpoint.to_string(),
            inner: Some(payloads),
            closed: self.closed.subscribe(),
            endpoints: Arc::clone(&self.endpoints),
            _marker: PhantomData,
        }
    }

    fn link_channel<T>(
        &self,
        endpoint: &str,
        replies: BoxStream<'static, Bytes>,
        outgoing: mpsc::Sender<Outgoing>,
    ) -> Channel<T> {
        Channel {
            endpoint: endpoint.to_string(),
            outgoing,
            replies: self.attach(endpoint, replies),
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        // Pumps see the flag and unsubscribe on their own.
        self.closed.send_replace(true);
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("closed", &self.is_closed())
            .field("endpoints", &self.active_endpoints())
            .finish_non_exhaustive()
    }
}

fn receiver_stream(rx: mpsc::Receiver<Bytes>) -> BoxStream<'static, Bytes> {
    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|payload| (payload, rx))
    })
    .boxed()
}

// ---------------------------------------------------------------------------
// Pump
// ---------------------------------------------------------------------------

/// Publishing half of a channel pump.
struct Outbound {
    client: async_nats::Client,
    inbox: String,
    requests: mpsc::Receiver<Outgoing>,
}

/// Moves messages between one NATS subscription and its consumer until
/// the session closes or the consumer goes away.
struct Pump {
    endpoint: String,
    subscriber: async_nats::Subscriber,
    inbound: mpsc::Sender<Bytes>,
    outbound: Option<Outbound>,
    closed: watch::Receiver<bool>,
}

enum Event {
    Stop,
    Inbound(Bytes),
    Outgoing(Outgoing),
}

impl Pump {
    async fn run(mut self) {
        loop {
            let closed = *self.closed.borrow_and_update();
            if closed {
                break;
            }
            let event = tokio::select! {
                biased;
                _ = self.closed.changed() => Event::Stop,
                // Consumer dropped its subscription or channel.
                () = self.inbound.closed() => Event::Stop,
                outgoing = next_outgoing(&mut self.outbound) => match outgoing {
                    Some(outgoing) => Event::Outgoing(outgoing),
                    None => Event::Stop,
                },
                message = self.subscriber.next() => match message {
                    Some(message) => Event::Inbound(message.payload),
                    None => {
                        debug!(endpoint = %self.endpoint, "server ended subscription");
                        return;
                    }
                },
            };

            match event {
                Event::Stop => break,
                Event::Outgoing((payload, ack)) => {
                    let _ = ack.send(self.publish(payload).await);
                }
                Event::Inbound(payload) => {
                    let delivered = tokio::select! {
                        biased;
                        _ = self.closed.changed() => false,
                        sent = self.inbound.send(payload) => sent.is_ok(),
                    };
                    if !delivered {
                        break;
                    }
                }
            }
        }

        if let Err(e) = self.subscriber.unsubscribe().await {
            warn!(endpoint = %self.endpoint, error = %e, "unsubscribe failed");
        } else {
            debug!(endpoint = %self.endpoint, "unsubscribed");
        }
    }

    async fn publish(&self, payload: Bytes) -> Result<(), StreamError> {
        let Some(outbound) = &self.outbound else {
            return Err(StreamError::Closed);
        };
        outbound
            .client
            .publish_with_reply(self.endpoint.clone(), outbound.inbox.clone(), payload)
            .await?;
        Ok(())
    }
}

async fn next_outgoing(outbound: &mut Option<Outbound>) -> Option<Outgoing> {
    match outbound {
        Some(outbound) => outbound.requests.recv().await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Decoded messages of one endpoint, in arrival order.
///
/// Malformed payloads are logged and skipped. The sequence ends when the
/// server ends it, when the session is closed, or on [`cancel`](Self::cancel).
pub struct Subscription<T> {
    endpoint: String,
    inner: Option<BoxStream<'static, Bytes>>,
    closed: watch::Receiver<bool>,
    endpoints: EndpointTable,
    _marker: PhantomData<fn() -> T>,
}

enum Step {
    Closed,
    Payload(Option<Bytes>),
}

impl<T: DeserializeOwned> Subscription<T> {
    /// Next decoded message, or `None` once the subscription has ended.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            if *self.closed.borrow() {
                self.inner = None;
            }
            let inner = self.inner.as_mut()?;

            let step = tokio::select! {
                biased;
                changed = self.closed.changed() => match changed {
                    Ok(()) => continue,
                    Err(_) => Step::Closed,
                },
                payload = inner.next() => Step::Payload(payload),
            };

            match step {
                Step::Closed | Step::Payload(None) => {
                    debug!(endpoint = %self.endpoint, "subscription ended");
                    self.inner = None;
                    return None;
                }
                Step::Payload(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
                    Ok(message) => return Some(message),
                    Err(e) => {
                        warn!(endpoint = %self.endpoint, error = %e, "dropping malformed message");
                    }
                },
            }
        }
    }
}

impl<T> Subscription<T> {
    /// Endpoint this subscription listens on.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Stop receiving; later calls to `next` return `None`. The pump
    /// notices the dropped receiver and unsubscribes.
    pub fn cancel(&mut self) {
        self.inner = None;
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl<T: DeserializeOwned + Send + 'static> Subscription<T> {
    /// Adapt into a [`futures::Stream`].
    pub fn into_stream(self) -> BoxStream<'static, T> {
        futures::stream::unfold(self, |mut sub| async move {
            sub.next().await.map(|message| (message, sub))
        })
        .boxed()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        let mut endpoints = self
            .endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = endpoints.get_mut(&self.endpoint) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                endpoints.remove(&self.endpoint);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Bidirectional sub-connection: JSON out, decoded replies in.
///
/// The channel holds no connection of its own; sends go through the
/// session's pump and fail with [`StreamError::Closed`] once the session
/// is closed.
pub struct Channel<T> {
    endpoint: String,
    outgoing: mpsc::Sender<Outgoing>,
    replies: Subscription<T>,
}

impl<T: DeserializeOwned> Channel<T> {
    /// Publish `message` on the endpoint with this channel's reply inbox.
    pub async fn send<M: Serialize + ?Sized>(&self, message: &M) -> Result<(), StreamError> {
        if self.replies.is_closed() {
            return Err(StreamError::Closed);
        }
        let payload = serde_json::to_vec(message)?;
        let (ack, published) = oneshot::channel();
        self.outgoing
            .send((payload.into(), ack))
            .await
            .map_err(|_| StreamError::Closed)?;
        published.await.unwrap_or(Err(StreamError::Closed))
    }

    /// Next decoded reply.
    pub async fn next(&mut self) -> Option<T> {
        self.replies.next().await
    }

    /// Endpoint the channel publishes to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_models::UserCounts;

    fn payloads(items: &[&str]) -> BoxStream<'static, Bytes> {
        let items: Vec<Bytes> = items
            .iter()
            .map(|s| Bytes::copy_from_slice(s.as_bytes()))
            .collect();
        futures::stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn malformed_messages_are_skipped() {
        let session = StreamSession::with_client(None);
        let mut sub: Subscription<UserCounts> = session.attach(
            "api.v1.status.user-counts",
            payloads(&[
                r#"{"authenticatedUserCount":1,"anonymousUserCount":2}"#,
                "garbage",
                r#"{"authenticatedUserCount":3,"anonymousUserCount":4}"#,
            ]),
        );
        assert_eq!(sub.next().await.map(|c| c.total()), Some(3));
        assert_eq!(sub.next().await.map(|c| c.total()), Some(7));
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_silences_subscriptions() {
        let mut session = StreamSession::with_client(None);
        let mut sub: Subscription<UserCounts> = session.attach(
            "api.v1.status.user-counts",
            payloads(&[r#"{"authenticatedUserCount":1,"anonymousUserCount":1}"#]),
        );
        assert_eq!(session.active_endpoints(), ["api.v1.status.user-counts"]);

        session.close().await;
        session.close().await;
        assert!(session.is_closed());
        assert!(session.active_endpoints().is_empty());
        assert_eq!(sub.next().await, None);
        assert!(matches!(
            session.subscribe::<UserCounts>("x").await,
            Err(StreamError::Closed)
        ));
    }

    #[tokio::test]
    async fn cancel_ends_subscription() {
        let session = StreamSession::with_client(None);
        let mut sub: Subscription<UserCounts> = session.attach(
            "api.v1.status.user-counts",
            payloads(&[r#"{"authenticatedUserCount":1,"anonymousUserCount":1}"#]),
        );
        sub.cancel();
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn into_stream_yields_in_arrival_order() {
        let session = StreamSession::with_client(None);
        let sub: Subscription<u32> = session.attach("n", payloads(&["1", "oops", "2", "3"]));
        let items: Vec<u32> = sub.into_stream().collect().await;
        assert_eq!(items, [1, 2, 3]);
        assert!(session.active_endpoints().is_empty());
    }

    #[tokio::test]
    async fn channel_sends_through_pump_and_decodes_replies() {
        let session = StreamSession::with_client(None);
        let (tx, mut rx) = mpsc::channel::<Outgoing>(4);
        let mut channel: Channel<UserCounts> = session.link_channel(
            "api.v1.channel.counts",
            payloads(&[
                "not json",
                r#"{"authenticatedUserCount":2,"anonymousUserCount":5}"#,
            ]),
            tx,
        );

        let pump = tokio::spawn(async move {
            let (payload, ack) = rx.recv().await.unwrap();
            ack.send(Ok(())).unwrap();
            payload
        });
        channel.send(&serde_json::json!({ "op": "refresh" })).await.unwrap();
        assert_eq!(&pump.await.unwrap()[..], br#"{"op":"refresh"}"#);

        assert_eq!(channel.next().await.map(|c| c.total()), Some(7));
        assert_eq!(channel.endpoint(), "api.v1.channel.counts");
        assert_eq!(session.active_endpoints(), ["api.v1.channel.counts"]);
    }

    #[tokio::test]
    async fn channel_send_after_close_fails() {
        let mut session = StreamSession::with_client(None);
        let (tx, _rx) = mpsc::channel::<Outgoing>(4);
        let mut channel: Channel<UserCounts> = session.link_channel("c", payloads(&[]), tx);

        session.close().await;
        assert!(matches!(
            channel.send(&serde_json::json!({})).await,
            Err(StreamError::Closed)
        ));
        assert_eq!(channel.next().await, None);
    }

    #[tokio::test]
    async fn channel_send_without_pump_fails() {
        let session = StreamSession::with_client(None);
        let (tx, rx) = mpsc::channel::<Outgoing>(4);
        drop(rx);
        let channel: Channel<UserCounts> = session.link_channel("c", payloads(&[]), tx);
        assert!(matches!(
            channel.send(&serde_json::json!({})).await,
            Err(StreamError::Closed)
        ));
    }

    #[tokio::test]
    async fn close_waits_for_pumps_to_finish() {
        let mut session = StreamSession::with_client(None);
        let released = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let mut closed = session.closed.subscribe();
        let flag = Arc::clone(&released);
        session.pumps.lock().unwrap().push(tokio::spawn(async move {
            let _ = closed.wait_for(|c| *c).await;
            tokio::task::yield_now().await;
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
        }));

        session.close().await;
        assert!(released.load(std::sync::atomic::Ordering::SeqCst));
        assert!(session.pumps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dropping_subscription_releases_endpoint() {
        let session = StreamSession::with_client(None);
        let a: Subscription<UserCounts> = session.attach("a", payloads(&[]));
        let b: Subscription<UserCounts> = session.attach("a", payloads(&[]));
        drop(a);
        assert_eq!(session.active_endpoints(), ["a"]);
        drop(b);
        assert!(session.active_endpoints().is_empty());
    }
}
