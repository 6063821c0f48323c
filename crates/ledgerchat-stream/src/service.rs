//! Stream synchronization service.
//!
//! One [`StreamSync`] drives the live feed of one room at a time: it
//! registers the room schema, publishes messages, and runs a polling
//! subscription that turns the ledger's append-only rows into batches of
//! new [`Message`]s for a callback.
//!
//! The polling loop is a spawned tokio task cancelled through a `watch`
//! channel. Cancellation is cooperative: a poll already in flight finishes
//! and may deliver one last batch.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use ledgerchat_shared::codec::{
    derive_message_id, room_id_to_bytes, ChatCodec, DecodedMessage, OutgoingMessage, RowField,
};
use ledgerchat_shared::constants::{
    DEFAULT_CONFIRMATION_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_MS, INITIAL_POLL_DELAY_MS, WORD_SIZE,
};
use ledgerchat_shared::types::{
    validate_room_id, Address, DataId, Message, SchemaId, Sender, TxHash,
};

use crate::error::{GatewayError, StreamError};
use crate::gateway::LedgerGateway;
use crate::registration::{RegistrationState, SchemaGate};

type Result<T> = std::result::Result<T, StreamError>;
type Callback = Arc<dyn Fn(Vec<Message>) + Send + Sync>;

// ---------------------------------------------------------------------------
// Options and public value types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub poll_interval: Duration,
    /// Delay before the first poll of a new subscription.
    pub initial_delay: Duration,
    pub confirmation_timeout: Duration,
    /// Propagate schema registration failures instead of treating the room
    /// as registered.
    pub strict_registration: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            initial_delay: Duration::from_millis(INITIAL_POLL_DELAY_MS),
            confirmation_timeout: Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
            strict_registration: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    SchemaPending,
    Active,
}

/// Who is reading the feed. Decides `self`/`other` attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    /// Match on sender address, ignoring case.
    Address(Address),
    /// Match on the chosen display name.
    Name(String),
}

impl Viewer {
    fn attribute(&self, msg: &DecodedMessage) -> Sender {
        let mine = match self {
            Viewer::Address(addr) => addr.eq_ignore_case(&msg.sender_address),
            Viewer::Name(name) => *name == msg.sender_name,
        };
        if mine {
            Sender::Me
        } else {
            Sender::Other
        }
    }
}

/// Result of a confirmed publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Published {
    pub tx_hash: TxHash,
    /// Milliseconds since the epoch, as written into the payload.
    pub timestamp: u64,
    pub data_id: DataId,
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

/// Decode rows and keep those whose room slot matches.
fn decode_room<'a>(
    codec: &'a ChatCodec,
    rows: &'a [Vec<RowField>],
    room_slot: &'a [u8; WORD_SIZE],
) -> impl Iterator<Item = DecodedMessage> + 'a {
    rows.iter()
        .filter_map(|row| codec.decode_row(row))
        .filter(move |msg| msg.room_slot == *room_slot)
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// State of one subscription: what to read, who is reading, and which
/// message ids have already been delivered.
struct Poller {
    gateway: Arc<dyn LedgerGateway>,
    codec: Arc<ChatCodec>,
    publisher: Address,
    schema_id: SchemaId,
    room_id: String,
    room_slot: [u8; WORD_SIZE],
    viewer: Viewer,
    seen: Mutex<HashSet<String>>,
    in_flight: AtomicBool,
    callback: Callback,
}

impl Poller {
    /// Run one poll unless another is still in flight. Errors are logged
    /// and swallowed so the schedule keeps going.
    async fn tick(&self) {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!(room = %self.room_id, "Previous poll still running, skipping tick");
            return;
        }
        let _guard = InFlight(&self.in_flight);

        match self.collect().await {
            Ok(batch) if batch.is_empty() => {}
            Ok(batch) => {
                debug!(room = %self.room_id, count = batch.len(), "Delivering new messages");
                (self.callback)(batch);
            }
            Err(e) => {
                warn!(room = %self.room_id, schema = %self.schema_id, error = %e, "Poll failed");
            }
        }
    }

    async fn collect(&self) -> std::result::Result<Vec<Message>, GatewayError> {
        let rows = self
            .gateway
            .get_all_data_for_schema(&self.schema_id, &self.publisher)
            .await?;

        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        let mut batch: Vec<Message> = decode_room(&self.codec, &rows, &self.room_slot)
            .filter(|msg| seen.insert(msg.id()))
            .map(|msg| {
                let sender = self.viewer.attribute(&msg);
                msg.into_message(sender)
            })
            .collect();
        drop(seen);

        batch.sort_by_key(|m| m.timestamp);
        Ok(batch)
    }
}

async fn run_polling(
    poller: Arc<Poller>,
    mut cancel: watch::Receiver<bool>,
    initial_delay: Duration,
    interval: Duration,
) {
    // A closed channel means the owning service is gone.
    tokio::select! {
        biased;
        _ = cancel.changed() => return,
        _ = tokio::time::sleep(initial_delay) => {}
    }

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        poller.tick().await;
        tokio::select! {
            biased;
            _ = cancel.changed() => break,
            _ = ticker.tick() => {}
        }
    }
    debug!(room = %poller.room_id, "Polling stopped");
}

struct PollingSubscription {
    cancel: watch::Sender<bool>,
    poller: Arc<Poller>,
    _task: JoinHandle<()>,
}

impl PollingSubscription {
    fn cancel(self) {
        let _ = self.cancel.send(true);
    }
}

struct SyncInner {
    state: SyncState,
    subscription: Option<PollingSubscription>,
}

// ---------------------------------------------------------------------------
// StreamSync
// ---------------------------------------------------------------------------

/// The feed orchestrator. Instances share nothing but the gateway they are
/// given, so several rooms can be followed side by side.
pub struct StreamSync {
    gateway: Arc<dyn LedgerGateway>,
    codec: Arc<ChatCodec>,
    publisher: Option<Address>,
    options: SyncOptions,
    gate: SchemaGate,
    inner: Mutex<SyncInner>,
}

impl StreamSync {
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        codec: Arc<ChatCodec>,
        publisher: Option<Address>,
        options: SyncOptions,
    ) -> Self {
        Self {
            gateway,
            codec,
            publisher,
            options,
            gate: SchemaGate::new(),
            inner: Mutex::new(SyncInner {
                state: SyncState::Idle,
                subscription: None,
            }),
        }
    }

    /// Build a service publishing as the gateway's own signing identity.
    pub fn for_gateway(
        gateway: Arc<dyn LedgerGateway>,
        codec: Arc<ChatCodec>,
        options: SyncOptions,
    ) -> Self {
        let publisher = gateway.publisher();
        Self::new(gateway, codec, publisher, options)
    }

    pub fn publisher(&self) -> Option<&Address> {
        self.publisher.as_ref()
    }

    pub fn codec(&self) -> &ChatCodec {
        &self.codec
    }

    pub fn gate(&self) -> &SchemaGate {
        &self.gate
    }

    pub fn state(&self) -> SyncState {
        self.lock().state
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SyncInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: SyncState) {
        self.lock().state = state;
    }

    fn require_publisher(&self) -> Result<&Address> {
        self.publisher.as_ref().ok_or(StreamError::Unauthenticated)
    }

    async fn confirm(&self, tx: &TxHash) -> Result<()> {
        let limit = self.options.confirmation_timeout;
        tokio::time::timeout(limit, self.gateway.wait_for_confirmation(tx))
            .await
            .map_err(|_| StreamError::ConfirmationTimeout(limit))??;
        Ok(())
    }

    /// Register a schema unless the ledger already knows it.
    ///
    /// Returns the confirmed transaction, or `None` when nothing was
    /// written, including when another registrant won the race.
    pub async fn register_schema(
        &self,
        schema_id: &SchemaId,
        definition: &str,
    ) -> Result<Option<TxHash>> {
        if self.gateway.is_schema_registered(schema_id).await? {
            debug!(schema = %schema_id, "Schema already registered");
            return Ok(None);
        }

        match self
            .gateway
            .register_schema(schema_id, definition, &SchemaId::ZERO)
            .await
        {
            Ok(Some(tx)) => {
                self.confirm(&tx).await?;
                info!(schema = %schema_id, tx = %tx, "Schema registered");
                Ok(Some(tx))
            }
            Ok(None) => Ok(None),
            Err(GatewayError::AlreadyRegistered(_)) => {
                debug!(schema = %schema_id, "Schema registered concurrently");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Pass `(room_id, schema_id)` through the registration gate, registering
    /// the codec's schema on first use.
    async fn ensure_registered(
        &self,
        room_id: &str,
        schema_id: &SchemaId,
    ) -> Result<RegistrationState> {
        let definition = self.codec.schema().definition();
        self.gate
            .ensure(room_id, schema_id, self.options.strict_registration, || {
                self.register_schema(schema_id, &definition)
            })
            .await
    }

    /// Publish one chat message and wait for the ledger to confirm it.
    /// The schema is registered first if this room has not used it yet.
    ///
    /// The message is not echoed locally. It reaches every subscriber,
    /// including the sender, through the next poll.
    pub async fn publish(
        &self,
        text: &str,
        sender_name: &str,
        sender_address: &str,
        room_id: &str,
        schema_id: &str,
    ) -> Result<Published> {
        if text.trim().is_empty() {
            return Err(StreamError::InvalidInput("text is required".into()));
        }
        if sender_name.trim().is_empty() {
            return Err(StreamError::InvalidInput("senderName is required".into()));
        }
        let sender = Address::parse(sender_address)
            .map_err(|e| StreamError::InvalidInput(e.to_string()))?;
        validate_room_id(room_id).map_err(|e| StreamError::InvalidInput(e.to_string()))?;
        let schema_id =
            SchemaId::parse(schema_id).map_err(|e| StreamError::InvalidInput(e.to_string()))?;
        self.require_publisher()?;
        self.ensure_registered(room_id, &schema_id).await?;

        let timestamp = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let payload = self.codec.encode_message(&OutgoingMessage {
            timestamp,
            room_id,
            content: text,
            sender_name,
            sender: &sender,
        })?;
        let data_id = derive_message_id(room_id, sender_name, timestamp);

        let tx_hash = self
            .gateway
            .publish_data(&data_id, &schema_id, payload)
            .await?
            .ok_or(StreamError::NotPublished)?;
        self.confirm(&tx_hash).await?;

        info!(room = room_id, sender = sender_name, tx = %tx_hash, "Message published");
        Ok(Published {
            tx_hash,
            timestamp,
            data_id,
        })
    }

    /// Start polling `room_id` under `schema_id`, replacing any previous
    /// subscription. Dedup state starts empty.
    ///
    /// The first poll runs after the initial delay, then every
    /// `poll_interval` (the configured one when `None`). The callback only
    /// sees non-empty batches, each sorted by timestamp.
    pub fn subscribe<F>(
        &self,
        callback: F,
        schema_id: SchemaId,
        room_id: &str,
        viewer: Viewer,
        poll_interval: Option<Duration>,
    ) -> Result<()>
    where
        F: Fn(Vec<Message>) + Send + Sync + 'static,
    {
        validate_room_id(room_id).map_err(|e| StreamError::InvalidInput(e.to_string()))?;
        let room_slot = room_id_to_bytes(room_id)?;
        let publisher = self.require_publisher()?.clone();
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StreamError::NoRuntime)?;
        let interval = poll_interval.unwrap_or(self.options.poll_interval);

        let poller = Arc::new(Poller {
            gateway: self.gateway.clone(),
            codec: self.codec.clone(),
            publisher,
            schema_id,
            room_id: room_id.to_string(),
            room_slot,
            viewer,
            seen: Mutex::new(HashSet::new()),
            in_flight: AtomicBool::new(false),
            callback: Arc::new(callback),
        });

        let (cancel, cancelled) = watch::channel(false);
        let task = runtime.spawn(run_polling(
            poller.clone(),
            cancelled,
            self.options.initial_delay,
            interval,
        ));

        let mut inner = self.lock();
        if let Some(previous) = inner.subscription.take() {
            previous.cancel();
        }
        inner.subscription = Some(PollingSubscription {
            cancel,
            poller,
            _task: task,
        });
        inner.state = SyncState::Active;
        drop(inner);

        info!(room = room_id, schema = %schema_id, ?interval, "Subscribed");
        Ok(())
    }

    /// Stop polling. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        let mut inner = self.lock();
        if let Some(subscription) = inner.subscription.take() {
            debug!(room = %subscription.poller.room_id, "Unsubscribed");
            subscription.cancel();
        }
        inner.state = SyncState::Idle;
    }

    /// Poll the active subscription right away. Returns `false` when there
    /// is nothing subscribed.
    pub async fn poll_now(&self) -> bool {
        let poller = self
            .lock()
            .subscription
            .as_ref()
            .map(|s| s.poller.clone());
        match poller {
            Some(poller) => {
                poller.tick().await;
                true
            }
            None => false,
        }
    }

    /// Register the room's schema if needed, then subscribe to it.
    ///
    /// Goes `SchemaPending` while the registration gate runs and `Active`
    /// once polling starts. Any failure leaves the service `Idle`.
    pub async fn enter_room<F>(
        &self,
        room_id: &str,
        schema_id: SchemaId,
        viewer: Viewer,
        callback: F,
    ) -> Result<()>
    where
        F: Fn(Vec<Message>) + Send + Sync + 'static,
    {
        validate_room_id(room_id).map_err(|e| StreamError::InvalidInput(e.to_string()))?;
        {
            let mut inner = self.lock();
            if let Some(previous) = inner.subscription.take() {
                previous.cancel();
            }
            inner.state = SyncState::SchemaPending;
        }

        let ensured = self.ensure_registered(room_id, &schema_id).await;

        let subscribed =
            ensured.and_then(|_| self.subscribe(callback, schema_id, room_id, viewer, None));
        if subscribed.is_err() {
            self.set_state(SyncState::Idle);
        }
        subscribed
    }

    /// One-shot read of a room's messages, oldest first. No dedup.
    ///
    /// There is no viewer here, so `sender` is left as `Other` on every
    /// message and carries no attribution.
    pub async fn fetch_messages(&self, schema_id: &SchemaId, room_id: &str) -> Result<Vec<Message>> {
        validate_room_id(room_id).map_err(|e| StreamError::InvalidInput(e.to_string()))?;
        let room_slot = room_id_to_bytes(room_id)?;
        let publisher = self.require_publisher()?;

        let rows = self
            .gateway
            .get_all_data_for_schema(schema_id, publisher)
            .await?;
        let mut messages: Vec<Message> = decode_room(&self.codec, &rows, &room_slot)
            .map(|msg| msg.into_message(Sender::Other))
            .collect();
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }
}

impl Drop for StreamSync {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(subscription) = inner.subscription.take() {
            subscription.cancel();
        }
    }
}
