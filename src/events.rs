// Lifecycle Events Module
//
// Queued pub/sub for manager lifecycle notifications:
// - Activation completed / failed
// - Individually loaded asset released
// - Batch release
//
// Events are queued when they happen and delivered by `process_events`,
// so subscribers never run inside loader or release bookkeeping.

use crate::error::Result;
use ahash::AHashMap;
use std::any::{Any, TypeId};

/// Trait for any lifecycle event
pub trait Event: Send + Sync + 'static {
    fn event_type_id(&self) -> TypeId;

    fn as_any(&self) -> &dyn Any;

    /// Event name for debugging
    fn event_name(&self) -> &str {
        "UnnamedEvent"
    }
}

/// Subscriber that listens for events
pub trait EventSubscriber: Send + Sync {
    fn on_event(&mut self, event: &dyn Event) -> Result<()>;

    fn name(&self) -> &str {
        "UnnamedSubscriber"
    }
}

/// Closure-backed subscriber for a single event type
pub struct FnSubscriber<E, F> {
    callback: F,
    _event: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnSubscriber<E, F>
where
    E: Event,
    F: FnMut(&E) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            _event: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventSubscriber for FnSubscriber<E, F>
where
    E: Event,
    F: FnMut(&E) + Send + Sync,
{
    fn on_event(&mut self, event: &dyn Event) -> Result<()> {
        if let Some(event) = event.as_any().downcast_ref::<E>() {
            (self.callback)(event);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "FnSubscriber"
    }
}

macro_rules! arm_event {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($field:ident : $ty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        $vis struct $name {
            $(pub $field : $ty),*
        }

        impl Event for $name {
            fn event_type_id(&self) -> TypeId {
                TypeId::of::<Self>()
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn event_name(&self) -> &str {
                stringify!($name)
            }
        }
    };
}

arm_event! {
    /// Backend initialized and the key catalogue was recorded
    pub struct ActivateCompleted {
        key_count: usize,
    }
}

arm_event! {
    /// Backend initialization failed
    pub struct ActivateFailed {
        reason: String,
    }
}

arm_event! {
    /// Last reference to an individually loaded asset was released
    pub struct AssetReleased {
        key: String,
    }
}

arm_event! {
    /// Batch-loaded entries were released
    pub struct BatchReleased {
        keys: Vec<String>,
    }
}

trait EventStorage: Send + Sync {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn process(
        &mut self,
        typed: &mut [Box<dyn EventSubscriber>],
        wildcard: &mut [Box<dyn EventSubscriber>],
    ) -> Result<()>;
    fn append(&mut self, newer: &mut dyn EventStorage);
    fn clear(&mut self);
    fn len(&self) -> usize;
}

/// Contiguous storage for events of a specific type
struct TypedEventQueue<T: Event> {
    events: Vec<T>,
}

impl<T: Event> EventStorage for TypedEventQueue<T> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    /// Deliver events in order, each to typed then wildcard subscribers.
    ///
    /// Events up to and including the one a subscriber rejects are
    /// consumed; the rest stay queued.
    fn process(
        &mut self,
        typed: &mut [Box<dyn EventSubscriber>],
        wildcard: &mut [Box<dyn EventSubscriber>],
    ) -> Result<()> {
        let mut consumed = 0;
        let mut outcome = Ok(());
        'events: for event in &self.events {
            consumed += 1;
            for subscriber in typed.iter_mut().chain(wildcard.iter_mut()) {
                if let Err(err) = subscriber.on_event(event) {
                    outcome = Err(err);
                    break 'events;
                }
            }
        }
        self.events.drain(..consumed);
        outcome
    }

    /// Move `newer`'s events behind this queue's
    fn append(&mut self, newer: &mut dyn EventStorage) {
        if let Some(newer) = newer.as_any_mut().downcast_mut::<TypedEventQueue<T>>() {
            self.events.append(&mut newer.events);
        }
    }

    fn clear(&mut self) {
        self.events.clear();
    }

    fn len(&self) -> usize {
        self.events.len()
    }
}

#[derive(Default)]
pub struct EventBus {
    queues: AHashMap<TypeId, Box<dyn EventStorage>>,
    subscribers: AHashMap<TypeId, Vec<Box<dyn EventSubscriber>>>,
    processed_count: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a specific event type
    pub fn subscribe<E: Event>(&mut self, subscriber: Box<dyn EventSubscriber>) {
        self.subscribers
            .entry(TypeId::of::<E>())
            .or_default()
            .push(subscriber);
    }

    /// Subscribe to every event type
    pub fn subscribe_all(&mut self, subscriber: Box<dyn EventSubscriber>) {
        self.subscribers
            .entry(TypeId::of::<()>())
            .or_default()
            .push(subscriber);
    }

    pub fn publish_event<E: Event>(&mut self, event: E) {
        let queue = self
            .queues
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(TypedEventQueue::<E> { events: Vec::new() }));

        if let Some(typed) = queue.as_any_mut().downcast_mut::<TypedEventQueue<E>>() {
            typed.events.push(event);
        }
    }

    /// Deliver all queued events, each to typed subscribers, then wildcards.
    ///
    /// Stops at the first subscriber error. The rejected event is consumed;
    /// later events stay queued for the next call.
    pub fn process_events(&mut self) -> Result<()> {
        let wildcard_id = TypeId::of::<()>();
        let mut wildcard = self.subscribers.remove(&wildcard_id).unwrap_or_default();

        let mut outcome = Ok(());
        for (type_id, queue) in self.queues.iter_mut() {
            let before = queue.len();
            let typed = self
                .subscribers
                .get_mut(type_id)
                .map(|subs| subs.as_mut_slice())
                .unwrap_or_default();
            outcome = queue.process(typed, &mut wildcard);
            self.processed_count += (before - queue.len()) as u64;
            if outcome.is_err() {
                break;
            }
        }

        if !wildcard.is_empty() {
            self.subscribers.insert(wildcard_id, wildcard);
        }
        outcome
    }

    /// Fold in a bus that was taken out for processing.
    ///
    /// Its subscribers go first. Events it still holds go ahead of the
    /// events queued on `self` meanwhile.
    pub(crate) fn restore(&mut self, mut taken: EventBus) {
        for (type_id, mut subs) in self.subscribers.drain() {
            taken.subscribers.entry(type_id).or_default().append(&mut subs);
        }
        self.subscribers = taken.subscribers;
        self.processed_count += taken.processed_count;

        for (type_id, mut older) in taken.queues.drain() {
            if let Some(mut newer) = self.queues.remove(&type_id) {
                older.append(newer.as_mut());
            }
            self.queues.insert(type_id, older);
        }
    }

    pub fn queue_size(&self) -> usize {
        self.queues.values().map(|q| q.len()).sum()
    }

    pub fn processed_count(&self) -> u64 {
        self.processed_count
    }

    pub fn total_subscribers(&self) -> usize {
        self.subscribers.values().map(|subs| subs.len()).sum()
    }

    pub fn clear_queue(&mut self) {
        for queue in self.queues.values_mut() {
            queue.clear();
        }
    }
}
