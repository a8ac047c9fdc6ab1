use std::sync::Arc;
use parking_lot::Mutex;
use ahash::AHashMap;

/// Pipeline-wide event bus
pub struct EventBus {
    handlers: Arc<Mutex<AHashMap<std::any::TypeId, Vec<Box<dyn EventHandler>>>>>,
}

/// Event trait that all events must implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Handler trait for event handlers
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Pipeline events
pub mod events {
    use super::Event;

    /// Connected to a document store
    #[derive(Debug, Clone)]
    pub struct Connected {
        pub address: String,
    }

    /// Database selected and its collections listed
    #[derive(Debug, Clone)]
    pub struct DatabaseSelected {
        pub name: String,
        pub collection_count: usize,
    }

    /// Collection selected and its field catalog replaced
    #[derive(Debug, Clone)]
    pub struct CollectionSelected {
        pub collection: String,
        pub field_count: usize,
    }

    /// A fetch installed a new row set
    #[derive(Debug, Clone)]
    pub struct DocumentsFetched {
        pub collection: String,
        pub generation: u64,
        pub row_count: usize,
        pub column_count: usize,
    }

    /// A fetch finished after a newer one was issued and was dropped
    #[derive(Debug, Clone)]
    pub struct FetchSuperseded {
        pub generation: u64,
        pub latest: u64,
    }

    /// A visualization command was accepted by the viewport
    #[derive(Debug, Clone)]
    pub struct VisualizationDispatched {
        pub kind: String,
        pub point_count: usize,
        pub with_scalars: bool,
    }

    // Implement Event trait for all event types
    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(
        Connected,
        DatabaseSelected,
        CollectionSelected,
        DocumentsFetched,
        FetchSuperseded,
        VisualizationDispatched
    );
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();
        handlers.entry(type_id).or_insert_with(Vec::new).push(handler);
    }

    /// Publish an event
    pub fn publish<E: Event>(&self, event: E) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();

        if let Some(event_handlers) = handlers.get_mut(&type_id) {
            tracing::trace!("Publishing event to {} handler(s)", event_handlers.len());
            for handler in event_handlers.iter_mut() {
                handler.handle(&event);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.handler)(event);
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}
