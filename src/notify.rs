use crossbeam_channel::Sender;

/// Synchronous, in-order fan-out of notifications to subscribers.
pub struct Notifier<T> {
    subscribers: Vec<Box<dyn FnMut(&T)>>,
}

impl<T> Notifier<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&T) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn emit(&mut self, event: &T) {
        for subscriber in &mut self.subscribers {
            subscriber(event);
        }
    }

    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.is_empty()
    }
}

impl<T: Clone + 'static> Notifier<T> {
    /// Forwards a copy of every notification into `tx`, converted with `map`.
    pub fn forward_to<U: 'static>(&mut self, tx: Sender<U>, map: impl Fn(T) -> U + 'static) {
        self.subscribe(move |event: &T| {
            // The receiver going away only means nobody is listening anymore.
            let _ = tx.send(map(event.clone()));
        });
    }
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}
