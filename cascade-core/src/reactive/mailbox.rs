//! Cross-thread delivery into signals.
//!
//! A runtime never leaves its thread. Other threads hold a
//! [`SignalSender`] and push values into the runtime's mailbox; the owning
//! thread applies them with [`Runtime::deliver`](super::Runtime::deliver).
//! The mailbox is the only state shared across threads, behind one mutex.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::graph::{AnyValue, NodeId};

/// A value waiting to be written into a signal.
pub(crate) struct Delivery {
    node: NodeId,
    value: Box<dyn Any + Send>,
}

impl Delivery {
    pub(crate) fn into_parts(self) -> (NodeId, AnyValue) {
        let value: Box<dyn Any> = self.value;
        (self.node, Rc::from(value))
    }
}

/// Queue of deliveries for one runtime. `None` once the runtime is dropped.
pub(crate) struct Mailbox {
    queue: Mutex<Option<Vec<Delivery>>>,
}

impl Mailbox {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(Some(Vec::new())),
        }
    }

    /// Queue a delivery. Returns false if the runtime is gone.
    fn push(&self, delivery: Delivery) -> bool {
        match self.queue.lock().as_mut() {
            Some(queue) => {
                queue.push(delivery);
                true
            }
            None => false,
        }
    }

    pub(crate) fn take(&self) -> Vec<Delivery> {
        self.queue
            .lock()
            .as_mut()
            .map(std::mem::take)
            .unwrap_or_default()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.lock().as_ref().map_or(0, Vec::len)
    }

    pub(crate) fn close(&self) {
        self.queue.lock().take();
    }
}

/// A `Send + Sync` handle that writes into a signal from any thread.
///
/// Values are applied when the runtime's thread calls
/// [`Runtime::deliver`](super::Runtime::deliver).
///
/// ```rust
/// use cascade_core::Runtime;
///
/// let rt = Runtime::new();
/// let temperature = rt.signal(0.0_f64);
/// let sender = temperature.sender().unwrap();
///
/// std::thread::spawn(move || {
///     sender.send(21.5);
/// })
/// .join()
/// .unwrap();
///
/// assert_eq!(rt.deliver().unwrap(), 1);
/// assert_eq!(temperature.get(), 21.5);
/// ```
pub struct SignalSender<T> {
    mailbox: Arc<Mailbox>,
    node: NodeId,
    _marker: PhantomData<fn(T)>,
}

impl<T> SignalSender<T>
where
    T: Send + 'static,
{
    pub(crate) fn new(mailbox: Arc<Mailbox>, node: NodeId) -> Self {
        Self {
            mailbox,
            node,
            _marker: PhantomData,
        }
    }

    /// Queue `value` for the signal. Returns false if the runtime is gone.
    pub fn send(&self, value: T) -> bool {
        self.mailbox.push(Delivery {
            node: self.node,
            value: Box::new(value),
        })
    }

    /// Number of values queued for this runtime and not yet delivered.
    pub fn queued(&self) -> usize {
        self.mailbox.len()
    }
}

impl<T> Clone for SignalSender<T> {
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
            node: self.node,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for SignalSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalSender")
            .field("node", &self.node)
            .field("queued", &self.mailbox.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<S: Send + Sync>() {}

    #[test]
    fn sender_is_send_and_sync() {
        assert_send_sync::<SignalSender<String>>();
    }

    #[test]
    fn sender_debug_shows_target_and_queue() {
        let mailbox = Arc::new(Mailbox::new());
        let sender = SignalSender::<String>::new(mailbox, NodeId::from(5));
        sender.send("queued".to_string());
        assert_eq!(
            format!("{sender:?}"),
            "SignalSender { node: NodeId(5), queued: 1 }"
        );
    }

    #[test]
    fn closed_mailbox_rejects_sends() {
        let mailbox = Arc::new(Mailbox::new());
        let sender = SignalSender::<u8>::new(mailbox.clone(), NodeId::from(0));
        assert!(sender.send(1));
        assert_eq!(sender.queued(), 1);

        mailbox.close();
        assert!(!sender.send(2));
        assert_eq!(sender.queued(), 0);
        assert!(mailbox.take().is_empty());
    }

    #[test]
    fn take_drains_in_arrival_order() {
        let mailbox = Arc::new(Mailbox::new());
        let sender = SignalSender::<u8>::new(mailbox.clone(), NodeId::from(3));
        sender.send(1);
        sender.send(2);

        let values: Vec<u8> = mailbox
            .take()
            .into_iter()
            .map(|delivery| {
                let (node, value) = delivery.into_parts();
                assert_eq!(node, NodeId::from(3));
                *value.downcast_ref::<u8>().unwrap()
            })
            .collect();
        assert_eq!(values, vec![1, 2]);
        assert_eq!(mailbox.len(), 0);
    }
}
