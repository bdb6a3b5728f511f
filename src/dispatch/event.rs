//! Events flowing from the OSC callbacks into the dispatcher
//!
//! The queue is an unbounded tokio mpsc channel: pushing never blocks and any
//! number of producers may hold an [`EventSender`]. Exactly one receiver exists
//! and it is owned by the dispatcher machine.

use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HapticEvent {
    AfkChanged(bool),
    InStationChanged(bool),
    SeatedChanged(bool),
    AvatarChanged(String),
    ContactChanged { raw_index: usize, intensity: u8 },
}

/// Producer side of the event queue
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<HapticEvent>,
}

impl EventSender {
    /// Enqueues an event; never blocks
    ///
    /// Only fails when the dispatcher has been dropped for good, in which case
    /// the event is discarded.
    pub fn push(&self, event: HapticEvent) {
        debug!("Queueing {:?}", event);
        if let Err(e) = self.tx.send(event) {
            warn!("Dispatcher gone, dropping event: {:?}", e.0);
        }
    }
}

/// Consumer side of the event queue
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<HapticEvent>,
}

impl EventReceiver {
    /// Next queued event, `None` when the queue is currently empty
    pub fn try_pop(&mut self) -> Option<HapticEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                debug!("All event senders dropped");
                None
            }
        }
    }
}

pub fn event_queue() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_per_producer() {
        let (sender, mut receiver) = event_queue();
        sender.push(HapticEvent::AfkChanged(true));
        sender.push(HapticEvent::ContactChanged {
            raw_index: 3,
            intensity: 50,
        });
        sender.push(HapticEvent::AfkChanged(false));

        assert_eq!(receiver.try_pop(), Some(HapticEvent::AfkChanged(true)));
        assert_eq!(
            receiver.try_pop(),
            Some(HapticEvent::ContactChanged {
                raw_index: 3,
                intensity: 50
            })
        );
        assert_eq!(receiver.try_pop(), Some(HapticEvent::AfkChanged(false)));
        assert_eq!(receiver.try_pop(), None);
    }

    #[test]
    fn test_concurrent_producers() {
        let (sender, mut receiver) = event_queue();
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let sender = sender.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        sender.push(HapticEvent::ContactChanged {
                            raw_index: t * 100 + i,
                            intensity: 1,
                        });
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let mut count = 0;
        while receiver.try_pop().is_some() {
            count += 1;
        }
        assert_eq!(count, 800);
    }

    #[test]
    fn test_push_after_receiver_dropped_does_not_panic() {
        let (sender, receiver) = event_queue();
        drop(receiver);
        sender.push(HapticEvent::SeatedChanged(true));
    }
}
