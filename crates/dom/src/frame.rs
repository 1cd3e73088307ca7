use core::time::Duration;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Animation-frame counter. Pollers subscribe and wake once per frame.
#[derive(Debug)]
pub struct FrameClock {
    sender: Arc<watch::Sender<u64>>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            sender: Arc::new(watch::channel(0).0),
        }
    }

    /// Advance one frame and return the new frame number.
    pub fn tick(&self) -> u64 {
        advance(&self.sender)
    }

    pub fn current(&self) -> u64 {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.sender.subscribe()
    }

    /// Drive the clock from a timer. The task exits once the clock is dropped.
    pub fn spawn_ticker(&self, handle: &Handle, period: Duration) -> JoinHandle<()> {
        let clock: Weak<watch::Sender<u64>> = Arc::downgrade(&self.sender);
        handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let Some(sender) = clock.upgrade() else {
                    break;
                };
                advance(&sender);
            }
        })
    }
}

fn advance(sender: &watch::Sender<u64>) -> u64 {
    sender.send_modify(|frame| *frame = frame.wrapping_add(1));
    *sender.borrow()
}
