use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};

use crate::error::{CacheError, CacheResult};

/// val/rdy ports between components, built on bounded(1) channels
/// to mimic a single register slice sitting between a producer and a consumer
///
/// The receiving side keeps the message at the head of the channel around so a component can look at it
/// (val) before deciding to consume it (rdy), which is what a valid/ready handshake needs
pub fn port<T>(name: &'static str) -> (OutPort<T>, InPort<T>) {
    let (tx, rx) = bounded(1);
    (OutPort { name, tx }, InPort { name, rx, head: None })
}

#[derive(Debug, Clone)]
pub struct OutPort<T> {
    name: &'static str,
    tx: Sender<T>,
}

impl<T> OutPort<T> {
    /// the consumer can take one more message
    #[inline]
    pub fn rdy(&self) -> bool {
        !self.tx.is_full()
    }

    /// send without blocking, callers check `rdy` first
    pub fn send(&self, msg: T) -> CacheResult<()> {
        match self.tx.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                panic!("Sent on port {} while it was not ready!", self.name)
            }
            Err(TrySendError::Disconnected(_)) => Err(CacheError::PortDisconnected(self.name)),
        }
    }
}

#[derive(Debug)]
pub struct InPort<T> {
    name: &'static str,
    rx: Receiver<T>,
    head: Option<T>,
}

impl<T> InPort<T> {
    /// message at the head of the port, without consuming it
    pub fn peek(&mut self) -> CacheResult<Option<&T>> {
        if self.head.is_none() {
            match self.rx.try_recv() {
                Ok(msg) => self.head = Some(msg),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    return Err(CacheError::PortDisconnected(self.name));
                }
            }
        }
        Ok(self.head.as_ref())
    }

    #[inline]
    pub fn val(&mut self) -> CacheResult<bool> {
        Ok(self.peek()?.is_some())
    }

    /// consume the head message
    pub fn take(&mut self) -> CacheResult<Option<T>> {
        self.peek()?;
        Ok(self.head.take())
    }
}
