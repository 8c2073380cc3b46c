//! Fixed-size IPC messages.
//!
//! A message is a call-number word plus a small payload. Notifications
//! reuse the same buffer with a timestamp, a badge and, for kernel
//! sources, the pending interrupt or signal set.

use crate::proc::Endpoint;
use crate::security::Zeroize;

/// Payload words in an ordinary message.
pub const MESSAGE_WORDS: usize = 6;

/// `m_type` of every notification message.
pub const NOTIFY_MESSAGE: u32 = 0x1000;

/// What a notification carries besides its badge.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NotifySet {
    /// Process-originated notification.
    None,
    /// Pending interrupt bits, source `HARDWARE`.
    Interrupts(u64),
    /// Pending signal bits, source `SYSTEM`.
    Signals(u64),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NotifyInfo {
    /// Kernel clock at delivery.
    pub timestamp: u64,
    /// Opaque value chosen by the notifier.
    pub badge: u64,
    pub set: NotifySet,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MessageBody {
    Words([u64; MESSAGE_WORDS]),
    Notify(NotifyInfo),
}

/// The unit of transfer for every IPC call.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Message {
    /// Stamped by the kernel on send; whatever the sender wrote is ignored.
    pub source: Endpoint,
    /// Call number or reply status chosen by the protocol.
    pub m_type: u32,
    pub body: MessageBody,
}

impl Message {
    pub const fn new(m_type: u32, words: [u64; MESSAGE_WORDS]) -> Self {
        Self {
            source: Endpoint::from_raw(0),
            m_type,
            body: MessageBody::Words(words),
        }
    }

    /// A message with only a call number.
    pub const fn empty(m_type: u32) -> Self {
        Self::new(m_type, [0; MESSAGE_WORDS])
    }

    pub(crate) const fn notification(source: Endpoint, info: NotifyInfo) -> Self {
        Self {
            source,
            m_type: NOTIFY_MESSAGE,
            body: MessageBody::Notify(info),
        }
    }

    #[inline]
    pub fn is_notification(&self) -> bool {
        matches!(self.body, MessageBody::Notify(_))
    }

    /// Payload words, if this is an ordinary message.
    pub fn words(&self) -> Option<&[u64; MESSAGE_WORDS]> {
        match &self.body {
            MessageBody::Words(w) => Some(w),
            MessageBody::Notify(_) => None,
        }
    }

    /// Notification details, if this is a notification.
    pub fn notify_info(&self) -> Option<&NotifyInfo> {
        match &self.body {
            MessageBody::Notify(n) => Some(n),
            MessageBody::Words(_) => None,
        }
    }
}

impl Zeroize for Message {
    fn zeroize(&mut self) {
        self.m_type.zeroize();
        match &mut self.body {
            MessageBody::Words(w) => w.zeroize(),
            MessageBody::Notify(n) => {
                n.timestamp.zeroize();
                n.badge.zeroize();
                n.set = NotifySet::None;
            }
        }
    }
}
