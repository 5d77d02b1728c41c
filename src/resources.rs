use embassy_sync::{
    blocking_mutex::raw::RawMutex,
    channel::{Channel, Sender},
};

use crate::{frame::FrameMailbox, state::Status, transport::SerialEvent};

/// Storage shared by the serial driver, the frame reassembler, the runner and
/// the host. Usually placed in a `static`.
pub struct Resources<M: RawMutex, const EVENT_CAPACITY: usize> {
    pub(crate) events: Channel<M, SerialEvent, EVENT_CAPACITY>,
    pub(crate) mailbox: FrameMailbox<M>,
    pub(crate) status: Status<M>,
}

impl<M: RawMutex, const EVENT_CAPACITY: usize> Default for Resources<M, EVENT_CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const EVENT_CAPACITY: usize> Resources<M, EVENT_CAPACITY> {
    pub const fn new() -> Self {
        Self {
            events: Channel::new(),
            mailbox: FrameMailbox::new(),
            status: Status::new(),
        }
    }

    /// Where the serial driver posts its events.
    pub fn event_sender(&self) -> Sender<'_, M, SerialEvent, EVENT_CAPACITY> {
        self.events.sender()
    }

    pub fn mailbox(&self) -> &FrameMailbox<M> {
        &self.mailbox
    }

    pub fn status(&self) -> &Status<M> {
        &self.status
    }
}
