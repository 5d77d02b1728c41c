use core::cell::RefCell;
use core::future::poll_fn;
use core::task::{Context as TaskContext, Poll};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::WakerRegistration;
use heapless::Vec;

use crate::{error::Error, gnss::Fix};

/// Phase of the module bring-up.
///
/// The sequence starts at `BaudSync` and never terminates, `SteadyPoll` loops
/// back to `NetworkStatusCheck`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProvisioningState {
    BaudSync,
    EchoOff,
    GnssEnable,
    GnssPoll,
    GnssDisable,
    NetworkStatusCheck,
    BandCheck,
    BearerSetup,
    RegistrationCheck,
    MqttConfigure,
    SteadyPoll,
}

/// Command of the bearer setup batch.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BearerStep {
    Functionality,
    ContextDefinition,
    ContextAddress,
    ContextQuery,
    PdpConfig,
    ContextActivation,
    ContextStateQuery,
    SystemInfo,
    AddressQuery,
    AppNetworkActivation,
    PingPdp,
    Ping,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepReport {
    pub step: BearerStep,
    /// Reply length, or why there was none
    pub result: Result<usize, Error>,
}

pub const MAX_BEARER_STEPS: usize = 24;

/// Outcome of every command of the last bearer setup batch. The batch never
/// branches on these.
pub type BatchReport = Vec<StepReport, MAX_BEARER_STEPS>;

/// Scratch data of the provisioning runner, owned by it alone.
#[derive(Debug, Clone)]
pub struct Context {
    pub state: ProvisioningState,
    /// Per state counter, reset on every state change
    pub attempt: u16,
    /// Consecutive valid fixes seen in `GnssPoll`
    pub fixes: u8,
    pub fix: Option<Fix>,
    pub bearer: BatchReport,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub const fn new() -> Self {
        Self {
            state: ProvisioningState::BaudSync,
            attempt: 0,
            fixes: 0,
            fix: None,
            bearer: Vec::new(),
        }
    }

    pub fn transition(&mut self, next: ProvisioningState) {
        if next != self.state {
            debug!("{:?} -> {:?}", self.state, next);
            self.state = next;
            self.attempt = 0;
            self.fixes = 0;
        }
    }
}

/// Provisioning status visible outside the runner.
pub struct Status<M: RawMutex> {
    shared: Mutex<M, RefCell<Shared>>,
}

struct Shared {
    state: ProvisioningState,
    fix: Option<Fix>,
    waker: WakerRegistration,
}

impl<M: RawMutex> Default for Status<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> Status<M> {
    pub const fn new() -> Self {
        Self {
            shared: Mutex::new(RefCell::new(Shared {
                state: ProvisioningState::BaudSync,
                fix: None,
                waker: WakerRegistration::new(),
            })),
        }
    }

    pub fn set_state(&self, state: ProvisioningState) {
        self.shared.lock(|s| {
            let s = &mut *s.borrow_mut();
            s.state = state;
            s.waker.wake();
        });
    }

    pub fn state(&self, cx: Option<&mut TaskContext>) -> ProvisioningState {
        self.shared.lock(|s| {
            let s = &mut *s.borrow_mut();
            if let Some(cx) = cx {
                s.waker.register(cx.waker());
            }
            s.state
        })
    }

    pub fn set_fix(&self, fix: Fix) {
        self.shared.lock(|s| {
            let s = &mut *s.borrow_mut();
            s.fix.replace(fix);
            s.waker.wake();
        });
    }

    pub fn last_fix(&self) -> Option<Fix> {
        self.shared.lock(|s| s.borrow().fix.clone())
    }

    /// Like [`Self::last_fix`], registering `cx` to be woken on the next
    /// state change or fix.
    pub fn poll_fix(&self, cx: &mut TaskContext) -> Option<Fix> {
        self.shared.lock(|s| {
            let s = &mut *s.borrow_mut();
            s.waker.register(cx.waker());
            s.fix.clone()
        })
    }

    /// Wait until a fix is known.
    pub async fn wait_for_fix(&self) -> Fix {
        poll_fn(|cx| match self.poll_fix(cx) {
            Some(fix) => Poll::Ready(fix),
            None => Poll::Pending,
        })
        .await
    }

    pub async fn wait_for_state(&self, state: ProvisioningState) {
        if self.state(None) == state {
            return;
        }

        poll_fn(|cx| {
            if self.state(Some(cx)) == state {
                return Poll::Ready(());
            }
            Poll::Pending
        })
        .await
    }
}
