//! Single-slot completion channels.
//!
//! A channel is a binary semaphore bound to one hardware event source. The
//! interrupt side calls [`Signal::signal`]; the frame loop blocks in
//! [`CompletionChannel::wait_one`]. A second signal before consumption is
//! coalesced into the first. Channels are **not** FIFO-safe: they can only
//! pair one outstanding operation with one wait.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use ultra_box_hal::{EventSource, Signal};

/// How long a consumer may block before the wait is declared stalled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Block until signaled, however long that takes.
    #[default]
    Forever,
    /// Give up after this many idle polls.
    Watchdog { max_polls: u32 },
}

/// A wait exceeded its watchdog budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stalled {
    pub polls: u32,
}

/// Single-slot completion semaphore for one event source.
///
/// Safe to signal from interrupt context; only the frame loop consumes.
pub struct CompletionChannel {
    pending: AtomicBool,
    delivered: AtomicU32,
    coalesced: AtomicU32,
}

impl Default for CompletionChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionChannel {
    /// An empty channel with zeroed counters.
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            delivered: AtomicU32::new(0),
            coalesced: AtomicU32::new(0),
        }
    }

    /// Drop any pending signal and zero the counters.
    pub fn reset(&self) {
        self.pending.store(false, Ordering::Release);
        self.delivered.store(0, Ordering::Relaxed);
        self.coalesced.store(0, Ordering::Relaxed);
    }

    /// Whether a signal is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Consume the pending signal if there is one.
    pub fn try_take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Discard a stale signal ahead of starting a new phase.
    ///
    /// Returns `true` if a signal was discarded.
    pub fn arm(&self) -> bool {
        self.try_take()
    }

    /// Block until a signal is pending, then consume it.
    ///
    /// `idle` runs once per unsuccessful poll.
    pub fn wait_one(&self, policy: WaitPolicy, mut idle: impl FnMut()) -> Result<(), Stalled> {
        let mut polls: u32 = 0;
        loop {
            if self.try_take() {
                return Ok(());
            }
            if let WaitPolicy::Watchdog { max_polls } = policy {
                if polls >= max_polls {
                    return Err(Stalled { polls });
                }
            }
            polls = polls.saturating_add(1);
            idle();
        }
    }

    /// Total signals received since the last reset.
    pub fn delivered(&self) -> u32 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Signals that arrived while one was already pending.
    pub fn coalesced(&self) -> u32 {
        self.coalesced.load(Ordering::Relaxed)
    }
}

impl Signal for CompletionChannel {
    fn signal(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        if self.pending.swap(true, Ordering::AcqRel) {
            self.coalesced.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// One completion channel per hardware event source.
///
/// Hardware keeps a `'static` reference to each bound channel, so the bank is
/// normally a `static` owned by the firmware entry point.
#[derive(Default)]
pub struct ChannelBank {
    memory_transfer: CompletionChannel,
    signal_processor: CompletionChannel,
    rasterizer: CompletionChannel,
    display_refresh: CompletionChannel,
}

impl ChannelBank {
    pub const fn new() -> Self {
        Self {
            memory_transfer: CompletionChannel::new(),
            signal_processor: CompletionChannel::new(),
            rasterizer: CompletionChannel::new(),
            display_refresh: CompletionChannel::new(),
        }
    }

    /// The channel bound to `source`.
    pub fn get(&self, source: EventSource) -> &CompletionChannel {
        match source {
            EventSource::MemoryTransfer => &self.memory_transfer,
            EventSource::SignalProcessor => &self.signal_processor,
            EventSource::Rasterizer => &self.rasterizer,
            EventSource::DisplayRefresh => &self.display_refresh,
        }
    }
}
