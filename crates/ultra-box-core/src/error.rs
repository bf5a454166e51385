//! Error types, generic over the platform's hardware error.

use core::fmt;

use ultra_box_hal::{EventSource, PhysAddr};

use crate::frame::{SlotInFlight, SlotIndex};
use crate::gfx::CommandBufferError;
use crate::sched::SchedulerError;

/// Fatal errors during boot. None of them can be retried.
#[derive(Debug)]
pub enum BootError<E: fmt::Debug> {
    /// Hardware bring-up failed.
    BringUp(E),
    /// A completion channel could not be bound to its event source.
    Bind { source: EventSource, error: E },
    /// The display controller rejected its configuration.
    Display(E),
    /// The storage transfer manager failed to start.
    Storage(E),
    /// A queue depth the subsystem cannot honor.
    UnsupportedQueueDepth { subsystem: &'static str, depth: usize },
    /// The frame loop could not be handed the CPU.
    Scheduler(SchedulerError),
    /// Both frame slots point at the same framebuffer.
    AliasedFramebuffers(PhysAddr),
}

impl<E: fmt::Debug> From<SchedulerError> for BootError<E> {
    fn from(e: SchedulerError) -> Self {
        BootError::Scheduler(e)
    }
}

impl<E: fmt::Debug> fmt::Display for BootError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::BringUp(e) => write!(f, "hardware bring-up failed: {e:?}"),
            BootError::Bind { source, error } => {
                write!(f, "failed to bind {source} channel: {error:?}")
            }
            BootError::Display(e) => write!(f, "display configuration failed: {e:?}"),
            BootError::Storage(e) => write!(f, "storage manager failed to start: {e:?}"),
            BootError::UnsupportedQueueDepth { subsystem, depth } => {
                write!(f, "{subsystem}: unsupported queue depth {depth}")
            }
            BootError::Scheduler(e) => write!(f, "{e}"),
            BootError::AliasedFramebuffers(addr) => {
                write!(f, "both frame slots share framebuffer {addr:#010x}")
            }
        }
    }
}

/// Which half of the submit/wait pairing was broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// A second submission before the first one was waited for.
    SubmitWhileOutstanding,
    /// A wait with no outstanding submission to pair with.
    WaitWithoutSubmit,
}

/// Errors that end the frame loop.
#[derive(Debug)]
pub enum PipelineError<E: fmt::Debug> {
    Hardware(E),
    CommandBuffer(CommandBufferError),
    /// Write access to a slot the coprocessor or display may still read.
    SlotInFlight(SlotIndex),
    ProtocolViolation {
        source: EventSource,
        violation: Violation,
    },
    /// A signal was already pending when a new phase began.
    StaleSignal(EventSource),
    /// A completion wait exceeded the watchdog budget.
    Stalled { source: EventSource, polls: u32 },
    /// An earlier frame failed; the pipeline accepts no more frames.
    Faulted,
}

impl<E: fmt::Debug> From<CommandBufferError> for PipelineError<E> {
    fn from(e: CommandBufferError) -> Self {
        PipelineError::CommandBuffer(e)
    }
}

impl<E: fmt::Debug> From<SlotInFlight> for PipelineError<E> {
    fn from(SlotInFlight(slot): SlotInFlight) -> Self {
        PipelineError::SlotInFlight(slot)
    }
}

impl<E: fmt::Debug> fmt::Display for PipelineError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Hardware(e) => write!(f, "hardware error: {e:?}"),
            PipelineError::CommandBuffer(e) => write!(f, "{e}"),
            PipelineError::SlotInFlight(slot) => write!(f, "frame slot {slot} is in flight"),
            PipelineError::ProtocolViolation { source, violation } => {
                write!(f, "{source} channel protocol violation: {violation:?}")
            }
            PipelineError::StaleSignal(source) => {
                write!(f, "stale {source} signal pending at submit")
            }
            PipelineError::Stalled { source, polls } => {
                write!(f, "stalled waiting on {source} after {polls} polls")
            }
            PipelineError::Faulted => write!(f, "frame pipeline halted by an earlier error"),
        }
    }
}
