#![cfg_attr(not(test), no_std)]

//! Frame pipeline for a machine with a graphics coprocessor, a refresh-driven
//! display controller and non-coherent shared memory.
//!
//! [`boot`] brings the machine up and returns the bring-up context; running
//! it yields a [`FramePipeline`] that builds, submits and presents one frame
//! per call to [`FramePipeline::run_frame`]. Everything hardware-facing goes
//! through the [`ultra_box_hal::Platform`] traits.

pub mod boot;
pub mod channel;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod game;
pub mod gfx;
pub mod pipeline;
pub mod present;
pub mod sched;
pub mod subsystem;

pub use boot::{boot, BootStage, BringUp};
pub use channel::{ChannelBank, CompletionChannel, WaitPolicy};
pub use dispatch::{Dispatcher, Gate, JobTemplate};
pub use error::{BootError, PipelineError, Violation};
pub use frame::{FrameSlot, FrameSlots, SlotInFlight, SlotIndex, SlotState};
pub use game::{BootCtx, Game, InitCtx, NewFrameCtx, RenderCtx, UpdateCtx};
pub use pipeline::{FramePipeline, FrameReport, PipelineConfig};
pub use present::Presenter;
pub use sched::{ContextId, Priority, Scheduler, SchedulerError};
pub use subsystem::{DeviceState, Subsystem, Subsystems, SystemState, VideoState};
