//! The frame loop.
//!
//! One frame is a fixed sequence: build and submit the clear job, run the
//! update hook, build the draw list, wait for the clear job, submit the draw
//! job, wait for it, present, wait for refresh, rotate.

use core::convert::Infallible;
use core::mem::size_of;

use ultra_box_hal::{EventSource, Platform};

use crate::channel::{ChannelBank, WaitPolicy};
use crate::dispatch::Dispatcher;
use crate::error::PipelineError;
use crate::frame::{
    FrameSlots, SlotIndex, SlotState, DEFAULT_CLEAR_CAPACITY, DEFAULT_DRAW_CAPACITY,
};
use crate::game::{Game, NewFrameCtx, RenderCtx, UpdateCtx};
use crate::gfx::Transform;
use crate::present::Presenter;
use crate::sched::Scheduler;
use crate::subsystem::Subsystems;

/// Runtime knobs for the frame loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    pub wait_policy: WaitPolicy,
    /// Slot the first frame builds into.
    pub initial_slot: SlotIndex,
}

/// What one frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    pub slot: SlotIndex,
    pub clear_words: usize,
    pub draw_words: usize,
}

/// The frame-loop context: owns the platform, the game and both frame
/// slots once bring-up has handed over.
pub struct FramePipeline<
    P: Platform,
    G: Game,
    const CLEAR: usize = DEFAULT_CLEAR_CAPACITY,
    const DRAW: usize = DEFAULT_DRAW_CAPACITY,
> {
    platform: P,
    game: G,
    channels: &'static ChannelBank,
    subsystems: Subsystems,
    slots: FrameSlots<G::Objects, CLEAR, DRAW>,
    dispatcher: Dispatcher,
    presenter: Presenter,
    scheduler: Scheduler,
    frame: u64,
    primed: bool,
    faulted: bool,
}

impl<P: Platform, G: Game, const CLEAR: usize, const DRAW: usize>
    FramePipeline<P, G, CLEAR, DRAW>
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        platform: P,
        game: G,
        channels: &'static ChannelBank,
        subsystems: Subsystems,
        slots: FrameSlots<G::Objects, CLEAR, DRAW>,
        dispatcher: Dispatcher,
        config: PipelineConfig,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            platform,
            game,
            channels,
            subsystems,
            slots,
            dispatcher,
            presenter: Presenter::new(config.wait_policy),
            scheduler,
            frame: 0,
            primed: false,
            faulted: false,
        }
    }

    /// The platform the frame loop drives.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn subsystems(&self) -> &Subsystems {
        &self.subsystems
    }

    pub fn slots(&self) -> &FrameSlots<G::Objects, CLEAR, DRAW> {
        &self.slots
    }

    /// Frame slots; in-flight slots still refuse mutable access.
    pub fn slots_mut(&mut self) -> &mut FrameSlots<G::Objects, CLEAR, DRAW> {
        &mut self.slots
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn presenter(&self) -> &Presenter {
        &self.presenter
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Context priorities. The scheduler itself refuses changes that would
    /// let bring-up preempt the frame loop.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Frames completed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Run frames until one fails.
    pub fn run(mut self) -> Result<Infallible, PipelineError<P::Error>> {
        loop {
            self.run_frame()?;
        }
    }

    /// Whether an earlier frame failed.
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Build, submit and present one frame.
    ///
    /// A failed frame can leave a job on the coprocessor and its slot
    /// half-built, so after any error every later call returns
    /// [`PipelineError::Faulted`] without touching the slots.
    pub fn run_frame(&mut self) -> Result<FrameReport, PipelineError<P::Error>> {
        if self.faulted {
            return Err(PipelineError::Faulted);
        }
        let result = self.step();
        if let Err(e) = &result {
            log::error!("frame {} failed: {e}", self.frame);
            self.faulted = true;
        }
        result
    }

    fn step(&mut self) -> Result<FrameReport, PipelineError<P::Error>> {
        if !self.primed {
            let idle = self.slots.slot(self.slots.current().other()).framebuffer();
            self.presenter.prime(&mut self.platform, idle)?;
            self.primed = true;
        }

        let index = self.slots.current();
        let frame = self.frame;
        let mode = self.subsystems.video.mode;
        let platform = &mut self.platform;
        let channels = self.channels;
        let slot = self.slots.begin()?;
        let framebuffer = slot.framebuffer;

        slot.clear.open();
        self.game.on_new_frame(&mut NewFrameCtx {
            commands: &mut slot.clear,
            framebuffer,
            mode,
            slot: index,
            frame,
        })?;
        slot.clear.close()?;
        slot.clear_job = self.dispatcher.prepare(platform, &slot.clear);
        self.dispatcher.submit(platform, channels, &slot.clear_job)?;

        self.game.on_update(&mut UpdateCtx {
            transform: &mut slot.transform,
            objects: &mut slot.objects,
            slot: index,
            frame,
        });
        let transform_addr = &slot.transform as *const Transform as usize;
        let objects_addr = &slot.objects as *const G::Objects as usize;
        platform.writeback(transform_addr, size_of::<Transform>());
        platform.writeback(objects_addr, size_of::<G::Objects>());

        let transform_phys = platform.to_physical(transform_addr);
        slot.draw.open();
        self.game.on_render(&mut RenderCtx {
            commands: &mut slot.draw,
            framebuffer,
            mode,
            model_view: transform_phys + Transform::MODEL_VIEW_OFFSET as u32,
            projection: transform_phys + Transform::PROJECTION_OFFSET as u32,
            objects_addr: platform.to_physical(objects_addr),
            objects: &slot.objects,
            slot: index,
            frame,
        })?;
        slot.draw.close()?;
        slot.draw_job = self.dispatcher.prepare(platform, &slot.draw);

        // The draw job reuses the rasterizer channel; the clear job must
        // have drained it first.
        self.dispatcher.wait(platform, channels)?;
        slot.state = SlotState::InFlight;
        self.dispatcher.submit(platform, channels, &slot.draw_job)?;
        self.dispatcher.wait(platform, channels)?;

        let report = FrameReport {
            frame,
            slot: index,
            clear_words: slot.clear.len(),
            draw_words: slot.draw.len(),
        };

        self.presenter
            .present(&mut self.platform, self.channels, &mut self.slots)?;
        self.frame += 1;

        let coalesced = self.channels.get(EventSource::Rasterizer).coalesced();
        log::trace!(
            "frame {} on slot {} ({} clear, {} draw words, {} coalesced)",
            report.frame,
            report.slot,
            report.clear_words,
            report.draw_words,
            coalesced
        );
        Ok(report)
    }
}
