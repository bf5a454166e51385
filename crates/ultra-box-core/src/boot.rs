//! Boot sequencer and the bring-up context.
//!
//! [`boot`] runs the cold-start stages on the caller's stack and returns a
//! [`BringUp`]. Running the bring-up context consumes it, initializes the
//! subsystems, spawns the frame loop above itself and drops to the minimum
//! priority. There is no way back from [`FramePipeline`] to [`BringUp`].

use ultra_box_hal::Platform;

use crate::channel::ChannelBank;
use crate::dispatch::{Dispatcher, JobTemplate};
use crate::error::BootError;
use crate::frame::{FrameSlots, DEFAULT_CLEAR_CAPACITY, DEFAULT_DRAW_CAPACITY};
use crate::game::{BootCtx, Game, InitCtx};
use crate::pipeline::{FramePipeline, PipelineConfig};
use crate::sched::{ContextId, Priority, Scheduler};
use crate::subsystem::Subsystems;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootStage {
    ColdStart,
    HardwareBringUp,
    SubsystemDefaults,
    GameBootHook,
    SpawnBringUpContext,
}

/// Forward-only stage tracker.
#[derive(Debug)]
struct Sequencer {
    stage: BootStage,
}

impl Sequencer {
    fn advance(&mut self, next: BootStage) {
        debug_assert!(next > self.stage, "boot stage {next:?} after {:?}", self.stage);
        log::debug!("boot: {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }
}

/// Cold-start the machine with the default buffer capacities.
pub fn boot<P: Platform, G: Game>(
    platform: P,
    game: G,
    channels: &'static ChannelBank,
    config: PipelineConfig,
) -> Result<BringUp<P, G>, BootError<P::Error>> {
    BringUp::boot(platform, game, channels, config)
}

/// The bring-up context, ready to run.
pub struct BringUp<
    P: Platform,
    G: Game,
    const CLEAR: usize = DEFAULT_CLEAR_CAPACITY,
    const DRAW: usize = DEFAULT_DRAW_CAPACITY,
> {
    platform: P,
    game: G,
    channels: &'static ChannelBank,
    subsystems: Subsystems,
    job: JobTemplate,
    config: PipelineConfig,
    scheduler: Scheduler,
    stage: BootStage,
}

impl<P: Platform, G: Game, const CLEAR: usize, const DRAW: usize> BringUp<P, G, CLEAR, DRAW> {
    /// Cold-start with explicit command buffer capacities.
    pub fn boot(
        mut platform: P,
        mut game: G,
        channels: &'static ChannelBank,
        mut config: PipelineConfig,
    ) -> Result<Self, BootError<P::Error>> {
        let mut seq = Sequencer {
            stage: BootStage::ColdStart,
        };

        seq.advance(BootStage::HardwareBringUp);
        platform.bring_up().map_err(BootError::BringUp)?;

        seq.advance(BootStage::SubsystemDefaults);
        let mut subsystems = Subsystems::default();
        subsystems.set_defaults::<P>();

        seq.advance(BootStage::GameBootHook);
        let mut job = JobTemplate::default();
        game.on_boot(&mut BootCtx {
            subsystems: &mut subsystems,
            job: &mut job,
            pipeline: &mut config,
        });

        seq.advance(BootStage::SpawnBringUpContext);
        Ok(Self {
            platform,
            game,
            channels,
            subsystems,
            job,
            config,
            scheduler: Scheduler::new(),
            stage: seq.stage,
        })
    }

    pub fn stage(&self) -> BootStage {
        self.stage
    }

    pub fn subsystems(&self) -> &Subsystems {
        &self.subsystems
    }

    pub fn job_template(&self) -> &JobTemplate {
        &self.job
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Run the bring-up context and hand the CPU to the frame loop.
    pub fn run(mut self) -> Result<FramePipeline<P, G, CLEAR, DRAW>, BootError<P::Error>> {
        self.subsystems
            .initialize(&mut self.platform, self.channels)?;

        let mut slots: FrameSlots<G::Objects, CLEAR, DRAW> =
            FrameSlots::new(self.subsystems.video.framebuffers, self.config.initial_slot);
        self.game.on_initialize(&mut InitCtx {
            subsystems: &self.subsystems,
            objects: slots.initial_objects(),
        });

        self.scheduler.spawn_frame_loop(Priority::FRAME_LOOP)?;
        self.scheduler
            .set_priority(ContextId::BringUp, Priority::MIN)?;
        log::info!(
            "frame loop running at priority {}, bring-up idle",
            Priority::FRAME_LOOP.0
        );

        let dispatcher = Dispatcher::new(self.job, self.config.wait_policy);
        Ok(FramePipeline::new(
            self.platform,
            self.game,
            self.channels,
            self.subsystems,
            slots,
            dispatcher,
            self.config,
            self.scheduler,
        ))
    }
}
