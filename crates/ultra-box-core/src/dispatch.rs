//! Coprocessor job dispatch and the submit/wait gate.
//!
//! The rasterizer completion channel holds one signal, so every submission
//! must be paired with exactly one wait before the next submission. The
//! dispatcher enforces that pairing instead of trusting call order.

use ultra_box_hal::{
    EventSource, JobDescriptor, PhysRegion, Platform, TaskFlags, TaskType,
};

use crate::channel::{ChannelBank, CompletionChannel, Stalled, WaitPolicy};
use crate::error::{PipelineError, Violation};
use crate::gfx::CommandBuffer;

/// Everything in a job descriptor except the command data.
///
/// Game code fills in the microcode and scratch regions from `on_boot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTemplate {
    pub task_type: TaskType,
    pub flags: TaskFlags,
    pub boot_ucode: PhysRegion,
    pub ucode: PhysRegion,
    pub ucode_data: PhysRegion,
    pub dram_stack: PhysRegion,
    pub output: PhysRegion,
    pub yield_data: PhysRegion,
}

impl Default for JobTemplate {
    fn default() -> Self {
        Self {
            task_type: TaskType::Graphics,
            flags: TaskFlags::DP_WAIT,
            boot_ucode: PhysRegion::EMPTY,
            ucode: PhysRegion::EMPTY,
            ucode_data: PhysRegion::EMPTY,
            dram_stack: PhysRegion::EMPTY,
            output: PhysRegion::EMPTY,
            yield_data: PhysRegion::EMPTY,
        }
    }
}

impl JobTemplate {
    /// Build a descriptor whose command data is `data`.
    pub fn bind(&self, data: PhysRegion) -> JobDescriptor {
        let mut job = JobDescriptor::new(self.task_type, self.flags);
        job.set_boot_ucode(self.boot_ucode);
        job.set_ucode(self.ucode);
        job.set_ucode_data(self.ucode_data);
        job.set_dram_stack(self.dram_stack);
        job.set_output(self.output);
        job.set_data(data);
        job.set_yield_data(self.yield_data);
        job
    }
}

/// Pairing state of one completion channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Gate {
    #[default]
    Idle,
    /// A job was submitted and its completion has not been consumed.
    Outstanding,
}

/// Submits coprocessor jobs and waits for their completion.
#[derive(Debug)]
pub struct Dispatcher {
    template: JobTemplate,
    policy: WaitPolicy,
    gate: Gate,
    submitted: u64,
    seen_coalesced: u32,
}

impl Dispatcher {
    /// A dispatcher with nothing outstanding. Every job it builds starts
    /// from `template`; every wait uses `policy`.
    pub fn new(template: JobTemplate, policy: WaitPolicy) -> Self {
        Self {
            template,
            policy,
            gate: Gate::Idle,
            submitted: 0,
            seen_coalesced: 0,
        }
    }

    /// Descriptor fields shared by every job.
    pub fn template(&self) -> &JobTemplate {
        &self.template
    }

    /// Whether a submitted job still awaits its wait.
    pub fn gate(&self) -> Gate {
        self.gate
    }

    /// Jobs started since boot.
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Write a closed buffer back to memory and bind it into a descriptor.
    pub fn prepare<P: Platform, const N: usize>(
        &self,
        platform: &mut P,
        buffer: &CommandBuffer<N>,
    ) -> JobDescriptor {
        let head = buffer.head_addr();
        let len = buffer.byte_len();
        platform.writeback(head, len);
        self.template
            .bind(PhysRegion::new(platform.to_physical(head), len as u32))
    }

    /// Start `job` on the coprocessor.
    pub fn submit<P: Platform>(
        &mut self,
        platform: &mut P,
        channels: &ChannelBank,
        job: &JobDescriptor,
    ) -> Result<(), PipelineError<P::Error>> {
        let source = EventSource::Rasterizer;
        if self.gate == Gate::Outstanding {
            log::error!("submit on {source} with a job still outstanding");
            return Err(PipelineError::ProtocolViolation {
                source,
                violation: Violation::SubmitWhileOutstanding,
            });
        }
        if channels.get(source).is_pending() {
            log::error!("stale {source} signal pending before submit");
            return Err(PipelineError::StaleSignal(source));
        }

        platform.start_task(job).map_err(PipelineError::Hardware)?;
        self.gate = Gate::Outstanding;
        self.submitted += 1;
        log::trace!(
            "job {} started: data {:#010x} ({} bytes)",
            self.submitted,
            job.data_ptr,
            job.data_size
        );
        Ok(())
    }

    /// Block until the outstanding job completes.
    pub fn wait<P: Platform>(
        &mut self,
        platform: &mut P,
        channels: &ChannelBank,
    ) -> Result<(), PipelineError<P::Error>> {
        let source = EventSource::Rasterizer;
        if self.gate == Gate::Idle {
            log::error!("wait on {source} with nothing submitted");
            return Err(PipelineError::ProtocolViolation {
                source,
                violation: Violation::WaitWithoutSubmit,
            });
        }

        let channel = channels.get(source);
        wait_for(platform, channel, source, self.policy)?;
        self.gate = Gate::Idle;

        let coalesced = channel.coalesced();
        if coalesced != self.seen_coalesced {
            log::warn!(
                "{source}: {} completion signal(s) coalesced",
                coalesced.wrapping_sub(self.seen_coalesced)
            );
            self.seen_coalesced = coalesced;
        }
        Ok(())
    }
}

/// Block on `channel`, idling the platform between polls.
pub(crate) fn wait_for<P: Platform>(
    platform: &mut P,
    channel: &CompletionChannel,
    source: EventSource,
    policy: WaitPolicy,
) -> Result<(), PipelineError<P::Error>> {
    channel
        .wait_one(policy, || platform.idle(source))
        .map_err(|Stalled { polls }| {
            log::error!("stalled on {source} after {polls} polls");
            PipelineError::Stalled { source, polls }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_fills_everything_but_data() {
        let template = JobTemplate {
            ucode: PhysRegion::new(0x1000, 0x800),
            dram_stack: PhysRegion::new(0x4000, 0x400),
            ..JobTemplate::default()
        };
        let job = template.bind(PhysRegion::new(0x8000, 24));

        assert_eq!(job.task_type, TaskType::Graphics as u32);
        assert!(job.flags().contains(TaskFlags::DP_WAIT));
        assert_eq!((job.ucode, job.ucode_size), (0x1000, 0x800));
        assert_eq!((job.dram_stack, job.dram_stack_size), (0x4000, 0x400));
        assert_eq!(job.data(), PhysRegion::new(0x8000, 24));
        assert_eq!(job.yield_data_size, 0);
    }
}
