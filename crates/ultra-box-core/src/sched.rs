//! Static-priority model of the two software contexts.
//!
//! The bring-up context spawns the frame loop above itself and then drops to
//! the minimum priority for good. With strict priorities the frame loop runs
//! whenever it is ready; bring-up only gets the CPU while the frame loop is
//! blocked on a completion channel.

use core::fmt;

/// The two software contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextId {
    BringUp,
    FrameLoop,
}

/// Static priority; higher runs first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub u8);

impl Priority {
    pub const MIN: Priority = Priority(0);
    pub const BRING_UP: Priority = Priority(10);
    pub const FRAME_LOOP: Priority = Priority(11);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// The frame loop was already spawned.
    AlreadySpawned,
    /// The frame loop must run above the context that spawns it.
    SpawnBelowParent { parent: Priority, child: Priority },
    /// The frame loop has not been spawned yet.
    NotSpawned,
    /// Bring-up priority may only go down once lowered.
    Reelevation { from: Priority, to: Priority },
    /// The frame loop must stay above the lowered bring-up context.
    FrameLoopNotAbove { bring_up: Priority, frame_loop: Priority },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::AlreadySpawned => write!(f, "frame loop already spawned"),
            SchedulerError::SpawnBelowParent { parent, child } => write!(
                f,
                "frame loop priority {} not above bring-up priority {}",
                child.0, parent.0
            ),
            SchedulerError::NotSpawned => write!(f, "frame loop not spawned"),
            SchedulerError::Reelevation { from, to } => write!(
                f,
                "bring-up priority cannot be raised from {} to {}",
                from.0, to.0
            ),
            SchedulerError::FrameLoopNotAbove {
                bring_up,
                frame_loop,
            } => write!(
                f,
                "frame loop priority {} would not preempt bring-up at {}",
                frame_loop.0, bring_up.0
            ),
        }
    }
}

/// Priorities of the bring-up and frame-loop contexts.
#[derive(Debug, Clone)]
pub struct Scheduler {
    bring_up: Priority,
    frame_loop: Option<Priority>,
    lowered: bool,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Only the bring-up context exists, at [`Priority::BRING_UP`].
    pub const fn new() -> Self {
        Self {
            bring_up: Priority::BRING_UP,
            frame_loop: None,
            lowered: false,
        }
    }

    /// Current priority of `context`, or `None` if it was never spawned.
    pub fn priority(&self, context: ContextId) -> Option<Priority> {
        match context {
            ContextId::BringUp => Some(self.bring_up),
            ContextId::FrameLoop => self.frame_loop,
        }
    }

    /// Spawn the frame loop. It must run strictly above bring-up.
    pub fn spawn_frame_loop(&mut self, priority: Priority) -> Result<(), SchedulerError> {
        if self.frame_loop.is_some() {
            return Err(SchedulerError::AlreadySpawned);
        }
        if priority <= self.bring_up {
            return Err(SchedulerError::SpawnBelowParent {
                parent: self.bring_up,
                child: priority,
            });
        }
        self.frame_loop = Some(priority);
        log::debug!("frame loop spawned at priority {}", priority.0);
        Ok(())
    }

    /// Change a context's priority.
    ///
    /// Once bring-up has been lowered it can never be raised again, and the
    /// frame loop can never be moved to or below it.
    pub fn set_priority(
        &mut self,
        context: ContextId,
        priority: Priority,
    ) -> Result<(), SchedulerError> {
        match context {
            ContextId::BringUp => {
                if self.lowered && priority > self.bring_up {
                    log::error!(
                        "refusing to raise bring-up priority {} -> {}",
                        self.bring_up.0,
                        priority.0
                    );
                    return Err(SchedulerError::Reelevation {
                        from: self.bring_up,
                        to: priority,
                    });
                }
                if priority < self.bring_up {
                    self.lowered = true;
                }
                self.bring_up = priority;
            }
            ContextId::FrameLoop => {
                if self.frame_loop.is_none() {
                    return Err(SchedulerError::NotSpawned);
                }
                if self.lowered && priority <= self.bring_up {
                    log::error!(
                        "refusing to drop frame loop to {} at or below bring-up {}",
                        priority.0,
                        self.bring_up.0
                    );
                    return Err(SchedulerError::FrameLoopNotAbove {
                        bring_up: self.bring_up,
                        frame_loop: priority,
                    });
                }
                self.frame_loop = Some(priority);
            }
        }
        Ok(())
    }

    /// The context that owns the CPU when both are ready. Ties go to the
    /// earlier spawn.
    pub fn running(&self) -> ContextId {
        match self.frame_loop {
            Some(frame_loop) if frame_loop > self.bring_up => ContextId::FrameLoop,
            _ => ContextId::BringUp,
        }
    }
}
