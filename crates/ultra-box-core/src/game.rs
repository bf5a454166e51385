//! Game hooks and the context each one is handed.
//!
//! Hooks run in this order: `on_boot` once before subsystem initialization,
//! `on_initialize` once in the bring-up context, then per frame
//! `on_new_frame`, `on_update` and `on_render`.

use ultra_box_hal::{DisplayMode, PhysAddr};

use crate::dispatch::JobTemplate;
use crate::frame::SlotIndex;
use crate::gfx::{CommandBufferError, CommandSink, Transform};
use crate::pipeline::PipelineConfig;
use crate::subsystem::Subsystems;

/// Boot hook context. Subsystem defaults are already filled in.
pub struct BootCtx<'a> {
    pub subsystems: &'a mut Subsystems,
    pub job: &'a mut JobTemplate,
    pub pipeline: &'a mut PipelineConfig,
}

/// Initialization context, after every subsystem is up.
pub struct InitCtx<'a, O> {
    pub subsystems: &'a Subsystems,
    /// Object state for each slot, indexed by [`SlotIndex::as_usize`].
    pub objects: [&'a mut O; 2],
}

pub struct NewFrameCtx<'a> {
    /// The current slot's clear list, already open.
    pub commands: &'a mut dyn CommandSink,
    pub framebuffer: PhysAddr,
    pub mode: DisplayMode,
    pub slot: SlotIndex,
    pub frame: u64,
}

pub struct UpdateCtx<'a, O> {
    pub transform: &'a mut Transform,
    pub objects: &'a mut O,
    pub slot: SlotIndex,
    pub frame: u64,
}

pub struct RenderCtx<'a, O> {
    /// The current slot's draw list, already open.
    pub commands: &'a mut dyn CommandSink,
    pub framebuffer: PhysAddr,
    pub mode: DisplayMode,
    /// Physical address of the slot's model-view matrix.
    pub model_view: PhysAddr,
    /// Physical address of the slot's projection matrix.
    pub projection: PhysAddr,
    /// Physical address of the slot's object state.
    pub objects_addr: PhysAddr,
    pub objects: &'a O,
    pub slot: SlotIndex,
    pub frame: u64,
}

pub trait Game {
    /// Per-slot object state the draw list references (vertices, etc).
    type Objects: Default;

    fn on_boot(&mut self, ctx: &mut BootCtx<'_>) {
        let _ = ctx;
    }

    fn on_initialize(&mut self, ctx: &mut InitCtx<'_, Self::Objects>) {
        let _ = ctx;
    }

    /// Fill the clear list.
    fn on_new_frame(&mut self, ctx: &mut NewFrameCtx<'_>) -> Result<(), CommandBufferError>;

    /// Advance simulation and write this slot's transform and objects.
    fn on_update(&mut self, ctx: &mut UpdateCtx<'_, Self::Objects>);

    /// Fill the draw list.
    fn on_render(&mut self, ctx: &mut RenderCtx<'_, Self::Objects>)
        -> Result<(), CommandBufferError>;
}
