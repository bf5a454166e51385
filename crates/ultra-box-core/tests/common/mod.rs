//! Recording mock platform and game shared by the integration tests.
//!
//! The mock delivers completions lazily from `idle`, so every wait shows up
//! in the event log between the submit it pairs with and whatever follows.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ultra_box_core::gfx::opcode::{self, geometry, matrix, other_mode};
use ultra_box_core::gfx::{CommandBufferError, Mtx, Opcode, Vtx};
use ultra_box_core::{
    BootCtx, ChannelBank, Game, InitCtx, NewFrameCtx, RenderCtx, SlotIndex, UpdateCtx,
};
use ultra_box_hal::{
    Coprocessor, DataCache, DisplayController, DisplayFeatures, DisplayMode, EventBinder,
    EventSource, Hardware, JobDescriptor, MediaHandle, MediaKind, PhysAddr, PhysRegion, Signal,
    StorageMedia,
};

pub const FRAMEBUFFERS: [PhysAddr; 2] = [0x0010_0000, 0x0013_0000];

/// Recorded platform call.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BringUp,
    Bind(EventSource),
    StartDisplayManager,
    SetMode(DisplayMode),
    SetFeatures(DisplayFeatures),
    StartTransferManager(usize),
    Writeback { addr: usize, len: usize },
    StartTask(PhysRegion),
    Swap(PhysAddr),
    Wait(EventSource),
}

#[derive(Debug)]
pub struct MockError;

#[derive(Clone)]
pub struct MockPlatform {
    events: Rc<RefCell<Vec<Event>>>,
    sinks: Rc<RefCell<Vec<(EventSource, &'static dyn Signal)>>>,
    running: Rc<Cell<u32>>,
    pub complete_tasks: bool,
    pub fail_bring_up: bool,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
            sinks: Rc::new(RefCell::new(Vec::new())),
            running: Rc::new(Cell::new(0)),
            complete_tasks: true,
            fail_bring_up: false,
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    /// Events with cache writebacks filtered out.
    pub fn timeline(&self) -> Vec<Event> {
        self.events
            .borrow()
            .iter()
            .filter(|e| !matches!(e, Event::Writeback { .. }))
            .cloned()
            .collect()
    }

    pub fn started_tasks(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::StartTask(_)))
            .count()
    }

    /// Tasks started and not yet completed.
    pub fn running(&self) -> u32 {
        self.running.get()
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn raise(&self, source: EventSource) {
        for (bound, sink) in self.sinks.borrow().iter() {
            if *bound == source {
                sink.signal();
            }
        }
    }
}

impl Hardware for MockPlatform {
    type Error = MockError;

    fn bring_up(&mut self) -> Result<(), MockError> {
        if self.fail_bring_up {
            return Err(MockError);
        }
        self.record(Event::BringUp);
        Ok(())
    }

    fn idle(&mut self, waiting_on: EventSource) {
        let last = self.events.borrow().last().cloned();
        if last != Some(Event::Wait(waiting_on)) {
            self.record(Event::Wait(waiting_on));
        }
        match waiting_on {
            EventSource::Rasterizer if self.complete_tasks && self.running.get() > 0 => {
                self.running.set(self.running.get() - 1);
                self.raise(EventSource::SignalProcessor);
                self.raise(EventSource::Rasterizer);
            }
            EventSource::DisplayRefresh => self.raise(EventSource::DisplayRefresh),
            _ => {}
        }
    }
}

impl EventBinder for MockPlatform {
    fn bind_event(
        &mut self,
        source: EventSource,
        sink: &'static dyn Signal,
    ) -> Result<(), MockError> {
        self.sinks.borrow_mut().retain(|(bound, _)| *bound != source);
        self.sinks.borrow_mut().push((source, sink));
        self.record(Event::Bind(source));
        Ok(())
    }
}

impl Coprocessor for MockPlatform {
    fn start_task(&mut self, job: &JobDescriptor) -> Result<(), MockError> {
        self.running.set(self.running.get() + 1);
        self.record(Event::StartTask(job.data()));
        Ok(())
    }
}

impl DataCache for MockPlatform {
    fn writeback(&mut self, virt: usize, len: usize) {
        self.record(Event::Writeback { addr: virt, len });
    }
}

impl DisplayController for MockPlatform {
    fn start_display_manager(&mut self) -> Result<(), MockError> {
        self.record(Event::StartDisplayManager);
        Ok(())
    }

    fn set_mode(&mut self, mode: DisplayMode) -> Result<(), MockError> {
        self.record(Event::SetMode(mode));
        Ok(())
    }

    fn set_features(&mut self, features: DisplayFeatures) -> Result<(), MockError> {
        self.record(Event::SetFeatures(features));
        Ok(())
    }

    fn swap_buffer(&mut self, framebuffer: PhysAddr) -> Result<(), MockError> {
        self.record(Event::Swap(framebuffer));
        Ok(())
    }
}

impl StorageMedia for MockPlatform {
    fn open_media(&mut self, kind: MediaKind) -> Option<MediaHandle> {
        match kind {
            MediaKind::CartridgeRom => Some(MediaHandle(1)),
            _ => None,
        }
    }

    fn start_transfer_manager(&mut self, queue_depth: usize) -> Result<(), MockError> {
        self.record(Event::StartTransferManager(queue_depth));
        Ok(())
    }
}

/// Fresh channel bank with the `'static` lifetime hardware bindings need.
pub fn leak_channels() -> &'static ChannelBank {
    Box::leak(Box::new(ChannelBank::new()))
}

/// Recorded game hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Boot,
    Initialize,
    NewFrame(SlotIndex),
    Update(SlotIndex),
    Render(SlotIndex),
}

pub type Objects = [Vtx; 4];

/// Minimal game: a clear list, a transform and one quad.
pub struct TestGame {
    pub hooks: Rc<RefCell<Vec<Hook>>>,
    /// Extra commands appended to the clear list.
    pub clear_padding: usize,
    pub boot_hook: Option<fn(&mut BootCtx<'_>)>,
    /// Retrace queue depth observed by `on_boot`.
    pub seen_retrace_depth: Rc<Cell<usize>>,
}

impl TestGame {
    pub fn new() -> Self {
        Self {
            hooks: Rc::new(RefCell::new(Vec::new())),
            clear_padding: 0,
            boot_hook: None,
            seen_retrace_depth: Rc::new(Cell::new(0)),
        }
    }

    pub fn hooks(&self) -> Vec<Hook> {
        self.hooks.borrow().clone()
    }
}

impl Game for TestGame {
    type Objects = Objects;

    fn on_boot(&mut self, ctx: &mut BootCtx<'_>) {
        self.hooks.borrow_mut().push(Hook::Boot);
        self.seen_retrace_depth
            .set(ctx.subsystems.video.retrace_queue_depth);
        ctx.subsystems.video.framebuffers = FRAMEBUFFERS;
        if let Some(hook) = self.boot_hook {
            hook(ctx);
        }
    }

    fn on_initialize(&mut self, ctx: &mut InitCtx<'_, Objects>) {
        self.hooks.borrow_mut().push(Hook::Initialize);
        for objects in ctx.objects.iter_mut() {
            objects[1].cn = [0, 0xFF, 0, 0xFF];
        }
    }

    fn on_new_frame(&mut self, ctx: &mut NewFrameCtx<'_>) -> Result<(), CommandBufferError> {
        self.hooks.borrow_mut().push(Hook::NewFrame(ctx.slot));
        ctx.commands.extend(&[
            Opcode::cycle_type(other_mode::CYC_FILL),
            Opcode::SetColorImage {
                format: opcode::image::FMT_RGBA,
                size: opcode::image::SIZ_16B,
                width: ctx.mode.width(),
                addr: ctx.framebuffer,
            },
            Opcode::SetFillColor(0),
        ])?;
        for _ in 0..self.clear_padding {
            ctx.commands.append(Opcode::PipeSync)?;
        }
        ctx.commands.append(Opcode::FullSync)
    }

    fn on_update(&mut self, ctx: &mut UpdateCtx<'_, Objects>) {
        self.hooks.borrow_mut().push(Hook::Update(ctx.slot));
        ctx.transform.model_view = Mtx::IDENTITY;
        ctx.transform.projection = Mtx::IDENTITY;
        ctx.objects[0].set_position(ctx.frame as i16, 0, 0);
    }

    fn on_render(&mut self, ctx: &mut RenderCtx<'_, Objects>) -> Result<(), CommandBufferError> {
        self.hooks.borrow_mut().push(Hook::Render(ctx.slot));
        ctx.commands.extend(&[
            Opcode::Matrix {
                addr: ctx.projection,
                params: matrix::PROJECTION | matrix::LOAD,
            },
            Opcode::Matrix {
                addr: ctx.model_view,
                params: matrix::MODELVIEW | matrix::LOAD,
            },
            Opcode::set_geometry_mode(geometry::SHADE),
            Opcode::Vertex {
                addr: ctx.objects_addr,
                count: 4,
                start: 0,
            },
            Opcode::Triangle {
                v0: 0,
                v1: 2,
                v2: 1,
                flag: 0,
            },
            Opcode::Triangle {
                v0: 1,
                v1: 2,
                v2: 3,
                flag: 0,
            },
            Opcode::FullSync,
        ])
    }
}
