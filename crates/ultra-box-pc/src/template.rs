//! Template game: a shaded quad that slides, spins and morphs.

use std::f32::consts::TAU;

use glam::{Mat4, Vec3};
use ultra_box_core::gfx::opcode::{
    self, geometry, image, matrix, other_mode, render_mode, MAX_FB_Z,
};
use ultra_box_core::gfx::{
    perspective, CombineCycle, CommandBuffer, CommandBufferError, CommandSink, Mtx, Opcode, Vp,
    Vtx,
};
use ultra_box_core::{BootCtx, Game, InitCtx, NewFrameCtx, RenderCtx, UpdateCtx};
use ultra_box_hal::{k0_to_physical, DisplayMode, PhysAddr, PhysRegion};

/// Vertex positions are stored at this scale and scaled back down by the
/// model matrix, for sub-unit precision in 16-bit coordinates.
const HP_VERTEX_SCALE: f32 = 128.0;

/// Signal processor scratch stack, in 64-bit words.
const DRAM_STACK_WORDS: usize = 128;

const RCP_INIT_CAPACITY: usize = 32;

/// Per-slot vertex data.
pub type Quad = [Vtx; 4];

const DEFAULT_QUAD: Quad = [
    Vtx::new([0, 0, 0], [0, 0], [0xFF, 0x00, 0x00, 0xFF]),
    Vtx::new([0, 0, 0], [31 << 6, 0], [0x00, 0xFF, 0x00, 0xFF]),
    Vtx::new([0, 0, 0], [0, 127 << 6], [0x00, 0x00, 0xFF, 0xFF]),
    Vtx::new([0, 0, 0], [31 << 6, 127 << 6], [0xFF, 0xFF, 0x00, 0xFF]),
];

fn physical<T>(data: &[T]) -> PhysAddr {
    k0_to_physical(data.as_ptr() as usize)
}

/// Animation state advanced once per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QuadState {
    pub mov_amt: f32,
    pub rot_angle: f32,
    pub morph_amt: f32,
    pub persp_norm: u16,
}

impl QuadState {
    fn advance(&mut self, dt: f32) {
        self.mov_amt += 0.2185 * dt;
        if self.mov_amt > TAU {
            self.mov_amt -= TAU;
        }
        self.rot_angle += 0.7316 * dt;
        if self.rot_angle > TAU {
            self.rot_angle -= TAU;
        }
        self.morph_amt -= 1.4823 * dt;
        if self.morph_amt < 0.0 {
            self.morph_amt += TAU;
        }
    }
}

pub struct QuadDemo {
    mode: DisplayMode,
    state: QuadState,
    // Heap storage keeps addresses stable after the game moves into the
    // pipeline.
    framebuffers: [Vec<u16>; 2],
    depth_buffer: Vec<u16>,
    dram_stack: Vec<u64>,
    viewport: Box<Vp>,
    rcp_init: Box<CommandBuffer<RCP_INIT_CAPACITY>>,
}

impl QuadDemo {
    /// Allocate buffers for `mode` and record the shared init list.
    pub fn new(mode: DisplayMode) -> Result<Self, CommandBufferError> {
        let pixels = mode.width() as usize * mode.height() as usize;
        let mut game = Self {
            mode,
            state: QuadState::default(),
            framebuffers: [vec![0; pixels], vec![0; pixels]],
            depth_buffer: vec![0; pixels],
            dram_stack: vec![0; DRAM_STACK_WORDS],
            viewport: Box::new(Vp::full_screen(mode.width(), mode.height())),
            rcp_init: Box::new(CommandBuffer::new()),
        };
        game.build_rcp_init()?;
        Ok(game)
    }

    pub fn state(&self) -> &QuadState {
        &self.state
    }

    pub fn framebuffer_addrs(&self) -> [PhysAddr; 2] {
        [
            physical(&self.framebuffers[0]),
            physical(&self.framebuffers[1]),
        ]
    }

    fn rcp_init_addr(&self) -> PhysAddr {
        k0_to_physical(self.rcp_init.head_addr())
    }

    /// Static coprocessor state shared by the clear and draw lists.
    fn build_rcp_init(&mut self) -> Result<(), CommandBufferError> {
        let width = self.mode.width();
        let height = self.mode.height();
        let viewport = k0_to_physical(&*self.viewport as *const Vp as usize);

        let list = &mut self.rcp_init;
        list.open();
        list.extend(&[
            Opcode::Segment {
                segment: 0,
                base: 0,
            },
            Opcode::clear_geometry_mode(
                geometry::ZBUFFER
                    | geometry::SHADE
                    | geometry::SHADING_SMOOTH
                    | geometry::CULL_BOTH
                    | geometry::FOG
                    | geometry::LIGHTING
                    | geometry::TEXTURE_GEN
                    | geometry::TEXTURE_GEN_LINEAR
                    | geometry::LOD
                    | geometry::CLIPPING,
            ),
            Opcode::set_geometry_mode(geometry::ZBUFFER | geometry::CLIPPING),
            Opcode::Texture {
                s: 0,
                t: 0,
                level: 0,
                tile: 0,
                on: false,
            },
            Opcode::Viewport(viewport),
            Opcode::SetOtherModeH {
                field: other_mode::PIPELINE,
                value: other_mode::PM_NPRIMITIVE,
            },
            Opcode::SetScissor {
                mode: 0,
                ulx: 0,
                uly: 0,
                lrx: width - 1,
                lry: height - 1,
            },
            Opcode::SetOtherModeH {
                field: other_mode::TEXTURE_LOD,
                value: other_mode::TL_TILE,
            },
            Opcode::SetOtherModeH {
                field: other_mode::TEXTURE_LUT,
                value: other_mode::TT_NONE,
            },
            Opcode::SetOtherModeH {
                field: other_mode::TEXTURE_DETAIL,
                value: other_mode::TD_CLAMP,
            },
            Opcode::SetOtherModeH {
                field: other_mode::TEXTURE_PERSP,
                value: other_mode::TP_PERSP,
            },
            Opcode::SetOtherModeH {
                field: other_mode::TEXTURE_FILTER,
                value: other_mode::TF_BILERP,
            },
            Opcode::SetOtherModeH {
                field: other_mode::TEXTURE_CONVERT,
                value: other_mode::TC_FILT,
            },
            Opcode::SetOtherModeH {
                field: other_mode::COMBINE_KEY,
                value: other_mode::CK_NONE,
            },
            Opcode::SetOtherModeL {
                field: other_mode::ALPHA_COMPARE,
                value: other_mode::AC_NONE,
            },
            Opcode::SetOtherModeH {
                field: other_mode::COLOR_DITHER,
                value: other_mode::CD_DISABLE,
            },
            Opcode::SetPrimColor {
                min_level: 0,
                lod_fraction: 0,
                color: [0, 0, 64, 255],
            },
            Opcode::PipeSync,
        ])?;
        list.close()
    }
}

impl Game for QuadDemo {
    type Objects = Quad;

    fn on_boot(&mut self, ctx: &mut BootCtx<'_>) {
        ctx.subsystems.video.mode = self.mode;
        ctx.subsystems.video.framebuffers = self.framebuffer_addrs();

        ctx.job.dram_stack = PhysRegion::new(
            physical(&self.dram_stack),
            (DRAM_STACK_WORDS * 8) as u32,
        );
    }

    fn on_initialize(&mut self, ctx: &mut InitCtx<'_, Quad>) {
        for quad in ctx.objects.iter_mut() {
            **quad = DEFAULT_QUAD;
        }
        self.state = QuadState::default();
    }

    fn on_new_frame(&mut self, ctx: &mut NewFrameCtx<'_>) -> Result<(), CommandBufferError> {
        let width = self.mode.width();
        let height = self.mode.height();
        let depth = physical(&self.depth_buffer);
        let z_clear = opcode::pack_zdz(MAX_FB_Z, 0);
        let cfb_clear = opcode::pack_rgba5551(0, 16, 16, 1);

        ctx.commands.extend(&[
            Opcode::DisplayList(self.rcp_init_addr()),
            Opcode::cycle_type(other_mode::CYC_FILL),
            Opcode::SetColorImage {
                format: image::FMT_RGBA,
                size: image::SIZ_16B,
                width,
                addr: depth,
            },
            Opcode::SetFillColor(opcode::fill_color16(z_clear)),
            Opcode::FillRectangle {
                ulx: 0,
                uly: 0,
                lrx: width - 1,
                lry: height - 1,
            },
            Opcode::SetColorImage {
                format: image::FMT_RGBA,
                size: image::SIZ_16B,
                width,
                addr: ctx.framebuffer,
            },
            Opcode::SetFillColor(opcode::fill_color16(cfb_clear)),
            Opcode::FillRectangle {
                ulx: 0,
                uly: 0,
                lrx: width - 1,
                lry: height - 1,
            },
            Opcode::SetDepthImage(depth),
            Opcode::FullSync,
        ])
    }

    fn on_update(&mut self, ctx: &mut UpdateCtx<'_, Quad>) {
        self.state.advance(self.mode.refresh_period());
        let state = self.state;

        let vertical = state.morph_amt.sin() * 0.7;
        let horizontal = state.morph_amt.cos() * 0.5;
        let hp = |v: f32| (v * HP_VERTEX_SCALE) as i16;
        let (ulx, uly) = (hp(-1.0 + horizontal), hp(1.0 + vertical));
        let (lrx, lry) = (hp(1.0 - horizontal), hp(-1.0));

        let quad = &mut *ctx.objects;
        quad[0].set_position(ulx, uly, 0);
        quad[1].set_position(lrx, uly, 0);
        quad[2].set_position(ulx, lry, 0);
        quad[3].set_position(lrx, lry, 0);

        let model = Mat4::from_translation(Vec3::new(state.rot_angle.sin(), 0.0, 0.0))
            * Mat4::from_rotation_y(state.rot_angle)
            * Mat4::from_scale(Vec3::splat(1.0 / HP_VERTEX_SCALE));
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 2.5), Vec3::ZERO, Vec3::Y);
        ctx.transform.model_view = Mtx::from_mat4(&(view * model));

        let aspect = self.mode.width() as f32 / self.mode.height() as f32;
        let (projection, norm) = perspective(80.0, aspect, 0.01, 10.0);
        ctx.transform.projection = Mtx::from_mat4(&projection);
        self.state.persp_norm = norm;
    }

    fn on_render(&mut self, ctx: &mut RenderCtx<'_, Quad>) -> Result<(), CommandBufferError> {
        ctx.commands.extend(&[
            Opcode::DisplayList(self.rcp_init_addr()),
            Opcode::PerspNormalize(self.state.persp_norm),
            Opcode::Matrix {
                addr: ctx.projection,
                params: matrix::PROJECTION | matrix::LOAD | matrix::NOPUSH,
            },
            Opcode::Matrix {
                addr: ctx.model_view,
                params: matrix::MODELVIEW | matrix::LOAD | matrix::NOPUSH,
            },
            Opcode::SetOtherModeH {
                field: other_mode::TEXTURE_FILTER,
                value: other_mode::TF_BILERP,
            },
            Opcode::SetOtherModeH {
                field: other_mode::TEXTURE_PERSP,
                value: other_mode::TP_PERSP,
            },
            Opcode::SetOtherModeH {
                field: other_mode::TEXTURE_DETAIL,
                value: other_mode::TD_CLAMP,
            },
            Opcode::SetOtherModeH {
                field: other_mode::TEXTURE_LOD,
                value: other_mode::TL_TILE,
            },
            Opcode::SetOtherModeH {
                field: other_mode::TEXTURE_LUT,
                value: other_mode::TT_NONE,
            },
            Opcode::set_geometry_mode(geometry::SHADE | geometry::SHADING_SMOOTH),
            Opcode::cycle_type(other_mode::CYC_1CYCLE),
            Opcode::render_mode(render_mode::ZB_XLU_SURF, render_mode::ZB_XLU_SURF2),
            Opcode::combine_mode(CombineCycle::SHADE, CombineCycle::SHADE),
            Opcode::PipeSync,
            // Front faces are counter-clockwise.
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
