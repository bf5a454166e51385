//! Host runner for the ultra-box frame pipeline.
//!
//! Boots the quad demo on a threaded simulator: one thread stands in for the
//! graphics coprocessor, another for the display refresh.

mod sim;
mod template;

use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use ultra_box_core::{boot, ChannelBank, PipelineConfig, WaitPolicy};
use ultra_box_hal::{DisplayMode, Resolution, VideoStandard};

use sim::{SimConfig, SimStats, Simulator};
use template::QuadDemo;

/// Completion channels bound to the simulator's event sources.
static CHANNELS: ChannelBank = ChannelBank::new();

const SUMMARY_INTERVAL: u64 = 120;

#[derive(Parser)]
#[command(name = "ultra-box")]
#[command(about = "Run the frame pipeline against a simulated console", long_about = None)]
#[command(version)]
struct Args {
    /// Number of frames to run
    #[arg(short, long, default_value = "600")]
    frames: u64,

    /// Use PAL timing instead of NTSC
    #[arg(long)]
    pal: bool,

    /// Use the 640x480 display mode
    #[arg(long)]
    hires: bool,

    /// Abort a wait after this many idle polls (0 waits forever)
    #[arg(long, default_value = "0")]
    watchdog_spins: u32,

    /// Simulated coprocessor time per job, in microseconds
    #[arg(long, default_value = "2000")]
    raster_us: u64,

    /// Override the display refresh period, in microseconds
    #[arg(long)]
    refresh_us: Option<u64>,

    /// Log filter, overriding RUST_LOG
    #[arg(long)]
    log: Option<String>,
}

impl Args {
    fn mode(&self) -> DisplayMode {
        let standard = if self.pal {
            VideoStandard::Pal
        } else {
            VideoStandard::Ntsc
        };
        let resolution = if self.hires {
            Resolution::High
        } else {
            Resolution::Low
        };
        DisplayMode::new(standard, resolution)
    }

    fn wait_policy(&self) -> WaitPolicy {
        match self.watchdog_spins {
            0 => WaitPolicy::Forever,
            max_polls => WaitPolicy::Watchdog { max_polls },
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    );
    if let Some(filter) = &args.log {
        logger.parse_filters(filter);
    }
    logger.init();

    let mode = args.mode();
    log::info!(
        "ultra-box: {}x{} @ {} Hz, {} frames",
        mode.width(),
        mode.height(),
        mode.refresh_hz(),
        args.frames
    );

    let platform = Simulator::new(SimConfig {
        raster_time: Duration::from_micros(args.raster_us),
        refresh_period: args.refresh_us.map(Duration::from_micros),
    });
    let config = PipelineConfig {
        wait_policy: args.wait_policy(),
        ..PipelineConfig::default()
    };

    let game = QuadDemo::new(mode).map_err(|e| anyhow!("init display list: {e}"))?;
    let mut pipeline = boot(platform, game, &CHANNELS, config)
        .map_err(|e| anyhow!("boot failed: {e}"))?
        .run()
        .map_err(|e| anyhow!("bring-up failed: {e}"))?;
    log::debug!(
        "display mode {} applied, features {:?}",
        pipeline.platform().mode().index(),
        pipeline.platform().features()
    );

    let started = Instant::now();
    let mut window = Instant::now();
    for _ in 0..args.frames {
        let report = pipeline
            .run_frame()
            .map_err(|e| anyhow!("frame {} failed: {e}", pipeline.frame()))?;
        log::trace!(
            "frame {} slot {}: clear {} words, draw {} words",
            report.frame,
            report.slot,
            report.clear_words,
            report.draw_words
        );

        if (report.frame + 1) % SUMMARY_INTERVAL == 0 {
            let elapsed = window.elapsed().as_secs_f64();
            window = Instant::now();
            let state = pipeline.game().state();
            log::info!(
                "frame {}: {:.1} fps, rot {:.3}, morph {:.3}",
                report.frame + 1,
                SUMMARY_INTERVAL as f64 / elapsed,
                state.rot_angle,
                state.morph_amt
            );
        }
    }

    let stats = pipeline.platform().stats();
    let overlaps = SimStats::get(&stats.overlaps);
    log::info!(
        "done: {} frames in {:.2?}, {} jobs, {} presented, {} stale refreshes, {} KiB written back",
        pipeline.frame(),
        started.elapsed(),
        SimStats::get(&stats.jobs_completed),
        pipeline.presenter().presented(),
        pipeline.presenter().stale_refreshes(),
        SimStats::get(&stats.writeback_bytes) / 1024
    );

    log::debug!("scanning out {:#010x}", pipeline.platform().scanout());

    if overlaps > 0 {
        bail!("coprocessor saw {overlaps} overlapping submissions");
    }
    Ok(())
}
