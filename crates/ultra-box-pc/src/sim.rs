//! Threaded model of the coprocessor and display controller.
//!
//! The coprocessor thread takes one job at a time, holds it for the
//! configured raster time, then raises the signal-processor and rasterizer
//! completion events. The display thread ticks at the refresh rate, latches
//! the most recently swapped framebuffer and raises display refresh. Both
//! threads deliver events through the `'static` sinks bound by the engine.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ultra_box_hal::{
    Coprocessor, DataCache, DisplayController, DisplayFeatures, DisplayMode, EventBinder,
    EventSource, Hardware, JobDescriptor, MediaHandle, MediaKind, PhysAddr, Signal, StorageMedia,
};

/// Simulator failures surfaced through the platform traits.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A task was started while the previous one was still running.
    #[error("coprocessor received a task while busy")]
    Overlap,

    /// The job's command list is empty.
    #[error("job has no command data")]
    EmptyCommandList,

    /// The coprocessor thread is gone.
    #[error("coprocessor thread has stopped")]
    CoprocessorStopped,

    /// A display call arrived before the display manager was started.
    #[error("display manager not started")]
    DisplayNotStarted,

    /// The display thread died holding the scan-out registers.
    #[error("display thread has stopped")]
    DisplayStopped,

    /// Hardware bring-up was requested twice.
    #[error("hardware already brought up")]
    AlreadyUp,

    /// A simulator thread could not be spawned.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Simulator timing.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Time the coprocessor spends on each job.
    pub raster_time: Duration,
    /// Refresh period override; `None` follows the display mode.
    pub refresh_period: Option<Duration>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            raster_time: Duration::from_micros(2000),
            refresh_period: None,
        }
    }
}

/// Counters shared with the simulator threads.
#[derive(Debug, Default)]
pub struct SimStats {
    pub jobs_started: AtomicU64,
    pub jobs_completed: AtomicU64,
    pub overlaps: AtomicU64,
    pub refreshes: AtomicU64,
    pub scanouts: AtomicU64,
    pub writeback_bytes: AtomicU64,
}

impl SimStats {
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

const SOURCE_COUNT: usize = 4;

fn sink_index(source: EventSource) -> usize {
    match source {
        EventSource::MemoryTransfer => 0,
        EventSource::SignalProcessor => 1,
        EventSource::Rasterizer => 2,
        EventSource::DisplayRefresh => 3,
    }
}

/// Completion sinks, one per event source.
#[derive(Default)]
struct Sinks {
    bound: Mutex<[Option<&'static dyn Signal>; SOURCE_COUNT]>,
}

impl Sinks {
    fn bind(&self, source: EventSource, sink: &'static dyn Signal) {
        if let Ok(mut bound) = self.bound.lock() {
            bound[sink_index(source)] = Some(sink);
        }
    }

    fn raise(&self, source: EventSource) {
        let sink = self
            .bound
            .lock()
            .ok()
            .and_then(|bound| bound[sink_index(source)]);
        match sink {
            Some(sink) => sink.signal(),
            None => log::trace!("{source} raised with no sink bound"),
        }
    }
}

/// Scan-out registers. A retrace latches `next` and raises refresh under
/// one lock, so a swap lands wholly before or after any given retrace.
#[derive(Default)]
struct ScanoutRegs {
    next: Option<PhysAddr>,
    current: PhysAddr,
}

/// State shared between the platform handle and the display thread.
#[derive(Default)]
struct Scanout {
    regs: Mutex<ScanoutRegs>,
    period_us: AtomicU64,
}

pub struct Simulator {
    config: SimConfig,
    sinks: Arc<Sinks>,
    stats: Arc<SimStats>,
    scanout: Arc<Scanout>,
    busy: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    jobs: Option<mpsc::Sender<JobDescriptor>>,
    coprocessor: Option<JoinHandle<()>>,
    display: Option<JoinHandle<()>>,
    mode: DisplayMode,
    features: DisplayFeatures,
    next_media: u32,
}

impl Simulator {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            sinks: Arc::new(Sinks::default()),
            stats: Arc::new(SimStats::default()),
            scanout: Arc::new(Scanout::default()),
            busy: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(AtomicBool::new(false)),
            jobs: None,
            coprocessor: None,
            display: None,
            mode: DisplayMode::default(),
            features: DisplayFeatures::default(),
            next_media: 1,
        }
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn features(&self) -> DisplayFeatures {
        self.features
    }

    /// Framebuffer the display is scanning out.
    pub fn scanout(&self) -> PhysAddr {
        self.scanout.regs.lock().map_or(0, |regs| regs.current)
    }

    fn refresh_period(&self) -> Duration {
        self.config
            .refresh_period
            .unwrap_or_else(|| Duration::from_secs_f32(self.mode.refresh_period()))
    }

    fn spawn_coprocessor(&mut self) -> Result<(), SimError> {
        let (tx, rx) = mpsc::channel::<JobDescriptor>();
        let sinks = Arc::clone(&self.sinks);
        let stats = Arc::clone(&self.stats);
        let busy = Arc::clone(&self.busy);
        let raster_time = self.config.raster_time;

        let handle = thread::Builder::new()
            .name("coprocessor".into())
            .spawn(move || {
                for job in rx {
                    thread::sleep(raster_time);
                    log::trace!("coprocessor: job done ({} bytes)", job.data_size);
                    stats.jobs_completed.fetch_add(1, Ordering::Relaxed);
                    busy.store(false, Ordering::Release);
                    sinks.raise(EventSource::SignalProcessor);
                    sinks.raise(EventSource::Rasterizer);
                }
            })
            .map_err(|source| SimError::Spawn {
                name: "coprocessor",
                source,
            })?;

        self.jobs = Some(tx);
        self.coprocessor = Some(handle);
        Ok(())
    }

    fn spawn_display(&mut self) -> Result<(), SimError> {
        let sinks = Arc::clone(&self.sinks);
        let stats = Arc::clone(&self.stats);
        let scanout = Arc::clone(&self.scanout);
        let shutdown = Arc::clone(&self.shutdown);
        scanout
            .period_us
            .store(self.refresh_period().as_micros() as u64, Ordering::Relaxed);

        let handle = thread::Builder::new()
            .name("display".into())
            .spawn(move || {
                while !shutdown.load(Ordering::Acquire) {
                    let period = scanout.period_us.load(Ordering::Relaxed);
                    thread::sleep(Duration::from_micros(period));
                    let Ok(mut regs) = scanout.regs.lock() else {
                        log::error!("display: scan-out registers poisoned");
                        break;
                    };
                    if let Some(next) = regs.next.take() {
                        regs.current = next;
                        stats.scanouts.fetch_add(1, Ordering::Relaxed);
                    }
                    stats.refreshes.fetch_add(1, Ordering::Relaxed);
                    sinks.raise(EventSource::DisplayRefresh);
                }
            })
            .map_err(|source| SimError::Spawn {
                name: "display",
                source,
            })?;

        self.display = Some(handle);
        Ok(())
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        // Closing the job channel ends the coprocessor thread.
        self.jobs = None;
        for handle in [self.coprocessor.take(), self.display.take()]
            .into_iter()
            .flatten()
        {
            if handle.join().is_err() {
                log::error!("simulator thread panicked");
            }
        }
    }
}

impl Hardware for Simulator {
    type Error = SimError;

    fn bring_up(&mut self) -> Result<(), SimError> {
        if self.jobs.is_some() {
            return Err(SimError::AlreadyUp);
        }
        self.spawn_coprocessor()?;
        log::info!(
            "simulator up: {} us per job",
            self.config.raster_time.as_micros()
        );
        Ok(())
    }

    fn idle(&mut self, _waiting_on: EventSource) {
        thread::yield_now();
    }
}

impl EventBinder for Simulator {
    fn bind_event(&mut self, source: EventSource, sink: &'static dyn Signal) -> Result<(), SimError> {
        self.sinks.bind(source, sink);
        log::debug!("bound {source}");
        Ok(())
    }
}

impl Coprocessor for Simulator {
    fn start_task(&mut self, job: &JobDescriptor) -> Result<(), SimError> {
        if job.data().is_empty() {
            return Err(SimError::EmptyCommandList);
        }
        if self.busy.swap(true, Ordering::AcqRel) {
            self.stats.overlaps.fetch_add(1, Ordering::Relaxed);
            return Err(SimError::Overlap);
        }
        let jobs = self.jobs.as_ref().ok_or(SimError::CoprocessorStopped)?;
        jobs.send(*job).map_err(|_| SimError::CoprocessorStopped)?;
        self.stats.jobs_started.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl DataCache for Simulator {
    fn writeback(&mut self, _virt: usize, len: usize) {
        // Host memory is coherent; only account for the traffic.
        self.stats
            .writeback_bytes
            .fetch_add(len as u64, Ordering::Relaxed);
    }
}

impl DisplayController for Simulator {
    fn start_display_manager(&mut self) -> Result<(), SimError> {
        if self.display.is_none() {
            self.spawn_display()?;
        }
        Ok(())
    }

    fn set_mode(&mut self, mode: DisplayMode) -> Result<(), SimError> {
        if self.display.is_none() {
            return Err(SimError::DisplayNotStarted);
        }
        self.mode = mode;
        self.scanout
            .period_us
            .store(self.refresh_period().as_micros() as u64, Ordering::Relaxed);
        log::info!(
            "display mode {}: {}x{} @ {} Hz",
            mode.index(),
            mode.width(),
            mode.height(),
            mode.refresh_hz()
        );
        Ok(())
    }

    fn set_features(&mut self, features: DisplayFeatures) -> Result<(), SimError> {
        if self.display.is_none() {
            return Err(SimError::DisplayNotStarted);
        }
        self.features = features;
        Ok(())
    }

    fn swap_buffer(&mut self, framebuffer: PhysAddr) -> Result<(), SimError> {
        if self.display.is_none() {
            return Err(SimError::DisplayNotStarted);
        }
        let mut regs = self
            .scanout
            .regs
            .lock()
            .map_err(|_| SimError::DisplayStopped)?;
        regs.next = Some(framebuffer);
        Ok(())
    }
}

impl StorageMedia for Simulator {
    fn open_media(&mut self, kind: MediaKind) -> Option<MediaHandle> {
        // Only a cartridge is attached.
        match kind {
            MediaKind::CartridgeRom => {
                let handle = MediaHandle(self.next_media);
                self.next_media += 1;
                Some(handle)
            }
            MediaKind::DiskDrive | MediaKind::DriveRom => None,
        }
    }

    fn start_transfer_manager(&mut self, queue_depth: usize) -> Result<(), SimError> {
        log::debug!("storage transfer manager: {queue_depth} request slots");
        Ok(())
    }
}
