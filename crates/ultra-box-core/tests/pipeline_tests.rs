//! Integration tests for the frame loop against a recording mock platform.
//!
//! Covers frame index rotation, the submit/wait order of the clear and draw
//! jobs, command buffer overflow, in-flight slot protection and the
//! completion channel gate.

mod common;

use common::{leak_channels, Event, MockPlatform, TestGame, FRAMEBUFFERS};
use ultra_box_core::gfx::CommandBufferError;
use ultra_box_core::{
    boot, ChannelBank, ContextId, Dispatcher, FramePipeline, Gate, JobTemplate, PipelineConfig,
    PipelineError, Priority, SchedulerError, SlotInFlight, SlotIndex, SlotState, Violation,
    WaitPolicy,
};
use ultra_box_hal::{EventBinder, EventSource, JobDescriptor, PhysRegion, Signal};

type Pipeline = FramePipeline<MockPlatform, TestGame>;

fn start_with(
    game: TestGame,
    config: PipelineConfig,
) -> (MockPlatform, Pipeline, &'static ChannelBank) {
    let platform = MockPlatform::new();
    let channels = leak_channels();
    let pipeline = boot(platform.clone(), game, channels, config)
        .unwrap()
        .run()
        .unwrap();
    platform.clear_events();
    (platform, pipeline, channels)
}

fn start() -> (MockPlatform, Pipeline, &'static ChannelBank) {
    start_with(TestGame::new(), PipelineConfig::default())
}

/// Coarse shape of one event, ignoring addresses.
fn shape(event: &Event) -> &'static str {
    match event {
        Event::StartTask(_) => "submit",
        Event::Wait(EventSource::Rasterizer) => "wait-raster",
        Event::Wait(EventSource::DisplayRefresh) => "wait-refresh",
        Event::Swap(_) => "swap",
        _ => "other",
    }
}

fn shapes(events: &[Event]) -> Vec<&'static str> {
    events.iter().map(shape).collect()
}

// ============================================================================
// Frame sequencing
// ============================================================================

mod sequencing_tests {
    use super::*;

    #[test]
    fn frame_index_alternates_between_slots() {
        let (_platform, mut pipeline, _) = start();
        let slots: Vec<SlotIndex> = (0..4)
            .map(|_| pipeline.run_frame().unwrap().slot)
            .collect();
        assert_eq!(
            slots,
            vec![SlotIndex::ZERO, SlotIndex::ONE, SlotIndex::ZERO, SlotIndex::ONE]
        );
        assert_eq!(pipeline.frame(), 4);
        assert_eq!(pipeline.presenter().presented(), 4);
    }

    #[test]
    fn initial_slot_is_configurable() {
        let config = PipelineConfig {
            initial_slot: SlotIndex::ONE,
            ..PipelineConfig::default()
        };
        let (platform, mut pipeline, _) = start_with(TestGame::new(), config);

        assert_eq!(pipeline.run_frame().unwrap().slot, SlotIndex::ONE);
        // Primed with the other slot's framebuffer first.
        assert_eq!(platform.timeline()[0], Event::Swap(FRAMEBUFFERS[0]));
    }

    #[test]
    fn three_frames_submit_clear_then_draw_each_frame() {
        let (platform, mut pipeline, _) = start();
        let presented: Vec<SlotIndex> = (0..3)
            .map(|_| pipeline.run_frame().unwrap().slot)
            .collect();
        assert_eq!(presented, vec![SlotIndex::ZERO, SlotIndex::ONE, SlotIndex::ZERO]);

        let timeline = platform.timeline();
        let per_frame = [
            "submit",
            "wait-raster",
            "submit",
            "wait-raster",
            "swap",
            "wait-refresh",
        ];
        let mut expected = vec!["swap"];
        for _ in 0..3 {
            expected.extend_from_slice(&per_frame);
        }
        assert_eq!(shapes(&timeline), expected);

        let swaps: Vec<&Event> = timeline
            .iter()
            .filter(|e| matches!(e, Event::Swap(_)))
            .collect();
        assert_eq!(
            swaps,
            vec![
                &Event::Swap(FRAMEBUFFERS[1]),
                &Event::Swap(FRAMEBUFFERS[0]),
                &Event::Swap(FRAMEBUFFERS[1]),
                &Event::Swap(FRAMEBUFFERS[0]),
            ]
        );
    }

    #[test]
    fn hooks_run_in_frame_order() {
        use common::Hook;

        let game = TestGame::new();
        let hooks = game.hooks.clone();
        let (_platform, mut pipeline, _) = start_with(game, PipelineConfig::default());
        hooks.borrow_mut().clear();

        pipeline.run_frame().unwrap();
        assert_eq!(
            *hooks.borrow(),
            vec![
                Hook::NewFrame(SlotIndex::ZERO),
                Hook::Update(SlotIndex::ZERO),
                Hook::Render(SlotIndex::ZERO),
            ]
        );
    }
}

// ============================================================================
// Job dispatch
// ============================================================================

mod dispatch_tests {
    use super::*;

    #[test]
    fn draw_is_submitted_only_after_clear_completes() {
        let (platform, mut pipeline, _) = start();
        for _ in 0..5 {
            pipeline.run_frame().unwrap();
        }

        // Every submit is followed by exactly one rasterizer wait before the
        // next submit.
        let raster: Vec<&str> = shapes(&platform.timeline())
            .into_iter()
            .filter(|s| *s == "submit" || *s == "wait-raster")
            .collect();
        assert_eq!(raster.len(), 20);
        for pair in raster.chunks(2) {
            assert_eq!(pair, ["submit", "wait-raster"]);
        }
    }

    #[test]
    fn jobs_carry_the_closed_lists() {
        let (platform, mut pipeline, _) = start();
        pipeline.run_frame().unwrap();

        let slot = pipeline.slots().slot(SlotIndex::ZERO);
        let clear = slot.clear_job().data();
        let draw = slot.draw_job().data();
        assert_eq!(clear.size as usize, slot.clear_buffer().byte_len());
        assert_eq!(draw.size as usize, slot.draw_buffer().byte_len());
        // 3 setup words + full sync + end of list.
        assert_eq!(slot.clear_buffer().len(), 5);
        assert!(slot.clear_buffer().is_closed());

        let tasks: Vec<Event> = platform
            .events()
            .into_iter()
            .filter(|e| matches!(e, Event::StartTask(_)))
            .collect();
        assert_eq!(tasks, vec![Event::StartTask(clear), Event::StartTask(draw)]);
    }

    #[test]
    fn lists_are_written_back_before_submit() {
        let (platform, mut pipeline, _) = start();
        pipeline.run_frame().unwrap();

        let slot = pipeline.slots().slot(SlotIndex::ZERO);
        let clear_wb = Event::Writeback {
            addr: slot.clear_buffer().head_addr(),
            len: slot.clear_buffer().byte_len(),
        };
        let events = platform.events();
        let wb = events.iter().position(|e| *e == clear_wb).unwrap();
        let submit = events
            .iter()
            .position(|e| matches!(e, Event::StartTask(_)))
            .unwrap();
        assert!(wb < submit);
    }

    #[test]
    fn wait_without_submit_is_a_protocol_violation() {
        let mut platform = MockPlatform::new();
        let channels = leak_channels();
        let mut dispatcher = Dispatcher::new(JobTemplate::default(), WaitPolicy::Forever);

        let result = dispatcher.wait(&mut platform, channels);
        assert!(matches!(
            result,
            Err(PipelineError::ProtocolViolation {
                source: EventSource::Rasterizer,
                violation: Violation::WaitWithoutSubmit,
            })
        ));
        assert!(platform.events().is_empty());
    }

    #[test]
    fn second_submit_before_wait_is_a_protocol_violation() {
        let mut platform = MockPlatform::new();
        let channels = leak_channels();
        platform
            .bind_event(EventSource::Rasterizer, channels.get(EventSource::Rasterizer))
            .unwrap();
        let mut dispatcher = Dispatcher::new(JobTemplate::default(), WaitPolicy::Forever);
        let job = JobTemplate::default().bind(PhysRegion::new(0x2000, 16));

        dispatcher.submit(&mut platform, channels, &job).unwrap();
        assert_eq!(dispatcher.gate(), Gate::Outstanding);

        let result = dispatcher.submit(&mut platform, channels, &job);
        assert!(matches!(
            result,
            Err(PipelineError::ProtocolViolation {
                violation: Violation::SubmitWhileOutstanding,
                ..
            })
        ));
        assert_eq!(platform.started_tasks(), 1);

        dispatcher.wait(&mut platform, channels).unwrap();
        assert_eq!(dispatcher.gate(), Gate::Idle);
        dispatcher.submit(&mut platform, channels, &job).unwrap();
        assert_eq!(dispatcher.submitted(), 2);
    }

    #[test]
    fn stale_rasterizer_signal_is_not_attributed_to_the_next_job() {
        let (platform, mut pipeline, channels) = start();
        channels.get(EventSource::Rasterizer).signal();

        let result = pipeline.run_frame();
        assert!(matches!(
            result,
            Err(PipelineError::StaleSignal(EventSource::Rasterizer))
        ));
        assert_eq!(platform.started_tasks(), 0);
    }

    #[test]
    fn watchdog_turns_a_lost_completion_into_a_stall() {
        let config = PipelineConfig {
            wait_policy: WaitPolicy::Watchdog { max_polls: 8 },
            ..PipelineConfig::default()
        };
        let (platform, mut pipeline, _) = start_with(TestGame::new(), config);
        pipeline.platform_mut().complete_tasks = false;

        let result = pipeline.run_frame();
        assert!(matches!(
            result,
            Err(PipelineError::Stalled {
                source: EventSource::Rasterizer,
                polls: 8,
            })
        ));
        assert_eq!(platform.started_tasks(), 1);
    }

    #[test]
    fn failed_frame_halts_the_pipeline_before_touching_slots() {
        let config = PipelineConfig {
            wait_policy: WaitPolicy::Watchdog { max_polls: 8 },
            ..PipelineConfig::default()
        };
        let game = TestGame::new();
        let hooks = game.hooks.clone();
        let (platform, mut pipeline, _) = start_with(game, config);
        pipeline.platform_mut().complete_tasks = false;

        assert!(matches!(
            pipeline.run_frame(),
            Err(PipelineError::Stalled { .. })
        ));
        assert!(pipeline.is_faulted());
        assert_eq!(pipeline.dispatcher().gate(), Gate::Outstanding);
        let hooks_after_stall = hooks.borrow().len();
        let clear_after_stall = pipeline
            .slots()
            .slot(SlotIndex::ZERO)
            .clear_buffer()
            .words()
            .to_vec();

        // The clear job is still on the coprocessor.
        assert!(matches!(pipeline.run_frame(), Err(PipelineError::Faulted)));
        assert_eq!(hooks.borrow().len(), hooks_after_stall);
        assert_eq!(
            pipeline.slots().slot(SlotIndex::ZERO).clear_buffer().words(),
            &clear_after_stall[..]
        );
        assert!(pipeline.slots().slot(SlotIndex::ZERO).clear_buffer().is_closed());
        assert_eq!(platform.started_tasks(), 1);
        assert_eq!(platform.running(), 1);
    }

    #[test]
    fn overflow_also_halts_the_pipeline() {
        let mut game = TestGame::new();
        game.clear_padding = 20;
        let (platform, mut pipeline, _) = start_with(game, PipelineConfig::default());
        assert!(!pipeline.is_faulted());

        assert!(matches!(
            pipeline.run_frame(),
            Err(PipelineError::CommandBuffer(_))
        ));
        assert!(matches!(pipeline.run_frame(), Err(PipelineError::Faulted)));
        assert_eq!(pipeline.frame(), 0);
        assert_eq!(platform.started_tasks(), 0);
    }

    #[test]
    fn signal_processor_channel_only_counts_jobs() {
        let (_platform, mut pipeline, channels) = start();
        for _ in 0..3 {
            pipeline.run_frame().unwrap();
        }

        let signal_processor = channels.get(EventSource::SignalProcessor);
        assert_eq!(signal_processor.delivered(), 6);
        assert_eq!(signal_processor.coalesced(), 5);
        assert_eq!(channels.get(EventSource::Rasterizer).coalesced(), 0);
    }

    #[test]
    fn descriptor_template_survives_binding() {
        let template = JobTemplate {
            dram_stack: PhysRegion::new(0x0040_0000, 0x400),
            ..JobTemplate::default()
        };
        let job: JobDescriptor = template.bind(PhysRegion::new(0x0050_0000, 40));
        assert_eq!(job.dram_stack_size, 0x400);
        assert_eq!(job.data_ptr, 0x0050_0000);
    }
}

// ============================================================================
// Buffers and slots
// ============================================================================

mod slot_tests {
    use super::*;

    #[test]
    fn clear_overflow_is_an_error_and_submits_nothing() {
        let mut game = TestGame::new();
        game.clear_padding = 20;
        let (platform, mut pipeline, _) = start_with(game, PipelineConfig::default());

        let result = pipeline.run_frame();
        assert!(matches!(
            result,
            Err(PipelineError::CommandBuffer(CommandBufferError::Overflow {
                capacity: 16
            }))
        ));
        assert_eq!(platform.started_tasks(), 0);
        // The failed append left the cursor at capacity.
        let clear = pipeline.slots().slot(SlotIndex::ZERO).clear_buffer();
        assert_eq!(clear.len(), 16);
        assert!(clear.is_open());
    }

    #[test]
    fn end_marker_needs_room_of_its_own() {
        // 3 setup + 12 padding + full sync fills all 16 words.
        let mut game = TestGame::new();
        game.clear_padding = 12;
        let (platform, mut pipeline, _) = start_with(game, PipelineConfig::default());

        let result = pipeline.run_frame();
        assert!(matches!(
            result,
            Err(PipelineError::CommandBuffer(CommandBufferError::Overflow { .. }))
        ));
        assert_eq!(platform.started_tasks(), 0);
    }

    #[test]
    fn presented_slot_stays_in_flight_until_rotated_past() {
        let (_platform, mut pipeline, _) = start();

        pipeline.run_frame().unwrap();
        assert_eq!(
            pipeline.slots().slot(SlotIndex::ZERO).state(),
            SlotState::InFlight
        );
        assert_eq!(
            pipeline.slots_mut().slot_mut(SlotIndex::ZERO).err(),
            Some(SlotInFlight(SlotIndex::ZERO))
        );
        assert!(pipeline.slots_mut().slot_mut(SlotIndex::ONE).is_ok());

        pipeline.run_frame().unwrap();
        assert_eq!(pipeline.slots().slot(SlotIndex::ZERO).state(), SlotState::Idle);
        assert!(pipeline.slots_mut().slot_mut(SlotIndex::ZERO).is_ok());
        assert_eq!(
            pipeline.slots_mut().slot_mut(SlotIndex::ONE).err(),
            Some(SlotInFlight(SlotIndex::ONE))
        );
    }

    #[test]
    fn update_writes_land_in_the_current_slot_only() {
        let (_platform, mut pipeline, _) = start();
        pipeline.run_frame().unwrap();
        pipeline.run_frame().unwrap();

        // Frame 0 wrote slot 0, frame 1 wrote slot 1.
        assert_eq!(pipeline.slots().slot(SlotIndex::ZERO).objects()[0].ob[0], 0);
        assert_eq!(pipeline.slots().slot(SlotIndex::ONE).objects()[0].ob[0], 1);
    }

    #[test]
    fn stale_refresh_is_discarded_before_presenting() {
        let (platform, mut pipeline, channels) = start();
        channels.get(EventSource::DisplayRefresh).signal();

        pipeline.run_frame().unwrap();
        assert_eq!(pipeline.presenter().stale_refreshes(), 1);
        // The refresh wait still blocked for a fresh retrace.
        assert!(platform
            .timeline()
            .contains(&Event::Wait(EventSource::DisplayRefresh)));
    }
}

// ============================================================================
// Scheduling
// ============================================================================

mod scheduling_tests {
    use super::*;

    #[test]
    fn bring_up_priority_is_never_raised_again() {
        let (_platform, mut pipeline, _) = start();
        pipeline.run_frame().unwrap();

        let sched = pipeline.scheduler_mut();
        assert_eq!(sched.priority(ContextId::BringUp), Some(Priority::MIN));
        assert_eq!(
            sched.set_priority(ContextId::BringUp, Priority::BRING_UP),
            Err(SchedulerError::Reelevation {
                from: Priority::MIN,
                to: Priority::BRING_UP,
            })
        );
        assert_eq!(sched.running(), ContextId::FrameLoop);
    }

    #[test]
    fn frame_loop_cannot_be_dropped_under_bring_up() {
        let (_platform, mut pipeline, _) = start();

        let sched = pipeline.scheduler_mut();
        assert_eq!(
            sched.set_priority(ContextId::FrameLoop, Priority::MIN),
            Err(SchedulerError::FrameLoopNotAbove {
                bring_up: Priority::MIN,
                frame_loop: Priority::MIN,
            })
        );
        assert_eq!(sched.running(), ContextId::FrameLoop);
        pipeline.run_frame().unwrap();
    }
}
