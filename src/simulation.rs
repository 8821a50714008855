//! Drives a [`GameLoop`] from a simulated display clock.

use anyhow::Context;
use minigame_ecs::{EntityId, Scheduler, World};
use minigame_loop::{GameLoop, Visibility};
use tracing::{debug, info, warn};

use crate::demo::{self, BallSpawner, BallTypes, Recycler};
use crate::host::SimulatedDisplay;
use crate::settings::DemoSettings;

/// What happened during a headless run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Display frames delivered to the loop
    pub frames: u64,
    /// Frame requests the loop made, including cancelled ones
    pub frames_requested: u64,
    /// Simulation ticks executed
    pub ticks: u64,
    /// Last FPS estimate reported by the loop
    pub fps: f64,
    /// Balls alive at the end
    pub live_balls: usize,
    /// Next entity id the world would hand out
    pub next_entity: EntityId,
}

/// Run the bouncing-ball demo for the configured display duration.
///
/// The display is hidden for part of the run if configured; hidden displays
/// deliver no frames, and the loop is resumed when the display comes back.
pub fn run(settings: &DemoSettings) -> anyhow::Result<RunReport> {
    settings
        .display
        .validate()
        .context("Invalid display settings")?;

    let types = BallTypes::define();
    let mut world = World::new();
    let mut spawner = BallSpawner::new(types, settings.arena.clone());
    for _ in 0..settings.arena.balls {
        spawner.spawn(&mut world)?;
    }

    let mut scheduler = Scheduler::new();
    scheduler.add_named_system("movement", demo::movement(types));
    scheduler.add_named_system("bounce", demo::bounce(types, &settings.arena));
    scheduler.add_system(Recycler::new(types, spawner));

    let display = SimulatedDisplay::new();
    let mut game = GameLoop::builder(world, scheduler, display.clone())
        .config(settings.timing)
        .visibility(display.clone())
        .on_tick(|tick| {
            if tick % 600 == 0 {
                debug!(tick, "simulation progress");
            }
        })
        .build()?;

    let interval = settings.display.frame_interval_ms();
    let total_frames = (settings.display.duration_secs * 1000.0 / interval).round() as u64;
    let hidden_window = settings.display.hide_at_secs.map(|at| {
        let from = at * 1000.0;
        (from, from + settings.display.hidden_for_secs * 1000.0)
    });

    game.start();
    let mut hidden = false;
    let mut frames = 0u64;
    for frame in 0..total_frames {
        let now = frame as f64 * interval;

        let hidden_now = hidden_window.is_some_and(|(from, to)| now >= from && now < to);
        if hidden_now != hidden {
            hidden = hidden_now;
            if hidden {
                info!(at_ms = now, "display hidden");
                game.visibility_changed(Visibility::Hidden);
            } else {
                info!(at_ms = now, "display visible again");
                game.visibility_changed(Visibility::Visible);
                game.resume();
            }
        }

        if let Some(handle) = display.take_frame() {
            game.frame(handle, now)?;
            frames += 1;
        }
    }

    let report = RunReport {
        frames,
        frames_requested: display.frames_requested(),
        ticks: game.current_tick(),
        fps: game.fps(),
        live_balls: game.world().entity_count(),
        next_entity: game.world().next_entity_id(),
    };
    game.stop();
    if display.has_watcher() {
        warn!("visibility watcher still registered after stop");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{ArenaSettings, DisplaySettings};

    fn settings(hide_at_secs: Option<f64>) -> DemoSettings {
        DemoSettings {
            display: DisplaySettings {
                refresh_rate: 120.0,
                duration_secs: 2.0,
                hide_at_secs,
                hidden_for_secs: 1.0,
            },
            arena: ArenaSettings {
                balls: 8,
                ball_lifetime_secs: 0.3,
                ..ArenaSettings::default()
            },
            ..DemoSettings::default()
        }
    }

    #[test]
    fn steady_display_runs_sixty_ticks_per_second() {
        let report = run(&settings(None)).unwrap();

        assert_eq!(report.frames, 240);
        // The last request is still pending when the run ends.
        assert_eq!(report.frames_requested, 241);
        assert!((119..=121).contains(&report.ticks), "ticks = {}", report.ticks);
        assert!((report.fps - 120.0).abs() < 1.0, "fps = {}", report.fps);
        assert_eq!(report.live_balls, 8);
        // Short lifetimes mean balls were recycled with fresh ids.
        assert!(report.next_entity.raw() > 8);
    }

    #[test]
    fn hidden_display_does_not_catch_up() {
        let report = run(&settings(Some(0.5))).unwrap();

        // One second of the two was hidden: no frames, and no burst afterwards.
        assert!(report.frames < 130, "frames = {}", report.frames);
        assert!((58..=62).contains(&report.ticks), "ticks = {}", report.ticks);
        assert_eq!(report.live_balls, 8);
    }

    #[test]
    fn invalid_timing_fails_to_build() {
        let mut settings = settings(None);
        settings.timing.max_accumulator = 0.0;
        assert!(run(&settings).is_err());
    }

    #[test]
    fn invalid_display_fails_instead_of_running_zero_frames() {
        let mut zero_rate = settings(None);
        zero_rate.display.refresh_rate = 0.0;
        assert!(run(&zero_rate).is_err());

        let mut negative = settings(None);
        negative.display.duration_secs = -2.0;
        let err = run(&negative).unwrap_err();
        assert!(format!("{err:#}").contains("duration"));
    }
}
