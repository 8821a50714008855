use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use crate::error::EcsError;
use crate::world::World;

/// What a system returns for one tick.
pub type SystemResult = anyhow::Result<()>;

/// A system that operates on the world each tick, given the fixed step size in seconds.
pub trait System: Send + Sync {
    fn run(&mut self, world: &mut World, dt: f64) -> SystemResult;

    /// Name used when reporting failures.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Blanket implementation so closures can be used as systems.
impl<F: FnMut(&mut World, f64) -> SystemResult + Send + Sync> System for F {
    fn run(&mut self, world: &mut World, dt: f64) -> SystemResult {
        (self)(world, dt)
    }
}

/// Handle to a registered system, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemId(u64);

/// How the scheduler reacts when a system fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Report the failure and keep running the remaining systems.
    #[default]
    Continue,
    /// Report the failure, skip the remaining systems and return an error.
    Abort,
}

/// A system that returned an error or panicked during a tick.
#[derive(Debug, Clone)]
pub struct SystemFailure {
    pub system: String,
    pub message: String,
    pub panicked: bool,
}

/// Receives every [`SystemFailure`]. The default sink logs at error level.
pub type ErrorSink = Box<dyn FnMut(&SystemFailure) + Send + Sync>;

fn log_failure(failure: &SystemFailure) {
    error!(
        system = %failure.system,
        panicked = failure.panicked,
        "system failed: {}",
        failure.message
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

struct Entry {
    id: SystemId,
    name: String,
    system: Box<dyn System>,
}

/// An ordered list of systems run on every tick.
///
/// Systems run strictly in registration order; there is no dependency
/// resolution between them.
pub struct Scheduler {
    systems: Vec<Entry>,
    enabled: bool,
    next_id: u64,
    policy: FailurePolicy,
    sink: ErrorSink,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            enabled: true,
            next_id: 0,
            policy: FailurePolicy::default(),
            sink: Box::new(log_failure),
        }
    }

    /// Add a system to the end of the schedule.
    pub fn add_system<S: System + 'static>(&mut self, system: S) -> SystemId {
        let name = system.name().to_string();
        self.push(name, Box::new(system))
    }

    /// Add a system under an explicit name, which is used in failure reports.
    pub fn add_named_system<S: System + 'static>(
        &mut self,
        name: impl Into<String>,
        system: S,
    ) -> SystemId {
        self.push(name.into(), Box::new(system))
    }

    fn push(&mut self, name: String, system: Box<dyn System>) -> SystemId {
        let id = SystemId(self.next_id);
        self.next_id += 1;
        self.systems.push(Entry { id, name, system });
        id
    }

    /// Remove a previously added system. Returns `true` if it was registered.
    pub fn remove_system(&mut self, id: SystemId) -> bool {
        let Some(pos) = self.systems.iter().position(|entry| entry.id == id) else {
            return false;
        };
        self.systems.remove(pos);
        true
    }

    /// Remove every system.
    pub fn clear_systems(&mut self) {
        self.systems.clear();
    }

    /// Run all systems in order on the given world. Does nothing while disabled.
    ///
    /// A system that returns an error or panics is reported to the error sink.
    /// Under [`FailurePolicy::Continue`] the remaining systems still run and
    /// this returns `Ok`; under [`FailurePolicy::Abort`] the tick stops there.
    pub fn run_systems(&mut self, world: &mut World, dt: f64) -> Result<(), EcsError> {
        if !self.enabled {
            return Ok(());
        }

        for entry in &mut self.systems {
            let system = &mut entry.system;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| system.run(world, dt)));

            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => SystemFailure {
                    system: entry.name.clone(),
                    message: format!("{err:#}"),
                    panicked: false,
                },
                Err(payload) => SystemFailure {
                    system: entry.name.clone(),
                    message: panic_message(&*payload),
                    panicked: true,
                },
            };

            (self.sink)(&failure);
            if self.policy == FailurePolicy::Abort {
                return Err(EcsError::SystemFailed(failure));
            }
        }
        Ok(())
    }

    /// Replace the sink that receives system failures.
    pub fn set_error_sink(&mut self, sink: impl FnMut(&SystemFailure) + Send + Sync + 'static) {
        self.sink = Box::new(sink);
    }

    pub fn set_failure_policy(&mut self, policy: FailurePolicy) {
        self.policy = policy;
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Names of the registered systems, in run order.
    pub fn system_names(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(|entry| entry.name.as_str())
    }

    /// Number of systems in the schedule.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::component::ComponentType;

    fn logging_system(log: &Arc<Mutex<Vec<u32>>>, marker: u32) -> impl System {
        let log = log.clone();
        move |_: &mut World, _: f64| -> SystemResult {
            log.lock().push(marker);
            Ok(())
        }
    }

    #[test]
    fn closure_system() {
        let counter = ComponentType::<u32>::new("Counter");
        let mut world = World::new();
        let e = world.spawn();
        world.add(counter, e, 0).unwrap();

        let mut system = move |w: &mut World, _dt: f64| -> SystemResult {
            *w.get_mut(counter, e).unwrap() += 1;
            Ok(())
        };
        system.run(&mut world, 1.0 / 60.0).unwrap();
        assert_eq!(world.get(counter, e), Some(&1));
    }

    #[test]
    fn systems_receive_dt() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::new();
        let sink = seen.clone();
        scheduler.add_system(move |_: &mut World, dt: f64| -> SystemResult {
            sink.lock().push(dt);
            Ok(())
        });

        scheduler.run_systems(&mut World::new(), 0.25).unwrap();
        assert_eq!(*seen.lock(), vec![0.25]);
    }

    #[test]
    fn schedule_ordering_across_ticks() {
        let mut world = World::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut scheduler = Scheduler::new();
        scheduler.add_system(logging_system(&log, 1));
        scheduler.add_system(logging_system(&log, 2));
        scheduler.add_system(logging_system(&log, 3));

        for _ in 0..3 {
            scheduler.run_systems(&mut world, 1.0 / 60.0).unwrap();
        }
        assert_eq!(*log.lock(), vec![1, 2, 3, 1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn remove_system_by_id() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::new();
        let first = scheduler.add_system(logging_system(&log, 1));
        let second = scheduler.add_system(logging_system(&log, 2));
        scheduler.add_system(logging_system(&log, 3));

        assert!(scheduler.remove_system(second));
        assert!(!scheduler.remove_system(second));
        assert_eq!(scheduler.len(), 2);

        scheduler.run_systems(&mut World::new(), 0.1).unwrap();
        assert_eq!(*log.lock(), vec![1, 3]);

        assert!(scheduler.remove_system(first));
        scheduler.clear_systems();
        assert!(scheduler.is_empty());
    }

    #[test]
    fn disabled_scheduler_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::new();
        scheduler.add_system(logging_system(&log, 1));

        scheduler.set_enabled(false);
        assert!(!scheduler.is_enabled());
        scheduler.run_systems(&mut World::new(), 0.1).unwrap();
        assert!(log.lock().is_empty());

        scheduler.set_enabled(true);
        scheduler.run_systems(&mut World::new(), 0.1).unwrap();
        assert_eq!(*log.lock(), vec![1]);
    }

    #[test]
    fn failing_system_is_reported_and_others_continue() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failures = Arc::new(Mutex::new(Vec::<SystemFailure>::new()));

        let mut scheduler = Scheduler::new();
        let reported = failures.clone();
        scheduler.set_error_sink(move |failure| reported.lock().push(failure.clone()));
        scheduler.add_system(logging_system(&log, 1));
        scheduler.add_named_system("broken", |_: &mut World, _: f64| -> SystemResult {
            anyhow::bail!("sprite sheet missing")
        });
        scheduler.add_system(logging_system(&log, 3));

        scheduler.run_systems(&mut World::new(), 0.1).unwrap();

        assert_eq!(*log.lock(), vec![1, 3]);
        let failures = failures.lock();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].system, "broken");
        assert_eq!(failures[0].message, "sprite sheet missing");
        assert!(!failures[0].panicked);
    }

    #[test]
    fn panicking_system_is_caught() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failures = Arc::new(Mutex::new(Vec::<SystemFailure>::new()));

        let mut scheduler = Scheduler::new();
        let reported = failures.clone();
        scheduler.set_error_sink(move |failure| reported.lock().push(failure.clone()));
        scheduler.add_named_system("panics", |_: &mut World, _: f64| -> SystemResult {
            panic!("index out of range")
        });
        scheduler.add_system(logging_system(&log, 2));

        scheduler.run_systems(&mut World::new(), 0.1).unwrap();

        assert_eq!(*log.lock(), vec![2]);
        let failures = failures.lock();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].panicked);
        assert_eq!(failures[0].message, "index out of range");
    }

    #[test]
    fn abort_policy_stops_the_tick() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::new();
        scheduler.set_error_sink(|_| {});
        scheduler.set_failure_policy(FailurePolicy::Abort);
        scheduler.add_named_system("broken", |_: &mut World, _: f64| -> SystemResult {
            anyhow::bail!("boom")
        });
        scheduler.add_system(logging_system(&log, 2));

        let err = scheduler.run_systems(&mut World::new(), 0.1).unwrap_err();
        assert!(matches!(err, EcsError::SystemFailed(ref f) if f.system == "broken"));
        assert_eq!(err.to_string(), "system 'broken' failed: boom");
        assert!(log.lock().is_empty());
    }

    #[test]
    fn default_names_come_from_type() {
        let mut scheduler = Scheduler::new();
        scheduler.add_system(|_: &mut World, _: f64| -> SystemResult { Ok(()) });
        scheduler.add_named_system("movement", |_: &mut World, _: f64| -> SystemResult {
            Ok(())
        });
        let names: Vec<_> = scheduler.system_names().collect();
        assert!(names[0].contains("closure"));
        assert_eq!(names[1], "movement");
    }
}
