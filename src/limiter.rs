use super::*;

/// CPU-time and wall-clock thresholds for the watchdog, in microseconds.
///
/// `None` disables an axis. Crossing a `high` threshold raises `SIGXCPU`
/// (which the application may catch); crossing a `max` threshold raises
/// `SIGKILL`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Deadlines {
  pub cpu_high: Option<u64>,
  pub cpu_max: Option<u64>,
  pub wall_high: Option<u64>,
  pub wall_max: Option<u64>,
}

impl Deadlines {
  /// Whether any threshold is set and a limiter process is needed at all.
  pub fn any(&self) -> bool {
    self.cpu_high.is_some()
      || self.cpu_max.is_some()
      || self.wall_high.is_some()
      || self.wall_max.is_some()
  }

  /// The `SIGXCPU` phase, when at least one soft threshold is set.
  ///
  /// An axis without a soft threshold falls back to its hard value, so this
  /// phase never outlasts the kill phase.
  fn soft(&self) -> Option<Phase> {
    if self.cpu_high.is_none() && self.wall_high.is_none() {
      return None;
    }

    Phase::new(
      self.cpu_high.or(self.cpu_max),
      self.wall_high.or(self.wall_max),
      Signal::SIGXCPU,
    )
  }

  /// The `SIGKILL` phase, when at least one hard threshold is set.
  fn hard(&self) -> Option<Phase> {
    Phase::new(self.cpu_max, self.wall_max, Signal::SIGKILL)
  }
}

/// One escalation stage: thresholds to watch and the signal to send when
/// either is crossed. At least one threshold is always set.
#[derive(Debug, Clone, Copy)]
struct Phase {
  cpu: Option<u64>,
  signal: Signal,
  wall: Option<u64>,
}

impl Phase {
  fn new(cpu: Option<u64>, wall: Option<u64>, signal: Signal) -> Option<Self> {
    if cpu.is_none() && wall.is_none() {
      None
    } else {
      Some(Self { cpu, signal, wall })
    }
  }

  fn crossed(&self, cpu_usecs: u64, elapsed_usecs: u64) -> bool {
    self.cpu.is_some_and(|limit| cpu_usecs >= limit)
      || self.wall.is_some_and(|limit| elapsed_usecs >= limit)
  }

  /// Sleep just long enough for the nearest threshold to become reachable,
  /// so the loop wakes once per boundary instead of polling on a fixed
  /// interval.
  fn next_wait(&self, cpu_usecs: u64, elapsed_usecs: u64) -> Duration {
    let cpu = self.cpu.map(|limit| limit.saturating_sub(cpu_usecs));
    let wall = self.wall.map(|limit| limit.saturating_sub(elapsed_usecs));

    let usecs = match (cpu, wall) {
      (Some(cpu), Some(wall)) => cpu.min(wall),
      (Some(cpu), None) => cpu,
      (None, Some(wall)) => wall,
      (None, None) => 0,
    };

    Duration::from_micros(usecs)
  }
}

/// Watch the target until it exhausts its budgets or exits.
///
/// Runs in the limiter child. `started` is the baseline the supervisor
/// recorded immediately after forking the bwrap child, so elapsed time
/// starts at zero from the target's point of view.
pub fn run(deadlines: &Deadlines, cgroup: &Cgroup, target: Pid, started: Instant) {
  for phase in [deadlines.soft(), deadlines.hard()].into_iter().flatten() {
    match watch(&phase, cgroup, started) {
      Watch::Crossed => {
        debug!(signal = ?phase.signal, %target, "deadline crossed");

        // ESRCH just means the target beat us to the exit.
        let _ = kill(target, phase.signal);
      }
      Watch::Gone => return,
    }
  }
}

enum Watch {
  Crossed,
  Gone,
}

fn watch(phase: &Phase, cgroup: &Cgroup, started: Instant) -> Watch {
  loop {
    let elapsed = started.elapsed().as_micros() as u64;

    let Some(cpu) = cgroup.cpu_usage_usecs() else {
      return Watch::Gone;
    };

    if phase.crossed(cpu, elapsed) {
      return Watch::Crossed;
    }

    thread::sleep(phase.next_wait(cpu, elapsed));
  }
}
