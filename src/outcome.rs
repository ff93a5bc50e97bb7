use super::*;

/// How the bwrap child left `waitpid`, and how that maps onto the
/// supervisor's own exit status and summary line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitOutcome {
  /// Normal exit with the given code.
  Exited(i32),
  /// `waitpid` itself failed; reported as status 130.
  Interrupted,
  /// Terminated by a signal.
  Killed(Signal),
  /// Stopped by a signal, observed via `WUNTRACED`.
  Stopped(Signal),
}

impl From<WaitStatus> for WaitOutcome {
  fn from(status: WaitStatus) -> Self {
    match status {
      WaitStatus::Exited(_, code) => Self::Exited(code),
      WaitStatus::Signaled(_, signal, _) => Self::Killed(signal),
      WaitStatus::Stopped(_, signal) => Self::Stopped(signal),
      _ => Self::Interrupted,
    }
  }
}

impl WaitOutcome {
  pub fn reason(&self) -> &'static str {
    match self {
      Self::Exited(_) => "exited",
      Self::Interrupted => "interrupted",
      Self::Killed(_) => "killed",
      Self::Stopped(_) => "stopped",
    }
  }

  /// Exit status the supervisor forwards: the child's own code, the signal
  /// number, or 130 for an interrupted wait.
  pub fn status(&self) -> i32 {
    match self {
      Self::Exited(code) => *code,
      Self::Interrupted => 130,
      Self::Killed(signal) | Self::Stopped(signal) => *signal as i32,
    }
  }

  /// Whether the CPU/wall watchdog's soft signal ended the child.
  pub fn time_exceeded(&self) -> bool {
    matches!(self, Self::Killed(Signal::SIGXCPU))
  }

  /// The one-line account printed to stderr after the child is reaped.
  pub fn summary(&self, elapsed_usecs: u64, cpu_usecs: u64) -> String {
    if self.time_exceeded() {
      format!(
        "[bwrapbox] application time exceeded after {elapsed_usecs} real usecs and {cpu_usecs} CPU usecs"
      )
    } else {
      format!(
        "[bwrapbox] application {} with status {} after {elapsed_usecs} real usecs and {cpu_usecs} CPU usecs",
        self.reason(),
        self.status(),
      )
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_mapping() {
    assert_eq!(WaitOutcome::Exited(7).status(), 7);
    assert_eq!(WaitOutcome::Killed(Signal::SIGKILL).status(), 9);
    assert_eq!(WaitOutcome::Stopped(Signal::SIGSTOP).status(), 19);
    assert_eq!(WaitOutcome::Interrupted.status(), 130);
  }

  #[test]
  fn wait_status_conversion() {
    let pid = Pid::from_raw(42);

    assert_eq!(
      WaitOutcome::from(WaitStatus::Exited(pid, 0)),
      WaitOutcome::Exited(0)
    );
    assert_eq!(
      WaitOutcome::from(WaitStatus::Signaled(pid, Signal::SIGKILL, false)),
      WaitOutcome::Killed(Signal::SIGKILL)
    );
    assert_eq!(
      WaitOutcome::from(WaitStatus::Stopped(pid, Signal::SIGTSTP)),
      WaitOutcome::Stopped(Signal::SIGTSTP)
    );
  }

  #[test]
  fn summary_for_normal_exit() {
    assert_eq!(
      WaitOutcome::Exited(7).summary(1500, 900),
      "[bwrapbox] application exited with status 7 after 1500 real usecs and 900 CPU usecs"
    );
  }

  #[test]
  fn summary_for_kill() {
    assert_eq!(
      WaitOutcome::Killed(Signal::SIGKILL).summary(100000, 42),
      "[bwrapbox] application killed with status 9 after 100000 real usecs and 42 CPU usecs"
    );
  }

  #[test]
  fn summary_for_soft_time_limit() {
    let outcome = WaitOutcome::Killed(Signal::SIGXCPU);

    assert!(outcome.time_exceeded());
    assert_eq!(
      outcome.summary(60000, 50000),
      "[bwrapbox] application time exceeded after 60000 real usecs and 50000 CPU usecs"
    );
  }

  #[test]
  fn caught_soft_signal_is_not_time_exceeded() {
    // A child that handles SIGXCPU and is later killed hard reports as a
    // plain kill.
    assert!(!WaitOutcome::Killed(Signal::SIGKILL).time_exceeded());
    assert!(!WaitOutcome::Stopped(Signal::SIGXCPU).time_exceeded());
  }
}
