use super::*;

/// Supervisor configuration, populated by the argument parser and immutable
/// thereafter.
#[derive(Debug)]
pub struct Config {
  /// Arguments handed to `bwrap`, starting with the program name itself.
  ///
  /// Everything the parser does not recognize as a supervisor option is
  /// forwarded here verbatim, as is everything after `--` (including the
  /// `--` itself, which `bwrap` uses to find the start of the command).
  pub bwrap_argv: Vec<String>,

  /// Cgroup limits, written in order as `<value>` to `<cgroup>/<name>`.
  ///
  /// The special names `time.high` and `time.max` never appear here; the
  /// parser turns them into CPU deadlines instead.
  pub cgroup_limits: Vec<Limit>,

  /// Destroy a leftover cgroup of the same name before creating ours.
  pub cgroup_overwrite: bool,

  /// Control group to create and account the sandbox under.
  ///
  /// `None` disables cgroup mode entirely: no directory is created, no
  /// children are forked, and `bwrap` is exec'd in-process. Relative names
  /// have already been resolved under `/sys/fs/cgroup` by the parser.
  pub cgroup_path: Option<Utf8PathBuf>,

  /// CPU-time and wall-clock thresholds for the watchdog, in microseconds.
  pub deadlines: Deadlines,

  /// Group ID to assume before exec.
  ///
  /// `None` leaves the group unchanged, and the switch is skipped when the
  /// current gid already matches.
  pub exec_gid: Option<u32>,

  /// Per-process rlimits, applied in order before exec.
  ///
  /// Names are `RESOURCE.high` (soft limit) or `RESOURCE.max` (hard limit)
  /// and have been validated by the parser.
  pub exec_limits: Vec<Limit>,

  /// User ID to assume before exec. Same semantics as `exec_gid`.
  pub exec_uid: Option<u32>,

  /// Suppress the final status line on stderr.
  pub quiet: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      bwrap_argv: vec!["bwrap".to_string()],
      cgroup_limits: Vec::new(),
      cgroup_overwrite: false,
      cgroup_path: None,
      deadlines: Deadlines::default(),
      exec_gid: None,
      exec_limits: Vec::new(),
      exec_uid: None,
      quiet: false,
    }
  }
}

impl Config {
  /// Whether the supervisor runs in cgroup mode.
  pub fn cgroup_enabled(&self) -> bool {
    self.cgroup_path.is_some()
  }
}
