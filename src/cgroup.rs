use super::*;

/// Root of the unified cgroup v2 hierarchy.
const CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// Handle to one cgroup v2 directory owned by the supervisor.
///
/// The handle spans the whole supervision lifetime: the directory is created
/// before any child is forked and destroyed on every termination path
/// (normal exit, fatal error, SIGTERM/SIGINT to the supervisor).
#[derive(Debug, Clone)]
pub struct Cgroup {
  path: Utf8PathBuf,
}

impl Cgroup {
  /// Resolve a user-supplied name into an absolute cgroup path.
  ///
  /// Names without a leading `/` are taken relative to `/sys/fs/cgroup`.
  pub fn resolve(name: &str) -> Utf8PathBuf {
    if name.starts_with('/') {
      Utf8PathBuf::from(name)
    } else {
      Utf8PathBuf::from(CGROUP_ROOT).join(name)
    }
  }

  pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Utf8Path {
    &self.path
  }

  fn control(&self, name: &str) -> Utf8PathBuf {
    self.path.join(name)
  }

  pub fn create(&self) -> Result {
    self
      .path
      .create_dir(0o775)
      .map_err(|e| Error::Cgroup(format!("cannot create {}: {e}", self.path)))?;

    debug!(path = %self.path, "cgroup created");

    Ok(())
  }

  /// Write each limit value to its control file, in order.
  ///
  /// Stops at the first failure; the partially configured group is torn
  /// down by the caller's exit path.
  pub fn apply_limits(&self, limits: &[Limit]) -> Result {
    for limit in limits {
      let control = self.control(&limit.name);

      control
        .write_value(&limit.value.to_string())
        .map_err(|e| Error::Cgroup(format!("cannot write {control}: {e}")))?;

      debug!(%control, value = limit.value, "cgroup limit applied");
    }

    Ok(())
  }

  /// Move the calling process into the cgroup.
  ///
  /// Runs in a freshly forked child before exec, so the exec'd program and
  /// all of its descendants are accounted.
  pub fn attach_self(&self) -> Result {
    let procs = self.control("cgroup.procs");

    procs
      .write_value(&format!("{}\n", getpid()))
      .map_err(|e| Error::Cgroup(format!("cannot join {procs}: {e}")))
  }

  /// Cumulative CPU time of the cgroup in microseconds.
  ///
  /// `None` means `cpu.stat` is no longer readable, which callers treat as
  /// "every member has exited".
  pub fn cpu_usage_usecs(&self) -> Option<u64> {
    let stat = self.control("cpu.stat").read_all().ok()?;

    parse_usage_usec(&stat)
  }

  /// Kill every member and remove the directory.
  ///
  /// Idempotent: a cgroup that no longer exists is success, so the
  /// signal-interrupted wait path and the normal exit path may both run
  /// this. Writing `1` to `cgroup.kill` SIGKILLs all members atomically;
  /// removal is only legal once `cgroup.procs` reads empty. The drain loop
  /// has no sleep: the read is one syscall and membership empties within
  /// microseconds.
  pub fn kill_and_destroy(&self) -> Result {
    if !self.path.is_dir() {
      return Ok(());
    }

    let kill = self.control("cgroup.kill");
    kill
      .write_value("1")
      .map_err(|e| Error::Cgroup(format!("cannot write {kill}: {e}")))?;

    let procs = self.control("cgroup.procs");
    loop {
      match procs.read_all() {
        Ok(members) if members.trim().is_empty() => break,
        Ok(_) => continue,
        // The directory vanished under us; drained either way.
        Err(_) => break,
      }
    }

    match fs::remove_dir(&self.path) {
      Err(e) if e.kind() != io::ErrorKind::NotFound => {
        Err(Error::Cgroup(format!("cannot remove {}: {e}", self.path)))
      }
      _ => {
        debug!(path = %self.path, "cgroup destroyed");
        Ok(())
      }
    }
  }
}

/// Extract the `usage_usec` field from `cpu.stat` contents.
///
/// The kernel has always emitted it on the first line, but that layout is
/// not guaranteed, so any line position is accepted.
fn parse_usage_usec(stat: &str) -> Option<u64> {
  stat.lines().find_map(|line| {
    let mut fields = line.split_whitespace();

    match fields.next() {
      Some("usage_usec") => fields.next()?.parse().ok(),
      _ => None,
    }
  })
}
