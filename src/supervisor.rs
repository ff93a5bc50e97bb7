use super::*;

/// Set by the SIGTERM/SIGINT handler.
///
/// Storing a flag is the only work the handler does; everything else in
/// teardown (allocation, buffered I/O, tracing) is not async-signal-safe,
/// so it runs from ordinary control flow once the interrupted wait
/// observes the flag.
static TEARDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn request_teardown(_: libc::c_int) {
  TEARDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

#[derive(Debug)]
pub struct Supervisor {
  config: Config,
}

impl Supervisor {
  pub fn new(config: Config) -> Self {
    Self { config }
  }

  /// Run the supervised `bwrap` invocation to completion and return the
  /// exit status to terminate with.
  ///
  /// Without a cgroup there is nothing to account or watch, so the call
  /// execs in place and only comes back on failure.
  pub fn run(self) -> Result<i32> {
    let Some(path) = self.config.cgroup_path.clone() else {
      rlimit::apply_all(&self.config.exec_limits)?;
      switch_identity(&MaterialSystem, self.config.exec_gid, self.config.exec_uid)?;

      return Err(exec_bwrap(&self.config.bwrap_argv));
    };

    let cgroup = Cgroup::new(path);

    if self.config.cgroup_overwrite {
      cgroup.kill_and_destroy()?;
    }

    cgroup.create()?;

    let result = self.supervise(&cgroup);

    // Teardown must win over error reporting detail: the directory may not
    // outlive the supervisor, and the killed limiter must be collected on
    // both paths.
    let teardown = cgroup.kill_and_destroy();
    reap_stragglers();

    match result {
      Ok((outcome, cpu_usecs, elapsed_usecs)) => {
        teardown?;

        if !self.config.quiet {
          eprintln!("{}", outcome.summary(elapsed_usecs, cpu_usecs));
        }

        Ok(outcome.status())
      }
      Err(error) => Err(error),
    }
  }

  /// Everything between cgroup creation and teardown.
  fn supervise(&self, cgroup: &Cgroup) -> Result<(WaitOutcome, u64, u64)> {
    cgroup.apply_limits(&self.config.cgroup_limits)?;

    let child = self.fork_bwrap(cgroup)?;
    let started = Instant::now();
    debug!(%child, cgroup = %cgroup.path(), "bwrap child forked");

    if self.config.deadlines.any() {
      let limiter = fork_limiter(&self.config.deadlines, cgroup, child, started)?;
      debug!(%limiter, "limiter child forked");
    }

    install_teardown_handlers()?;

    let outcome = wait_for(child, cgroup);

    // Read the accounting before teardown destroys it.
    let cpu_usecs = cgroup.cpu_usage_usecs().unwrap_or(0);
    let elapsed_usecs = started.elapsed().as_micros() as u64;

    Ok((outcome, cpu_usecs, elapsed_usecs))
  }

  /// Fork the child that becomes `bwrap`.
  fn fork_bwrap(&self, cgroup: &Cgroup) -> Result<Pid> {
    match unsafe { fork() }
      .map_err(|e| Error::Process(format!("cannot fork bwrap child: {e}")))?
    {
      ForkResult::Child => exit_child(self.bwrap_child(cgroup)),
      ForkResult::Parent { child } => Ok(child),
    }
  }

  /// Child-side setup: join the cgroup, constrain and re-identify, exec.
  ///
  /// Joining before exec means the exec'd program and all its descendants
  /// are accounted from their first instruction.
  fn bwrap_child(&self, cgroup: &Cgroup) -> Error {
    if let Err(e) = prctl::set_pdeathsig(Signal::SIGKILL) {
      return Error::Process(format!("cannot arm parent-death signal: {e}"));
    }
    if let Err(e) = cgroup.attach_self() {
      return e;
    }
    if let Err(e) = rlimit::apply_all(&self.config.exec_limits) {
      return e;
    }
    if let Err(e) = switch_identity(&MaterialSystem, self.config.exec_gid, self.config.exec_uid) {
      return e;
    }

    exec_bwrap(&self.config.bwrap_argv)
  }
}

/// Fork the watchdog against an already-running target.
///
/// The limiter joins the cgroup too, so teardown's `cgroup.kill` reaps it
/// deterministically along with the target.
fn fork_limiter(
  deadlines: &Deadlines,
  cgroup: &Cgroup,
  target: Pid,
  started: Instant,
) -> Result<Pid> {
  match unsafe { fork() }.map_err(|e| Error::Process(format!("cannot fork limiter: {e}")))? {
    ForkResult::Child => {
      if let Err(e) = prctl::set_pdeathsig(Signal::SIGKILL) {
        exit_child(Error::Process(format!("cannot arm parent-death signal: {e}")));
      }

      if cgroup.attach_self().is_err() {
        // The group is already gone; nothing left to watch.
        unsafe { libc::_exit(0) }
      }

      limiter::run(deadlines, cgroup, target, started);

      unsafe { libc::_exit(0) }
    }
    ForkResult::Parent { child } => Ok(child),
  }
}

/// Switch group then user, skipping each syscall when the current identity
/// already matches the requested one.
fn switch_identity(system: &impl System, gid: Option<u32>, uid: Option<u32>) -> Result {
  if let Some(gid) = gid {
    if system.getgid().as_raw() != gid {
      system
        .setgid(gid)
        .map_err(|e| Error::Process(format!("cannot switch to group {gid}: {e}")))?;
    }
  }

  if let Some(uid) = uid {
    if system.getuid().as_raw() != uid {
      system
        .setuid(uid)
        .map_err(|e| Error::Process(format!("cannot switch to user {uid}: {e}")))?;
    }
  }

  Ok(())
}

/// Wait for the bwrap child, honoring teardown requests recorded by the
/// signal handler.
///
/// Killing the members from here makes the retried wait return the child's
/// status, so the normal summary path still runs after an external
/// SIGTERM/SIGINT.
fn wait_for(child: Pid, cgroup: &Cgroup) -> WaitOutcome {
  loop {
    match waitpid(child, Some(WaitPidFlag::WUNTRACED)) {
      Ok(status) => return WaitOutcome::from(status),
      Err(Errno::EINTR) => {
        if TEARDOWN_REQUESTED.swap(false, Ordering::Relaxed) {
          let _ = cgroup.kill_and_destroy();
        }
      }
      Err(_) => return WaitOutcome::Interrupted,
    }
  }
}

/// Install the SIGTERM/SIGINT handlers.
///
/// No SA_RESTART: the signal must interrupt the blocking wait so the
/// teardown request is acted on promptly.
fn install_teardown_handlers() -> Result {
  let action = SigAction::new(
    SigHandler::Handler(request_teardown),
    SaFlags::empty(),
    SigSet::empty(),
  );

  unsafe {
    sigaction(Signal::SIGTERM, &action)?;
    sigaction(Signal::SIGINT, &action)?;
  }

  Ok(())
}

/// Collect whatever teardown killed (normally the limiter) so no zombie
/// outlives the run.
fn reap_stragglers() {
  while let Ok(status) = waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
    if status == WaitStatus::StillAlive {
      break;
    }
  }
}

/// Report a child-side failure and leave without touching parent state.
///
/// `_exit` skips the parent's cleanup machinery; tearing down the cgroup is
/// the supervisor's job alone.
fn exit_child(error: Error) -> ! {
  eprintln!("bwrapbox: {error}");

  unsafe { libc::_exit(255) }
}

/// Exec into `bwrap`; only returns on failure.
pub fn exec_bwrap(argv: &[String]) -> Error {
  let argv: Vec<CString> = match argv
    .iter()
    .map(|arg| CString::new(arg.as_str()))
    .collect()
  {
    Ok(argv) => argv,
    Err(e) => return Error::Exec(format!("argument contains NUL byte: {e}")),
  };

  match execvp(&argv[0], &argv) {
    Ok(infallible) => match infallible {},
    Err(e) => Error::Exec(format!("cannot exec {}: {e}", argv[0].to_string_lossy())),
  }
}
