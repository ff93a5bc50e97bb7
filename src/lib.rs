use {
  camino::{Utf8Path, Utf8PathBuf},
  nix::{
    errno::Errno,
    libc,
    sys::{
      prctl,
      resource::{getrlimit, setrlimit, Resource},
      signal::{kill, sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal},
      wait::{waitpid, WaitPidFlag, WaitStatus},
    },
    unistd::{execvp, fork, getgid, getpid, getuid, setgid, setuid, ForkResult, Gid, Pid, Uid},
  },
  std::{
    ffi::CString,
    fmt, fs,
    io::{self, Write},
    os::unix::fs::{OpenOptionsExt, PermissionsExt},
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
  },
  thiserror::Error,
  tracing::debug,
};

pub use crate::{
  args::{parse, Invocation, HELP},
  cgroup::Cgroup,
  config::Config,
  error::Error,
  limit::Limit,
  limiter::Deadlines,
  outcome::WaitOutcome,
  rlimit::{Half, RlimitSpec},
  supervisor::{exec_bwrap, Supervisor},
  system::{MaterialSystem, System},
};

use crate::path_ext::PathExt;

mod args;
mod cgroup;
mod config;
mod ensure;
mod error;
mod limit;
mod limiter;
mod outcome;
mod path_ext;
mod rlimit;
mod supervisor;
mod system;

pub type Result<T = (), E = Error> = std::result::Result<T, E>;
