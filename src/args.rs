use super::*;

/// Usage text printed before handing `--help` over to `bwrap` itself.
pub const HELP: &str = "\
usage: bwrapbox [OPTIONS...] [--] COMMAND [ARGS...]

    --help                       Print this help, then bwrap's own
    --cgroup NAME                Run under cgroup NAME (absolute, or relative to /sys/fs/cgroup)
    --cgroup-overwrite           Destroy a leftover cgroup of the same name first
    --climit VAR VALUE           Write VALUE to cgroup control VAR; time.high/time.max set the CPU watchdog (usecs)
    --rlimit VAR VALUE           Set rlimit VAR (RESOURCE.high or RESOURCE.max) to VALUE
    --climit-elapsed-high VALUE  Wall-clock soft limit in usecs (SIGXCPU)
    --climit-elapsed-max VALUE   Wall-clock hard limit in usecs (SIGKILL)
    --setuid VALUE               User ID to assume before exec
    --setgid VALUE               Group ID to assume before exec
    --quiet                      Suppress the final status line
    --                           End of bwrapbox options

Unrecognized options are passed through to bwrap.
";

/// What an argument vector amounts to: a help request, or a supervised run.
#[derive(Debug)]
pub enum Invocation {
  Help,
  Run(Config),
}

/// Partition the supervisor's arguments (program name excluded) into
/// supervisor options and pass-through `bwrap` arguments, in one
/// left-to-right scan.
pub fn parse(args: &[String]) -> Result<Invocation> {
  if args.is_empty() || args.iter().any(|arg| arg == "--help") {
    return Ok(Invocation::Help);
  }

  let mut config = Config::default();
  let mut passthrough = false;
  let mut args = args.iter();

  while let Some(arg) = args.next() {
    if passthrough {
      config.bwrap_argv.push(arg.clone());
      continue;
    }

    match arg.as_str() {
      "--" => {
        // bwrap needs the separator too: it marks the start of COMMAND.
        config.bwrap_argv.push(arg.clone());
        passthrough = true;
      }
      "--cgroup" => {
        config.cgroup_path = Some(Cgroup::resolve(value(&mut args, arg)?));
      }
      "--cgroup-overwrite" => config.cgroup_overwrite = true,
      "--climit" => {
        let name = value(&mut args, arg)?;
        let limit = integer(value(&mut args, arg)?, arg)?;

        match name {
          "time.high" => config.deadlines.cpu_high = Some(limit),
          "time.max" => config.deadlines.cpu_max = Some(limit),
          _ => config.cgroup_limits.push(Limit::new(name, limit)),
        }
      }
      "--climit-elapsed-high" => {
        ensure!(
          config.cgroup_enabled(),
          Error::Config("enable cgroup to limit time".into())
        );
        config.deadlines.wall_high = Some(integer(value(&mut args, arg)?, arg)?);
      }
      "--climit-elapsed-max" => {
        ensure!(
          config.cgroup_enabled(),
          Error::Config("enable cgroup to limit time".into())
        );
        config.deadlines.wall_max = Some(integer(value(&mut args, arg)?, arg)?);
      }
      "--quiet" => config.quiet = true,
      "--rlimit" => {
        let name = value(&mut args, arg)?;

        // Reject unknown resources now, while there is nothing to clean up.
        RlimitSpec::parse(name)?;

        let limit = integer(value(&mut args, arg)?, arg)?;
        config.exec_limits.push(Limit::new(name, limit));
      }
      "--setgid" => config.exec_gid = Some(id(value(&mut args, arg)?, arg)?),
      "--setuid" => config.exec_uid = Some(id(value(&mut args, arg)?, arg)?),
      _ => config.bwrap_argv.push(arg.clone()),
    }
  }

  Ok(Invocation::Run(config))
}

fn value<'a>(args: &mut std::slice::Iter<'a, String>, option: &str) -> Result<&'a str> {
  args
    .next()
    .map(String::as_str)
    .ok_or_else(|| Error::Config(format!("{option} requires a value")))
}

fn integer(raw: &str, option: &str) -> Result<u64> {
  raw
    .parse()
    .map_err(|_| Error::Config(format!("{option} expects an integer, got {raw}")))
}

fn id(raw: &str, option: &str) -> Result<u32> {
  raw
    .parse()
    .map_err(|_| Error::Config(format!("{option} expects a numeric id, got {raw}")))
}

#[cfg(test)]
mod tests {
  use {super::*, assert_matches::assert_matches};

  fn args(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
  }

  fn run(raw: &[&str]) -> Config {
    match parse(&args(raw)).unwrap() {
      Invocation::Run(config) => config,
      Invocation::Help => panic!("expected a run, got help"),
    }
  }

  #[test]
  fn empty_argv_asks_for_help() {
    assert_matches!(parse(&[]).unwrap(), Invocation::Help);
  }

  #[test]
  fn help_anywhere_wins() {
    let raw = args(&["--cgroup", "test", "--help", "--", "/bin/true"]);

    assert_matches!(parse(&raw).unwrap(), Invocation::Help);
  }

  #[test]
  fn separator_is_forwarded_and_ends_option_parsing() {
    let config = run(&["--", "--quiet", "/bin/echo", "hi"]);

    // `--quiet` after the separator belongs to the command, not to us.
    assert!(!config.quiet);
    assert_eq!(config.bwrap_argv, ["bwrap", "--", "--quiet", "/bin/echo", "hi"]);
  }

  #[test]
  fn unknown_options_pass_through_to_bwrap() {
    let config = run(&["--unshare-net", "--quiet", "--", "ls"]);

    assert!(config.quiet);
    assert_eq!(config.bwrap_argv, ["bwrap", "--unshare-net", "--", "ls"]);
  }

  #[test]
  fn relative_cgroup_name_lands_under_the_hierarchy_root() {
    let config = run(&["--cgroup", "graders", "--", "x"]);

    assert_eq!(
      config.cgroup_path.as_deref().map(Utf8Path::as_str),
      Some("/sys/fs/cgroup/graders")
    );
  }

  #[test]
  fn absolute_cgroup_name_is_kept() {
    let config = run(&["--cgroup", "/sys/fs/cgroup/ci/run-7", "--", "x"]);

    assert_eq!(
      config.cgroup_path.as_deref().map(Utf8Path::as_str),
      Some("/sys/fs/cgroup/ci/run-7")
    );
  }

  #[test]
  fn climit_writes_become_cgroup_limits() {
    let config = run(&["--cgroup", "t", "--climit", "memory.max", "1048576", "--", "x"]);

    assert_eq!(config.cgroup_limits, [Limit::new("memory.max", 1_048_576)]);
  }

  #[test]
  fn climit_time_binds_the_cpu_watchdog() {
    let config = run(&[
      "--cgroup", "t", "--climit", "time.high", "50000", "--climit", "time.max", "200000", "--",
      "x",
    ]);

    assert_eq!(config.deadlines.cpu_high, Some(50_000));
    assert_eq!(config.deadlines.cpu_max, Some(200_000));
    assert!(config.cgroup_limits.is_empty());
  }

  #[test]
  fn elapsed_limits_require_cgroup_mode_first() {
    let raw = args(&["--climit-elapsed-max", "100000", "--cgroup", "t", "--", "x"]);

    assert_matches!(
      parse(&raw),
      Err(Error::Config(message)) if message == "enable cgroup to limit time"
    );
  }

  #[test]
  fn elapsed_limits_after_cgroup_are_accepted() {
    let config = run(&[
      "--cgroup", "t", "--climit-elapsed-high", "50000", "--climit-elapsed-max", "100000", "--",
      "x",
    ]);

    assert_eq!(config.deadlines.wall_high, Some(50_000));
    assert_eq!(config.deadlines.wall_max, Some(100_000));
  }

  #[test]
  fn rlimits_are_validated_eagerly() {
    let raw = args(&["--rlimit", "threads.max", "4", "--", "x"]);

    assert_matches!(
      parse(&raw),
      Err(Error::Limit(message)) if message.contains("unknown rlimit resource")
    );
  }

  #[test]
  fn identity_options_parse_as_ids() {
    let config = run(&["--setuid", "1000", "--setgid", "1000", "--", "id"]);

    assert_eq!(config.exec_uid, Some(1000));
    assert_eq!(config.exec_gid, Some(1000));
  }

  #[test]
  fn identity_defaults_to_no_change() {
    let config = run(&["--", "x"]);

    assert_eq!(config.exec_uid, None);
    assert_eq!(config.exec_gid, None);
  }

  #[test]
  fn missing_value_is_rejected() {
    assert_matches!(
      parse(&args(&["--cgroup"])),
      Err(Error::Config(message)) if message.contains("requires a value")
    );

    assert_matches!(
      parse(&args(&["--climit", "memory.max"])),
      Err(Error::Config(message)) if message.contains("requires a value")
    );
  }

  #[test]
  fn non_numeric_value_is_rejected() {
    assert_matches!(
      parse(&args(&["--climit", "memory.max", "lots"])),
      Err(Error::Config(message)) if message.contains("expects an integer")
    );
  }

  #[test]
  fn independent_limit_flags_commute() {
    let forward = run(&[
      "--rlimit", "nofile.max", "16", "--rlimit", "fsize.high", "8192", "--cgroup", "t",
      "--climit", "memory.max", "1048576", "--climit", "pids.max", "64", "--", "x",
    ]);
    let reversed = run(&[
      "--climit", "pids.max", "64", "--climit", "memory.max", "1048576", "--cgroup", "t",
      "--rlimit", "fsize.high", "8192", "--rlimit", "nofile.max", "16", "--", "x",
    ]);

    let sorted = |mut limits: Vec<Limit>| {
      limits.sort_by(|a, b| a.name.cmp(&b.name));
      limits
    };

    assert_eq!(sorted(forward.exec_limits), sorted(reversed.exec_limits));
    assert_eq!(sorted(forward.cgroup_limits), sorted(reversed.cgroup_limits));
  }
}
