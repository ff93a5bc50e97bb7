use super::*;

/// Which half of an rlimit slot a pair updates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Half {
  /// The soft limit (`rlim_cur`), named `.high`.
  High,
  /// The hard limit (`rlim_max`), named `.max`.
  Max,
}

/// A validated `RESOURCE.high` / `RESOURCE.max` rlimit name.
#[derive(Debug, Clone, Copy)]
pub struct RlimitSpec {
  pub half: Half,
  pub resource: Resource,
}

impl RlimitSpec {
  /// Split a limit name at the final `.` into a known resource and a half.
  pub fn parse(name: &str) -> Result<Self> {
    let Some((resource, half)) = name.rsplit_once('.') else {
      return Err(Error::Limit(format!("malformed rlimit name: {name}")));
    };

    let half = match half {
      "high" => Half::High,
      "max" => Half::Max,
      other => {
        return Err(Error::Limit(format!(
          "unknown rlimit field {other} in {name}"
        )))
      }
    };

    let resource = lookup_resource(resource)
      .ok_or_else(|| Error::Limit(format!("unknown rlimit resource: {resource}")))?;

    Ok(Self { half, resource })
  }

  /// Apply `value` to this slot, preserving the untouched half.
  pub fn apply(&self, value: u64) -> Result {
    let (cur, max) = getrlimit(self.resource)?;
    let (cur, max) = resolved(self.half, value, cur, max);

    setrlimit(self.resource, cur, max)?;

    Ok(())
  }
}

/// Apply every rlimit pair in the order supplied.
pub fn apply_all(limits: &[Limit]) -> Result {
  for limit in limits {
    RlimitSpec::parse(&limit.name)?.apply(limit.value)?;
  }

  Ok(())
}

/// New (soft, hard) values for a slot update.
///
/// Lowering the hard limit drags the soft limit down with it so the kernel
/// never sees `cur > max`.
fn resolved(half: Half, value: u64, cur: u64, max: u64) -> (u64, u64) {
  match half {
    Half::High => (value, max),
    Half::Max => (cur.min(value), value),
  }
}

fn lookup_resource(name: &str) -> Option<Resource> {
  let resource = match name {
    "cpu" => Resource::RLIMIT_CPU,
    "fsize" => Resource::RLIMIT_FSIZE,
    "data" => Resource::RLIMIT_DATA,
    "stack" => Resource::RLIMIT_STACK,
    "core" => Resource::RLIMIT_CORE,
    "rss" => Resource::RLIMIT_RSS,
    "nproc" => Resource::RLIMIT_NPROC,
    "nofile" => Resource::RLIMIT_NOFILE,
    "memlock" => Resource::RLIMIT_MEMLOCK,
    "as" => Resource::RLIMIT_AS,
    "locks" => Resource::RLIMIT_LOCKS,
    "sigpending" => Resource::RLIMIT_SIGPENDING,
    "msgqueue" => Resource::RLIMIT_MSGQUEUE,
    "nice" => Resource::RLIMIT_NICE,
    "rtprio" => Resource::RLIMIT_RTPRIO,
    "rttime" => Resource::RLIMIT_RTTIME,
    _ => return None,
  };

  Some(resource)
}
