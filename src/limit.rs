use super::*;

/// A named limit with an integer value.
///
/// For cgroup limits the name is written verbatim as the relative control
/// filename beneath the cgroup directory (e.g. `memory.max`). Rlimit names
/// take the form `RESOURCE.high` (soft) or `RESOURCE.max` (hard).
#[derive(Debug, Clone, PartialEq)]
pub struct Limit {
  pub name: String,
  pub value: u64,
}

impl Limit {
  pub fn new(name: impl Into<String>, value: u64) -> Self {
    Self {
      name: name.into(),
      value,
    }
  }
}

impl fmt::Display for Limit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} = {}", self.name, self.value)
  }
}
