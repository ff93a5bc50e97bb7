use super::*;

/// Identity syscalls behind a seam so the switch logic is testable.
pub trait System {
  fn getgid(&self) -> Gid;
  fn getuid(&self) -> Uid;
  fn setgid(&self, gid: u32) -> Result<(), nix::Error>;
  fn setuid(&self, uid: u32) -> Result<(), nix::Error>;
}

pub struct MaterialSystem;

impl System for MaterialSystem {
  fn getgid(&self) -> Gid {
    getgid()
  }

  fn getuid(&self) -> Uid {
    getuid()
  }

  fn setgid(&self, gid: u32) -> Result<(), nix::Error> {
    setgid(Gid::from_raw(gid))
  }

  fn setuid(&self, uid: u32) -> Result<(), nix::Error> {
    setuid(Uid::from_raw(uid))
  }
}
