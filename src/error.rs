use super::*;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cgroup error: {0}")]
  Cgroup(String),
  #[error("configuration error: {0}")]
  Config(String),
  #[error("exec error: {0}")]
  Exec(String),
  #[error("filesystem error: {0}")]
  Filesystem(#[from] io::Error),
  #[error("resource limit error: {0}")]
  Limit(String),
  #[error("process error: {0}")]
  Process(String),
  #[error("system error: {0}")]
  Sys(#[from] Errno),
}
