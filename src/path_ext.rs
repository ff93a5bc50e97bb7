use super::*;

pub trait PathExt {
  fn create_dir(&self, mode: u32) -> Result;
  fn read_all(&self) -> Result<String>;
  fn write_value(&self, contents: &str) -> Result;
}

impl PathExt for Utf8Path {
  fn create_dir(&self, mode: u32) -> Result {
    fs::create_dir(self)?;
    fs::set_permissions(self, fs::Permissions::from_mode(mode))?;

    Ok(())
  }

  fn read_all(&self) -> Result<String> {
    Ok(fs::read_to_string(self)?)
  }

  fn write_value(&self, contents: &str) -> Result {
    let mut file = fs::OpenOptions::new()
      .create(true)
      .truncate(true)
      .write(true)
      .mode(0o664)
      .open(self)?;

    file.write_all(contents.as_bytes())?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use {super::*, tempfile::TempDir};

  fn utf8(temp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap()
  }

  #[test]
  fn create_dir_with_mode() {
    let temp = TempDir::new().unwrap();

    let path = utf8(&temp).join("group");

    path.create_dir(0o775).unwrap();

    assert!(path.is_dir());

    let metadata = fs::metadata(&path).unwrap();
    assert_eq!(metadata.permissions().mode() & 0o777, 0o775);
  }

  #[test]
  fn create_dir_requires_missing_target() {
    let temp = TempDir::new().unwrap();

    let path = utf8(&temp).join("group");

    path.create_dir(0o775).unwrap();

    assert!(path.create_dir(0o775).is_err());
  }

  #[test]
  fn write_then_read_control_value() {
    let temp = TempDir::new().unwrap();

    let path = utf8(&temp).join("memory.max");

    path.write_value("1048576").unwrap();

    assert_eq!(path.read_all().unwrap(), "1048576");

    // The creation mode is 0o664, less whatever the ambient umask strips.
    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode & !0o664, 0);
  }

  #[test]
  fn write_value_truncates() {
    let temp = TempDir::new().unwrap();

    let path = utf8(&temp).join("pids.max");

    path.write_value("4096").unwrap();
    path.write_value("64").unwrap();

    assert_eq!(path.read_all().unwrap(), "64");
  }
}
