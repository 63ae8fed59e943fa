use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use crate::error::{Error, Result};

/// Expand a leading `~` (alone, `~/` or `~\`) to the home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    let path = path.trim();
    let rest = if path == "~" {
        ""
    } else if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        rest
    } else {
        return Ok(PathBuf::from(path));
    };

    let home = dirs::home_dir().ok_or(Error::HomeDirUnavailable)?;
    if rest.is_empty() {
        return Ok(home);
    }
    Ok(home.join(rest.replace(['/', '\\'], std::path::MAIN_SEPARATOR_STR)))
}

/// Shorten an absolute path under the home directory to `~/...`.
///
/// Paths outside home, and every path when home is unknown, come back as-is.
pub fn abbreviate_home(path: &Path) -> String {
    let Some(home) = dirs::home_dir() else {
        return path.display().to_string();
    };
    let home = super::normalize(&home);
    let path = super::normalize(path);

    match path.strip_prefix(&home) {
        Ok(rel) if rel.as_os_str().is_empty() => "~".to_string(),
        Ok(rel) => format!("~{MAIN_SEPARATOR}{}", rel.display()),
        Err(_) => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use tempfile::TempDir;

    struct HomeGuard(Option<std::ffi::OsString>);

    impl HomeGuard {
        fn set(path: &Path) -> Self {
            let previous = std::env::var_os("HOME");
            std::env::set_var("HOME", path);
            Self(previous)
        }
    }

    impl Drop for HomeGuard {
        fn drop(&mut self) {
            match self.0.take() {
                Some(v) => std::env::set_var("HOME", v),
                None => std::env::remove_var("HOME"),
            }
        }
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_expand_home() {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        std::fs::create_dir_all(&home).unwrap();
        let _guard = HomeGuard::set(&home);

        assert_eq!(expand_home("~").unwrap(), home);
        assert_eq!(expand_home("~/dev/plugin").unwrap(), home.join("dev").join("plugin"));
        assert_eq!(expand_home("/abs/plugin").unwrap(), PathBuf::from("/abs/plugin"));
        assert_eq!(expand_home("rel/plugin").unwrap(), PathBuf::from("rel/plugin"));
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_abbreviate_home() {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        std::fs::create_dir_all(&home).unwrap();
        let _guard = HomeGuard::set(&home);

        assert_eq!(abbreviate_home(&home.join("dev").join("plugin")), "~/dev/plugin");
        assert_eq!(abbreviate_home(&home), "~");
        assert_eq!(abbreviate_home(Path::new("/opt/plugin")), "/opt/plugin");
    }
}
