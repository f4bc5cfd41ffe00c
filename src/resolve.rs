use nix::sys::stat::{SFlag, stat};
use nix::unistd::{AccessFlags, access};
use std::env;
use std::ffi::{CStr, CString, NulError, OsStr};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::PathBuf;

/// Name of the environment variable holding the search path.
pub const SEARCH_PATH_VAR: &str = "PATH";

/// The executables a command name may refer to, in the order they are tried.
///
/// The plan is built before a child process is created so that probing it
/// afterwards only issues `access`/`stat` calls:
/// - the name itself comes first: a directly accessible file is used as-is;
/// - a name without `/` is then looked up in every search-path directory, in
///   listed order (an empty entry stands for the current directory);
/// - a name containing `/` is never looked up in the search path;
/// - an empty name has no candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPlan {
    candidates: Vec<CString>,
}

impl SearchPlan {
    pub fn new(command: &OsStr, search_paths: Option<&OsStr>) -> Result<Self, NulError> {
        let mut candidates = Vec::new();
        if command.is_empty() {
            return Ok(Self { candidates });
        }
        candidates.push(CString::new(command.as_bytes())?);

        let has_separator = command.as_bytes().contains(&b'/');
        if let (false, Some(search_paths)) = (has_separator, search_paths) {
            for dir in env::split_paths(search_paths) {
                // Fresh buffer per entry.
                let candidate = if dir.as_os_str().is_empty() {
                    PathBuf::from(command)
                } else {
                    dir.join(command)
                };
                candidates.push(CString::new(candidate.into_os_string().into_vec())?);
            }
        }
        Ok(Self { candidates })
    }

    /// Plan against the search path currently set in the process environment.
    ///
    /// The variable is read on every call; nothing is cached between commands.
    pub fn from_env(command: &OsStr) -> Result<Self, NulError> {
        Self::new(command, env::var_os(SEARCH_PATH_VAR).as_deref())
    }

    pub fn candidates(&self) -> impl Iterator<Item = &CStr> {
        self.candidates.iter().map(CString::as_c_str)
    }

    /// The first candidate that exists and is not a directory.
    ///
    /// Does not allocate, so it is safe to call in a freshly forked child.
    pub fn first_match(&self) -> Option<&CStr> {
        self.candidates().find(|candidate| is_accessible(candidate))
    }
}

/// Whether `path` names an existing file that is not a directory.
pub fn is_accessible(path: &CStr) -> bool {
    if access(path, AccessFlags::F_OK).is_err() {
        return false;
    }
    match stat(path) {
        Ok(st) => (SFlag::from_bits_truncate(st.st_mode) & SFlag::S_IFMT) != SFlag::S_IFDIR,
        Err(_) => false,
    }
}

/// Resolve a command name the way the shell does before running it.
///
/// Returns the path that would be executed, or `None` when nothing matches.
pub fn resolve(command: &str, search_paths: Option<&OsStr>) -> Option<PathBuf> {
    let plan = SearchPlan::new(OsStr::new(command), search_paths).ok()?;
    plan.first_match()
        .map(|found| PathBuf::from(OsStr::from_bytes(found.to_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CwdGuard, lock_current_dir};
    use std::fs::{self, File};
    use std::path::Path;

    fn osstr(s: &str) -> &OsStr {
        OsStr::new(s)
    }

    fn touch(path: &Path) {
        File::create(path).expect("touch");
    }

    #[test]
    fn absolute_existing_true() {
        let found = resolve("/bin/sh", Some(osstr("/nonexistent")));
        assert_eq!(found.as_deref(), Some(Path::new("/bin/sh")));
    }

    #[test]
    fn absolute_nonexisting() {
        let res = resolve("/bin/nonexisting", Some(osstr("/bin")));
        assert!(res.is_none(), "Expected not to find /bin/nonexisting via absolute path");
    }

    #[test]
    fn single_component_found_in_path() {
        let found = resolve("sh", Some(osstr("/nonexistent:/bin"))).expect("sh in /bin");
        assert_eq!(found, Path::new("/bin/sh"));
    }

    #[test]
    fn single_component_not_found_in_path() {
        assert!(resolve("nonexisting", Some(osstr("/bin"))).is_none());
        assert!(resolve("sh", None).is_none());
    }

    #[test]
    fn first_directory_in_path_order_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(&first.path().join("tool"));
        touch(&second.path().join("tool"));

        let search = std::env::join_paths([second.path(), first.path()]).unwrap();
        let found = resolve("tool", Some(&search)).expect("tool on path");
        assert_eq!(found, second.path().join("tool"));
    }

    #[test]
    fn directories_are_not_matches() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("tool")).unwrap();
        assert!(resolve("tool", Some(dir.path().as_os_str())).is_none());
    }

    #[test]
    fn path_with_separator_skips_search_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub").join("tool"));

        let plan = SearchPlan::new(osstr("sub/tool"), Some(dir.path().as_os_str())).unwrap();
        assert_eq!(plan.candidates().count(), 1);

        let _lock = lock_current_dir();
        let elsewhere = tempfile::tempdir().unwrap();
        let _cwd = CwdGuard::new();
        std::env::set_current_dir(elsewhere.path()).unwrap();
        assert!(resolve("sub/tool", Some(dir.path().as_os_str())).is_none());
    }

    #[test]
    fn multiple_components_relative_existing() {
        let _lock = lock_current_dir();
        let tmp = tempfile::tempdir().unwrap();
        let _cwd = CwdGuard::new();
        fs::create_dir_all(tmp.path().join("bin")).unwrap();
        touch(&tmp.path().join("bin").join("sh"));

        std::env::set_current_dir(tmp.path()).unwrap();
        let found = resolve("bin/sh", Some(osstr("/does/not/matter"))).expect("relative bin/sh");
        assert_eq!(found, Path::new("bin/sh"));
    }

    #[test]
    fn current_dir_with_dot_prefix() {
        let _lock = lock_current_dir();
        let tmp = tempfile::tempdir().unwrap();
        let _cwd = CwdGuard::new();
        touch(&tmp.path().join("foo"));

        std::env::set_current_dir(tmp.path()).unwrap();
        let found = resolve("./foo", Some(osstr("/bin"))).expect("./foo in current dir");
        assert_eq!(found, Path::new("./foo"));
    }

    #[test]
    fn empty_search_path_entry_is_current_dir() {
        let plan = SearchPlan::new(osstr("tool"), Some(osstr("/usr/bin::/bin"))).unwrap();
        let candidates: Vec<_> = plan
            .candidates()
            .map(|c| c.to_str().unwrap().to_string())
            .collect();
        assert_eq!(candidates, ["tool", "/usr/bin/tool", "tool", "/bin/tool"]);
    }

    #[test]
    fn empty_path_is_none() {
        assert!(resolve("", Some(osstr("/bin"))).is_none());
        assert_eq!(SearchPlan::new(osstr(""), Some(osstr("/bin"))).unwrap().candidates().count(), 0);
    }

    #[test]
    fn interior_nul_is_rejected() {
        assert!(SearchPlan::new(osstr("a\0b"), None).is_err());
    }
}
