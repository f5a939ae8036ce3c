//! Host backed by the local file system and shell.

use super::Host;
use crate::error::HostError;
use crate::types::ToolCallResult;
use glob::{MatchOptions, Pattern};
use policy::{CapabilityRequest, Policy};
use serde_json::{Value, json};
use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Largest file `read_file` will return (10 MiB).
const MAX_READ_SIZE: u64 = 10 * 1024 * 1024;

/// Files larger than this are skipped by `search_files` (5 MiB).
const MAX_SEARCH_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Cap on the number of search matches returned.
const MAX_SEARCH_RESULTS: usize = 1000;

/// Dangling symlinks followed before giving up.
const MAX_LINK_HOPS: usize = 40;

/// Builder for a [`LocalHost`].
#[derive(Debug, Clone)]
pub struct LocalHostBuilder {
    root: PathBuf,
    policy: Policy,
    command_timeout: Option<Duration>,
}

impl LocalHostBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            policy: Policy::restrictive(),
            command_timeout: None,
        }
    }

    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<LocalHost, HostError> {
        let root = std::fs::canonicalize(&self.root).map_err(|source| HostError::Io {
            path: self.root.display().to_string(),
            source,
        })?;
        Ok(LocalHost {
            root,
            policy: self.policy,
            command_timeout: self.command_timeout,
        })
    }
}

/// File-system and process host rooted at a workspace directory.
///
/// Relative paths resolve against the root. Every operation is checked
/// against the [`Policy`] first, using the root-relative form of the
/// real path (symlinks resolved) as scope.
#[derive(Debug, Clone)]
pub struct LocalHost {
    root: PathBuf,
    policy: Policy,
    command_timeout: Option<Duration>,
}

/// A request path resolved against the root.
struct Resolved {
    absolute: PathBuf,
    /// Root-relative form (absolute when outside the root).
    scope: String,
}

impl LocalHost {
    pub fn builder(root: impl Into<PathBuf>) -> LocalHostBuilder {
        LocalHostBuilder::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn resolve(&self, path: &str) -> Result<Resolved, HostError> {
        let absolute = real_path(&normalize(&self.root.join(path)))
            .await
            .map_err(Self::io_error(path))?;
        let scope = display_relative(&self.root, &absolute);
        Ok(Resolved { absolute, scope })
    }

    fn io_error(path: &str) -> impl FnOnce(io::Error) -> HostError + '_ {
        move |source| HostError::Io {
            path: path.to_string(),
            source,
        }
    }
}

impl std::fmt::Display for LocalHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "local({})", self.root.display())
    }
}

impl Host for LocalHost {
    async fn read_file(&self, path: &str) -> Result<ToolCallResult, HostError> {
        let target = self.resolve(path).await?;
        self.policy.require(&CapabilityRequest::fs_read(&target.scope))?;
        debug!(path = %target.scope, "reading file");

        let metadata = tokio::fs::metadata(&target.absolute)
            .await
            .map_err(Self::io_error(path))?;
        if !metadata.is_file() {
            return Err(HostError::Failed(format!("'{path}' is not a file")));
        }
        if metadata.len() > MAX_READ_SIZE {
            return Err(HostError::Failed(format!(
                "'{path}' is too large ({} bytes, max {MAX_READ_SIZE})",
                metadata.len()
            )));
        }

        let content = tokio::fs::read_to_string(&target.absolute)
            .await
            .map_err(Self::io_error(path))?;
        Ok(ToolCallResult::success(content))
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<ToolCallResult, HostError> {
        let target = self.resolve(path).await?;
        self.policy.require(&CapabilityRequest::fs_write(&target.scope))?;
        debug!(path = %target.scope, bytes = content.len(), "writing file");

        if let Some(parent) = target.absolute.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(Self::io_error(path))?;
        }
        tokio::fs::write(&target.absolute, content)
            .await
            .map_err(Self::io_error(path))?;

        Ok(ToolCallResult::success(json!({
            "path": target.scope,
            "bytes": content.len(),
        })))
    }

    async fn list_directory(&self, path: &str) -> Result<ToolCallResult, HostError> {
        let target = self.resolve(path).await?;
        self.policy.require(&CapabilityRequest::fs_read(&target.scope))?;
        debug!(path = %target.scope, "listing directory");

        let mut reader = tokio::fs::read_dir(&target.absolute)
            .await
            .map_err(Self::io_error(path))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(Self::io_error(path))? {
            let metadata = entry.metadata().await.map_err(Self::io_error(path))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push(json!({
                "name": name,
                "path": display_relative(&self.root, &entry.path()),
                "isDirectory": metadata.is_dir(),
                "size": if metadata.is_dir() { 0 } else { metadata.len() },
            }));
        }
        entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        Ok(ToolCallResult::success(Value::Array(entries)))
    }

    async fn execute_command(
        &self,
        command: &str,
        working_directory: Option<&str>,
    ) -> Result<ToolCallResult, HostError> {
        self.policy.require(&CapabilityRequest::exec(command))?;

        let cwd = match working_directory {
            Some(dir) => {
                let target = self.resolve(dir).await?;
                self.policy.require(&CapabilityRequest::fs_read(&target.scope))?;
                if !tokio::fs::metadata(&target.absolute)
                    .await
                    .map_err(Self::io_error(dir))?
                    .is_dir()
                {
                    return Err(HostError::Failed(format!("'{dir}' is not a directory")));
                }
                target.absolute
            }
            None => self.root.clone(),
        };
        debug!(command, cwd = %cwd.display(), "executing command");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let running = cmd.output();
        let output = match self.command_timeout {
            Some(limit) => tokio::time::timeout(limit, running)
                .await
                .map_err(|_| HostError::Timeout(limit))?,
            None => running.await,
        }
        .map_err(Self::io_error(command))?;

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(ToolCallResult::success(json!({
                "stdout": stdout,
                "stderr": stderr,
                "exitCode": exit_code,
            })))
        } else if stderr.trim().is_empty() {
            Ok(ToolCallResult::failure(format!(
                "Command failed with exit code {exit_code}"
            )))
        } else {
            Ok(ToolCallResult::failure(format!(
                "Command failed with exit code {exit_code}: {}",
                stderr.trim()
            )))
        }
    }

    async fn search_files(
        &self,
        query: &str,
        directory: Option<&str>,
        file_pattern: Option<&str>,
    ) -> Result<ToolCallResult, HostError> {
        if query.is_empty() {
            return Err(HostError::Failed("search query must not be empty".into()));
        }
        let target = self.resolve(directory.unwrap_or(".")).await?;
        self.policy.require(&CapabilityRequest::fs_read(&target.scope))?;

        let pattern = format!(
            "{}/**/{}",
            Pattern::escape(&target.absolute.to_string_lossy()),
            file_pattern.unwrap_or("*")
        );
        debug!(query, pattern = %pattern, "searching files");

        let root = self.root.clone();
        let policy = self.policy.clone();
        let query = query.to_string();
        let matches = tokio::task::spawn_blocking(move || grep(&root, &policy, &pattern, &query))
            .await
            .map_err(|e| HostError::Failed(format!("search task failed: {e}")))??;

        Ok(ToolCallResult::success(Value::Array(matches)))
    }
}

fn grep(
    root: &Path,
    policy: &Policy,
    pattern: &str,
    query: &str,
) -> Result<Vec<Value>, HostError> {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: true,
    };
    let paths = glob::glob_with(pattern, options)
        .map_err(|e| HostError::Failed(format!("invalid file pattern: {e}")))?;

    let mut matches = Vec::new();
    for path in paths.flatten() {
        let Ok(metadata) = std::fs::metadata(&path) else {
            continue;
        };
        if !metadata.is_file() || metadata.len() > MAX_SEARCH_FILE_SIZE {
            continue;
        }
        // Links inside the tree may point anywhere
        let Ok(real) = std::fs::canonicalize(&path) else {
            continue;
        };
        let scope = display_relative(root, &real);
        if !policy.check(&CapabilityRequest::fs_read(&scope)).is_allowed() {
            debug!(path = %scope, "search skipped file outside policy");
            continue;
        }
        // Binary and unreadable files are skipped
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };

        let file = display_relative(root, &path);
        for (index, line) in content.lines().enumerate() {
            if !line.contains(query) {
                continue;
            }
            matches.push(json!({
                "file": file,
                "line": index + 1,
                "text": line.trim_end(),
            }));
            if matches.len() >= MAX_SEARCH_RESULTS {
                debug!(limit = MAX_SEARCH_RESULTS, "search truncated");
                return Ok(matches);
            }
        }
    }
    Ok(matches)
}

/// Root-relative display form, or the full path when outside the root.
fn display_relative(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.display().to_string(),
        Err(_) => path.display().to_string(),
    }
}

/// Resolve symlinks along `path`. The part that does not exist yet is
/// appended to the real path of its deepest existing ancestor, and a
/// dangling link is followed to where it would create its target.
async fn real_path(path: &Path) -> io::Result<PathBuf> {
    let mut current = path.to_path_buf();
    let mut missing: Vec<OsString> = Vec::new();
    let mut hops = 0;
    loop {
        match tokio::fs::canonicalize(&current).await {
            Ok(mut real) => {
                real.extend(missing.iter().rev());
                return Ok(real);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Ok(target) = tokio::fs::read_link(&current).await {
                    hops += 1;
                    if hops > MAX_LINK_HOPS {
                        return Err(io::Error::other("too many levels of symbolic links"));
                    }
                    let parent = current.parent().map(Path::to_path_buf).unwrap_or_default();
                    current = normalize(&parent.join(target));
                    continue;
                }
                let Some(name) = current.file_name().map(|n| n.to_os_string()) else {
                    return Err(e);
                };
                missing.push(name);
                current.pop();
            }
            Err(e) => return Err(e),
        }
    }
}

/// Lexically normalize an absolute path: drop `.` and fold `..`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn host(dir: &TempDir, policy: Policy) -> LocalHost {
        LocalHost::builder(dir.path()).policy(policy).build().unwrap()
    }

    #[tokio::test]
    async fn write_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let host = host(&dir, Policy::restrictive());

        let written = host.write_file("notes/todo.txt", "ship it\n").await.unwrap();
        assert!(written.is_success());
        assert_eq!(written.data().unwrap()["path"], "notes/todo.txt");
        assert_eq!(written.data().unwrap()["bytes"], 8);

        let read = host.read_file("./notes/todo.txt").await.unwrap();
        assert_eq!(read.data(), Some(&json!("ship it\n")));
    }

    #[tokio::test]
    async fn read_missing_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let err = host(&dir, Policy::restrictive())
            .read_file("nope.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::Io { ref path, .. } if path == "nope.txt"));
    }

    #[tokio::test]
    async fn escaping_the_root_is_denied() {
        let dir = TempDir::new().unwrap();
        let err = host(&dir, Policy::restrictive())
            .read_file("../outside.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::Denied(_)));
    }

    #[tokio::test]
    async fn list_directory_is_sorted_and_repeatable() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "bb").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let host = host(&dir, Policy::restrictive());

        let first = host.list_directory(".").await.unwrap();
        let second = host.list_directory(".").await.unwrap();
        assert_eq!(first, second);

        let entries = first.data().unwrap().as_array().unwrap();
        let names: Vec<_> = entries.iter().map(|e| e["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["a.txt", "b.txt", "sub"]);
        assert_eq!(entries[1]["size"], 2);
        assert_eq!(entries[2]["isDirectory"], true);
    }

    #[tokio::test]
    async fn search_honours_file_pattern_and_skips_hidden() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/ui")).unwrap();
        std::fs::create_dir_all(dir.path().join(".cache")).unwrap();
        std::fs::write(dir.path().join("src/ui/App.tsx"), "import x\nconst [a] = useState()\n")
            .unwrap();
        std::fs::write(dir.path().join("src/notes.md"), "useState everywhere\n").unwrap();
        std::fs::write(dir.path().join(".cache/App.tsx"), "useState\n").unwrap();
        let host = host(&dir, Policy::restrictive());

        let result = host
            .search_files("useState", Some("src"), Some("*.tsx"))
            .await
            .unwrap();
        let matches = result.data().unwrap().as_array().unwrap().clone();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0]["file"], "src/ui/App.tsx");
        assert_eq!(matches[0]["line"], 2);

        let all = host.search_files("useState", None, None).await.unwrap();
        assert_eq!(all.data().unwrap().as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn restrictive_policy_blocks_commands() {
        let dir = TempDir::new().unwrap();
        let err = host(&dir, Policy::restrictive())
            .execute_command("echo hi", None)
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::Denied(_)));
    }

    #[tokio::test]
    async fn allowed_prefix_does_not_admit_chained_commands() {
        let dir = TempDir::new().unwrap();
        let policy = Policy::parse("[allow]\nexec = [\"git\"]\n").unwrap();
        let host = host(&dir, policy);
        for command in ["git status; echo x", "git --version || true && echo y"] {
            let err = host.execute_command(command, None).await.unwrap_err();
            assert!(matches!(err, HostError::Denied(_)), "{command}: {err}");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_out_of_the_root_are_denied() {
        use std::os::unix::fs::symlink;

        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "TOPSECRET\n").unwrap();
        let dir = TempDir::new().unwrap();
        symlink(outside.path().join("secret.txt"), dir.path().join("link")).unwrap();
        symlink(outside.path(), dir.path().join("elsewhere")).unwrap();
        symlink(outside.path().join("planted.txt"), dir.path().join("dangling")).unwrap();
        let host = host(&dir, Policy::restrictive());

        let err = host.read_file("link").await.unwrap_err();
        assert!(matches!(err, HostError::Denied(_)), "{err}");
        let err = host.list_directory("elsewhere").await.unwrap_err();
        assert!(matches!(err, HostError::Denied(_)), "{err}");
        let err = host.write_file("elsewhere/new.txt", "x").await.unwrap_err();
        assert!(matches!(err, HostError::Denied(_)), "{err}");
        let err = host.write_file("dangling", "x").await.unwrap_err();
        assert!(matches!(err, HostError::Denied(_)), "{err}");
        assert!(!outside.path().join("planted.txt").exists());

        let found = host.search_files("TOPSECRET", None, None).await.unwrap();
        assert_eq!(found.data(), Some(&json!([])));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_within_the_root_still_work() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("real.txt"), "inside").unwrap();
        symlink(dir.path().join("real.txt"), dir.path().join("alias.txt")).unwrap();
        let host = host(&dir, Policy::restrictive());

        let read = host.read_file("alias.txt").await.unwrap();
        assert_eq!(read.data(), Some(&json!("inside")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn working_directory_must_be_inside_policy() {
        use std::os::unix::fs::symlink;

        let outside = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        symlink(outside.path(), dir.path().join("out")).unwrap();
        let policy = Policy::parse("[allow]\nfs_read = [\".\"]\nexec = [\"pwd\"]\n").unwrap();
        let host = host(&dir, policy);

        let err = host.execute_command("pwd", Some("out")).await.unwrap_err();
        assert!(matches!(err, HostError::Denied(_)), "{err}");
        assert!(host.execute_command("pwd", Some(".")).await.unwrap().is_success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_output_and_exit_codes() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("work")).unwrap();
        let host = host(&dir, Policy::permissive());

        let ok = host.execute_command("pwd", Some("work")).await.unwrap();
        assert!(ok.is_success());
        assert!(ok.data().unwrap()["stdout"].as_str().unwrap().trim_end().ends_with("work"));
        assert_eq!(ok.data().unwrap()["exitCode"], 0);

        let failed = host.execute_command("echo oops >&2; exit 3", None).await.unwrap();
        assert!(!failed.is_success());
        assert_eq!(failed.error(), Some("Command failed with exit code 3: oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_timeout_is_reported() {
        let dir = TempDir::new().unwrap();
        let host = LocalHost::builder(dir.path())
            .policy(Policy::permissive())
            .command_timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let err = host.execute_command("sleep 5", None).await.unwrap_err();
        assert!(matches!(err, HostError::Timeout(_)));
    }
}
