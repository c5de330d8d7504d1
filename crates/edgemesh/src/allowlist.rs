//! Fixed set of permitted command aliases, mapped to OS-specific executables
//! with argument validation.

use crate::error::DomainError;

/// An executable invocation resolved from a user-level command alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Validates `command`/`args` against the allowlist and resolves the
/// OS-specific executable to run. Returns a human-readable rejection
/// reason on policy violation.
pub fn validate_command(command: &str, args: &[String]) -> Result<ResolvedCommand, DomainError> {
    match command {
        "pwd" => Ok(resolve_pwd()),
        "ls" => Ok(resolve_ls(args)),
        "cat" => resolve_cat(args),
        other => Err(DomainError::policy_rejected(format!("command '{other}' is not allowlisted"))),
    }
}

#[cfg(windows)]
fn resolve_pwd() -> ResolvedCommand {
    ResolvedCommand { program: "cmd".to_string(), args: vec!["/c".to_string(), "cd".to_string()] }
}

#[cfg(not(windows))]
fn resolve_pwd() -> ResolvedCommand {
    ResolvedCommand { program: "pwd".to_string(), args: vec![] }
}

#[cfg(windows)]
fn resolve_ls(args: &[String]) -> ResolvedCommand {
    let mut full = vec!["/c".to_string(), "dir".to_string()];
    full.extend(args.iter().cloned());
    ResolvedCommand { program: "cmd".to_string(), args: full }
}

#[cfg(not(windows))]
fn resolve_ls(args: &[String]) -> ResolvedCommand {
    let mut full = vec!["-la".to_string()];
    full.extend(args.iter().cloned());
    ResolvedCommand { program: "ls".to_string(), args: full }
}

/// Each `cat` path must be relative, contain no `..` component, and have a
/// cleaned form starting with `shared/` or equal to `shared`.
fn resolve_cat(paths: &[String]) -> Result<ResolvedCommand, DomainError> {
    if paths.is_empty() {
        return Err(DomainError::policy_rejected("cat requires at least one path"));
    }

    for path in paths {
        validate_shared_path(path)?;
    }

    #[cfg(windows)]
    {
        let mut full = vec!["/c".to_string(), "type".to_string()];
        full.extend(paths.iter().cloned());
        Ok(ResolvedCommand { program: "cmd".to_string(), args: full })
    }
    #[cfg(not(windows))]
    {
        Ok(ResolvedCommand { program: "cat".to_string(), args: paths.to_vec() })
    }
}

fn validate_shared_path(path: &str) -> Result<(), DomainError> {
    let raw = std::path::Path::new(path);
    if raw.is_absolute() {
        return Err(DomainError::policy_rejected(format!("path '{path}' must be relative")));
    }

    let mut cleaned = Vec::new();
    for component in raw.components() {
        match component {
            std::path::Component::ParentDir => {
                return Err(DomainError::policy_rejected(format!("path '{path}' may not contain '..'")));
            }
            std::path::Component::Normal(part) => cleaned.push(part.to_string_lossy().to_string()),
            std::path::Component::CurDir => {}
            _ => return Err(DomainError::policy_rejected(format!("path '{path}' is not a simple relative path"))),
        }
    }

    let cleaned = cleaned.join("/");
    if cleaned == "shared" || cleaned.starts_with("shared/") {
        Ok(())
    } else {
        Err(DomainError::policy_rejected(format!("path '{path}' escapes the shared/ root")))
    }
}

#[path = "allowlist_tests.rs"]
#[cfg(test)]
mod allowlist_tests;
