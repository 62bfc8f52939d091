//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module is the **single doorway** to Git in gozer. It answers the
//! handful of questions the build pipeline asks about the working copy:
//! which commit is checked out, which tags point at it, and where it came
//! from.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::NoHead`]: HEAD does not point at a commit yet
//! - [`GitError::UnknownRemoteScheme`]: Remote URL is not https or scp-style
//!
//! # Example
//!
//! ```ignore
//! use gozer::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! println!("HEAD is {}", git.short_head()?);
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// HEAD is unborn or detached from any commit.
    #[error("HEAD does not point at a commit")]
    NoHead,

    /// The repository has no remote to derive a name from.
    #[error("repository has no remote configured")]
    NoRemote,

    /// The remote URL is in a form we cannot take a name from.
    #[error("unknown git remote scheme: {url}")]
    UnknownRemoteScheme {
        /// The remote URL
        url: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

/// A tag pointing at HEAD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    /// Short tag name (without `refs/tags/`)
    pub name: String,
    /// First line of the tag message for annotated tags
    pub annotation: Option<String>,
}

/// Git repository interface.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover` to find the repository root,
    /// so `path` can be any directory within the repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Working directory of the repository.
    pub fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    fn head_commit(&self) -> Result<git2::Commit<'_>, GitError> {
        let head = self.repo.head().map_err(|_| GitError::NoHead)?;
        head.peel_to_commit().map_err(|_| GitError::NoHead)
    }

    /// Full hex id of the commit at HEAD.
    pub fn head_id(&self) -> Result<String, GitError> {
        Ok(self.head_commit()?.id().to_string())
    }

    /// Abbreviated id of the commit at HEAD, as `git rev-parse --short HEAD`
    /// prints it.
    pub fn short_head(&self) -> Result<String, GitError> {
        let commit = self.head_commit()?;
        let short = commit.as_object().short_id()?;
        short
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| GitError::Internal {
                message: "short commit id is not valid UTF-8".to_string(),
            })
    }

    /// Tags pointing at HEAD, in name order.
    ///
    /// Annotated tags carry the first non-empty line of their message;
    /// lightweight tags carry none.
    pub fn tags_at_head(&self) -> Result<Vec<TagInfo>, GitError> {
        let head = self.head_commit()?.id();
        let names = self.repo.tag_names(None)?;

        let mut tags = Vec::new();
        for name in names.iter().flatten() {
            let object = self.repo.revparse_single(&format!("refs/tags/{}", name))?;
            let points_at_head = object
                .peel_to_commit()
                .map(|c| c.id() == head)
                .unwrap_or(false);
            if !points_at_head {
                continue;
            }

            let annotation = object
                .as_tag()
                .and_then(|tag| tag.message())
                .and_then(|msg| msg.lines().map(str::trim).find(|l| !l.is_empty()))
                .map(str::to_string);

            tags.push(TagInfo {
                name: name.to_string(),
                annotation,
            });
        }
        Ok(tags)
    }

    /// Get the URL for a remote.
    ///
    /// Returns `None` if the remote doesn't exist.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get the default remote name (usually "origin").
    ///
    /// Returns the first remote found, or `None` if no remotes exist.
    pub fn default_remote(&self) -> Result<Option<String>, GitError> {
        let remotes = self.repo.remotes()?;

        // Prefer "origin" if it exists
        for name in remotes.iter().flatten() {
            if name == "origin" {
                return Ok(Some(name.to_string()));
            }
        }

        Ok(remotes.iter().flatten().next().map(String::from))
    }

    /// URL of the default remote, if any.
    pub fn origin_url(&self) -> Result<Option<String>, GitError> {
        match self.default_remote()? {
            Some(name) => self.remote_url(&name),
            None => Ok(None),
        }
    }

    /// Derive the repository name from a remote URL.
    ///
    /// Takes the last path segment, drops a trailing `.git`, and lowercases
    /// the result so it is usable as an image repository name.
    ///
    /// # Example
    ///
    /// ```
    /// use gozer::git::Git;
    ///
    /// assert_eq!(
    ///     Git::repo_name_from_remote("https://github.com/acme/Web-App.git").unwrap(),
    ///     "web-app"
    /// );
    /// assert_eq!(
    ///     Git::repo_name_from_remote("git@github.com:acme/api.git").unwrap(),
    ///     "api"
    /// );
    /// assert!(Git::repo_name_from_remote("/srv/git/api.git").is_err());
    /// ```
    pub fn repo_name_from_remote(url: &str) -> Result<String, GitError> {
        let unknown = || GitError::UnknownRemoteScheme {
            url: url.to_string(),
        };

        let path = if let Some(rest) = ["https://", "http://", "ssh://"]
            .iter()
            .find_map(|scheme| url.strip_prefix(scheme))
        {
            rest.split_once('/').map(|(_, path)| path).ok_or_else(unknown)?
        } else if url.starts_with("git@") {
            url.split_once(':').map(|(_, path)| path).ok_or_else(unknown)?
        } else {
            return Err(unknown());
        };

        let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
        let name = last.strip_suffix(".git").unwrap_or(last);
        if name.is_empty() {
            return Err(unknown());
        }
        Ok(name.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod git_error {
        use super::*;

        #[test]
        fn error_display_formatting() {
            let err = GitError::UnknownRemoteScheme {
                url: "file:///x".to_string(),
            };
            assert!(err.to_string().contains("file:///x"));
            assert!(GitError::NoHead.to_string().contains("HEAD"));
        }
    }

    mod repo_name {
        use super::*;

        #[test]
        fn https_forms() {
            assert_eq!(
                Git::repo_name_from_remote("https://github.com/foobar/bargaz.git").unwrap(),
                "bargaz"
            );
            assert_eq!(
                Git::repo_name_from_remote("https://gitlab.example.com/group/sub/proj").unwrap(),
                "proj"
            );
            assert_eq!(
                Git::repo_name_from_remote("https://github.com/foobar/bargaz/").unwrap(),
                "bargaz"
            );
        }

        #[test]
        fn scp_forms() {
            assert_eq!(
                Git::repo_name_from_remote("git@github.com:foobar/bargaz.git").unwrap(),
                "bargaz"
            );
            assert_eq!(
                Git::repo_name_from_remote("git@host:solo.git").unwrap(),
                "solo"
            );
        }

        #[test]
        fn ssh_scheme() {
            assert_eq!(
                Git::repo_name_from_remote("ssh://git@host:22/team/svc.git").unwrap(),
                "svc"
            );
        }

        #[test]
        fn unknown_schemes_rejected() {
            for url in ["", "file:///srv/x.git", "/srv/x.git", "https://host", "git@host"] {
                assert!(
                    matches!(
                        Git::repo_name_from_remote(url),
                        Err(GitError::UnknownRemoteScheme { .. })
                    ),
                    "expected rejection for {:?}",
                    url
                );
            }
        }

        #[test]
        fn bare_dot_git_is_rejected() {
            assert!(Git::repo_name_from_remote("https://host/team/.git").is_err());
        }
    }
}
