//! Directory-backed static mounts.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dispatch::handler::Handler;
use crate::error::RegistrationError;
use crate::http::static_files::StaticFileHandler;
use crate::routing::path::{eq_with_case, split_segments};
use crate::routing::route::{sub_domain_matches, ANY_SUBDOMAIN};

/// What to do with requests for files whose name starts with `.`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DotfilePolicy {
    /// Serve them like any other file.
    Allow,
    /// Answer with the unauthorized fallback.
    Deny,
    /// Pretend they do not exist.
    #[default]
    Ignore,
}

impl FromStr for DotfilePolicy {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            "ignore" => Ok(Self::Ignore),
            other => Err(RegistrationError::InvalidDotfilePolicy(other.to_string())),
        }
    }
}

impl fmt::Display for DotfilePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::Ignore => "ignore",
        })
    }
}

/// Registration options for [`StaticMount`].
#[derive(Debug, Clone, Default)]
pub struct StaticOptions {
    /// Mount point; `None` or `/` mounts at the root.
    pub path: Option<String>,
    /// Host label scope; `None` means `*`.
    pub sub_domain: Option<String>,
    /// Overrides the registry default when set.
    pub case_sensitive: Option<bool>,
    pub dotfiles: DotfilePolicy,
}

impl StaticOptions {
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn sub_domain(mut self, label: impl Into<String>) -> Self {
        self.sub_domain = Some(label.into());
        self
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = Some(yes);
        self
    }

    pub fn dotfiles(mut self, policy: DotfilePolicy) -> Self {
        self.dotfiles = policy;
        self
    }
}

/// A registered static mount. The root is validated once, here.
pub struct StaticMount {
    root: PathBuf,
    path: Vec<String>,
    sub_domain: String,
    case_sensitive: bool,
    dotfiles: DotfilePolicy,
    handler: Arc<dyn Handler>,
}

impl StaticMount {
    pub(crate) fn new(root: &Path, options: StaticOptions, default_case_sensitive: bool) -> Result<Self, RegistrationError> {
        let root = validate_root(root)?;
        let path = options.path.as_deref().map(split_segments).unwrap_or_default();
        let handler = Arc::new(StaticFileHandler::new(root.clone(), path.len(), options.dotfiles));

        Ok(Self {
            root,
            path,
            sub_domain: options.sub_domain.unwrap_or_else(|| ANY_SUBDOMAIN.to_string()),
            case_sensitive: options.case_sensitive.unwrap_or(default_case_sensitive),
            dotfiles: options.dotfiles,
            handler,
        })
    }

    /// Canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Mount point segments; empty when mounted at the root.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn sub_domain(&self) -> &str {
        &self.sub_domain
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn dotfiles(&self) -> DotfilePolicy {
        self.dotfiles
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Subdomain and mount-prefix test. Mounts accept every method; the
    /// file handler continues for anything but GET and HEAD.
    ///
    /// The prefix is compared whole segment by whole segment rather than as
    /// a joined string, so `/assets` matches `/assets/x` but not `/assetsx/y`.
    pub fn match_request(&self, sub_domain: Option<&str>, segments: &[String]) -> bool {
        if !sub_domain_matches(&self.sub_domain, sub_domain, self.case_sensitive) {
            return false;
        }
        if segments.is_empty() || segments.len() < self.path.len() {
            return false;
        }
        self.path
            .iter()
            .zip(segments)
            .all(|(mount, requested)| eq_with_case(mount, requested, self.case_sensitive))
    }
}

impl fmt::Debug for StaticMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticMount")
            .field("root", &self.root)
            .field("path", &self.path)
            .field("sub_domain", &self.sub_domain)
            .field("case_sensitive", &self.case_sensitive)
            .field("dotfiles", &self.dotfiles)
            .finish_non_exhaustive()
    }
}

fn validate_root(root: &Path) -> Result<PathBuf, RegistrationError> {
    let metadata = fs::metadata(root).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RegistrationError::RootNotFound(root.to_path_buf()),
        _ => RegistrationError::RootUnreadable {
            path: root.to_path_buf(),
            source: e,
        },
    })?;
    if !metadata.is_dir() {
        return Err(RegistrationError::RootNotDirectory(root.to_path_buf()));
    }

    // Listing proves the directory is readable by this process.
    fs::read_dir(root).map_err(|source| RegistrationError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    fs::canonicalize(root).map_err(|source| RegistrationError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("waypoint-mount-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn segs(path: &str) -> Vec<String> {
        split_segments(path)
    }

    #[test]
    fn test_dotfile_policy_parse() {
        assert_eq!("deny".parse::<DotfilePolicy>().unwrap(), DotfilePolicy::Deny);
        assert_eq!("allow".parse::<DotfilePolicy>().unwrap(), DotfilePolicy::Allow);
        assert_eq!("ignore".parse::<DotfilePolicy>().unwrap(), DotfilePolicy::Ignore);
        assert!(matches!(
            "hide".parse::<DotfilePolicy>(),
            Err(RegistrationError::InvalidDotfilePolicy(_))
        ));
    }

    #[test]
    fn test_missing_root_rejected() {
        let missing = std::env::temp_dir().join(format!("waypoint-missing-{}", uuid::Uuid::new_v4()));
        assert!(matches!(
            StaticMount::new(&missing, StaticOptions::default(), false),
            Err(RegistrationError::RootNotFound(_))
        ));
    }

    #[test]
    fn test_file_root_rejected() {
        let root = temp_root();
        let file = root.join("plain.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            StaticMount::new(&file, StaticOptions::default(), false),
            Err(RegistrationError::RootNotDirectory(_))
        ));
    }

    #[test]
    fn test_prefix_matching() {
        let root = temp_root();
        let mount = StaticMount::new(&root, StaticOptions::default().path("/assets"), false).unwrap();
        assert!(mount.match_request(None, &segs("/assets/logo.png")));
        assert!(mount.match_request(None, &segs("/ASSETS/logo.png")));
        assert!(mount.match_request(None, &segs("/assets")));
        assert!(!mount.match_request(None, &segs("/assetsx/logo.png")));
        assert!(!mount.match_request(None, &segs("/other/logo.png")));
        assert!(!mount.match_request(None, &segs("/")));

        let strict = StaticMount::new(&root, StaticOptions::default().path("/assets").case_sensitive(true), false).unwrap();
        assert!(!strict.match_request(None, &segs("/ASSETS/logo.png")));
    }

    #[test]
    fn test_root_mount_matches_any_non_empty_path() {
        let root = temp_root();
        let mount = StaticMount::new(&root, StaticOptions::default(), false).unwrap();
        assert!(mount.path().is_empty());
        assert!(mount.match_request(None, &segs("/a")));
        assert!(mount.match_request(None, &segs("/a/b/c")));
        assert!(!mount.match_request(None, &[]));
    }

    #[test]
    fn test_sub_domain_scope() {
        let root = temp_root();
        let mount = StaticMount::new(&root, StaticOptions::default().sub_domain("cdn"), false).unwrap();
        assert!(mount.match_request(Some("cdn"), &segs("/a")));
        assert!(mount.match_request(Some("CDN"), &segs("/a")));
        assert!(!mount.match_request(Some("www"), &segs("/a")));
        assert!(mount.match_request(None, &segs("/a")));
    }
}
