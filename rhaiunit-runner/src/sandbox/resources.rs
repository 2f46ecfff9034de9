// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolving script paths through the filesystem and the bundled resource namespace.

use crate::errors::ResourceError;
use camino::{Utf8Path, Utf8PathBuf};
use std::{collections::BTreeMap, fmt, io};
use tracing::debug;

/// The bootstrap script, bundled into the binary.
pub const BOOTSTRAP_SOURCE: &str = include_str!("../../resources/rhaiunit.rhai");

/// The resource key the bootstrap script is bundled under.
pub const BOOTSTRAP_KEY: &str = "/rhaiunit.rhai";

/// Where a resolved resource was found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceLocation {
    /// A file, relative to the working directory or absolute.
    File(Utf8PathBuf),

    /// A resource bundled into the binary.
    Bundled(&'static str),

    /// A file under a resource directory.
    ResourceDir(Utf8PathBuf),
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) | Self::ResourceDir(path) => write!(f, "{path}"),
            Self::Bundled(key) => write!(f, "resource:{key}"),
        }
    }
}

/// A resolved resource along with its text.
#[derive(Clone, Debug)]
pub struct Resource {
    location: ResourceLocation,
    text: String,
}

impl Resource {
    /// Where the resource was found.
    pub fn location(&self) -> &ResourceLocation {
        &self.location
    }

    /// The text of the resource. Invalid UTF-8 is replaced.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes self, returning the text.
    pub fn into_text(self) -> String {
        self.text
    }
}

/// The set of places `load` and `readFile` look for files.
///
/// A path is resolved, in order:
///
/// 1. as a filesystem path, relative to the working directory;
/// 2. as a resource key, exactly as given;
/// 3. if it does not start with `/`, as a resource key with `/` prepended.
///
/// Resource keys are looked up among bundled resources first, then under each resource directory
/// in order: the key `/a/b.rhai` maps to `<dir>/a/b.rhai`.
#[derive(Clone, Debug)]
pub struct ResourceSet {
    bundled: BTreeMap<&'static str, &'static str>,
    dirs: Vec<Utf8PathBuf>,
}

impl ResourceSet {
    /// Creates a resource set with only the bundled resources.
    pub fn new() -> Self {
        let mut bundled = BTreeMap::new();
        bundled.insert(BOOTSTRAP_KEY, BOOTSTRAP_SOURCE);
        Self {
            bundled,
            dirs: Vec::new(),
        }
    }

    /// Adds resource directories, searched after the bundled resources.
    pub fn with_dirs(mut self, dirs: impl IntoIterator<Item = Utf8PathBuf>) -> Self {
        self.dirs.extend(dirs);
        self
    }

    /// Resolves a path, returning the resource text.
    pub fn resolve(&self, path: &str) -> Result<Resource, ResourceError> {
        let file = Utf8Path::new(path);
        if file.is_file() {
            return read_file(file.to_owned(), ResourceLocation::File);
        }

        if let Some(resource) = self.lookup_key(path)? {
            return Ok(resource);
        }

        if !path.starts_with('/') {
            let key = format!("/{path}");
            if let Some(resource) = self.lookup_key(&key)? {
                return Ok(resource);
            }
        }

        debug!("could not resolve `{path}`");
        Err(ResourceError::NotFound {
            path: path.to_owned(),
        })
    }

    fn lookup_key(&self, key: &str) -> Result<Option<Resource>, ResourceError> {
        if let Some((&key, &text)) = self.bundled.get_key_value(key) {
            return Ok(Some(Resource {
                location: ResourceLocation::Bundled(key),
                text: text.to_owned(),
            }));
        }

        // Keys are rooted at `/`.
        let Some(relative) = key.strip_prefix('/') else {
            return Ok(None);
        };
        if relative.is_empty() {
            return Ok(None);
        }

        for dir in &self.dirs {
            let candidate = dir.join(relative);
            if candidate.is_file() {
                return read_file(candidate, ResourceLocation::ResourceDir).map(Some);
            }
        }

        Ok(None)
    }
}

impl Default for ResourceSet {
    fn default() -> Self {
        Self::new()
    }
}

fn read_file(
    path: Utf8PathBuf,
    location: impl FnOnce(Utf8PathBuf) -> ResourceLocation,
) -> Result<Resource, ResourceError> {
    let bytes = std::fs::read(&path).map_err(|err| read_error(&path, err))?;
    debug!("resolved `{path}` ({} bytes)", bytes.len());
    Ok(Resource {
        text: String::from_utf8_lossy(&bytes).into_owned(),
        location: location(path),
    })
}

fn read_error(path: &Utf8Path, err: io::Error) -> ResourceError {
    ResourceError::Read {
        path: path.to_owned(),
        err,
    }
}
