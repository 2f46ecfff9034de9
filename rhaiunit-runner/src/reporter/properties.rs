// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Properties of the running process, recorded in XML reports.

use camino::Utf8PathBuf;
use std::{collections::BTreeMap, env, path::MAIN_SEPARATOR_STR};

const PATH_SEPARATOR: &str = if cfg!(windows) { ";" } else { ":" };
const LINE_SEPARATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Returns the properties of the current process, sorted by name.
pub fn system_properties() -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    let mut set = |name: &str, value: &str| {
        properties.insert(name.to_owned(), value.to_owned());
    };

    set("os.name", env::consts::OS);
    set("os.arch", env::consts::ARCH);
    set("os.family", env::consts::FAMILY);
    set("file.separator", MAIN_SEPARATOR_STR);
    set("path.separator", PATH_SEPARATOR);
    set("line.separator", LINE_SEPARATOR);
    set("rhaiunit.version", env!("CARGO_PKG_VERSION"));
    if let Some(dir) = env::current_dir()
        .ok()
        .and_then(|dir| Utf8PathBuf::try_from(dir).ok())
    {
        set("user.dir", dir.as_str());
    }

    properties
}
