// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::LazyLock;
use swrite::{SWrite, swrite};

static SHORT: LazyLock<String> = LazyLock::new(|| VersionInfo::new().to_short_string());
static LONG: LazyLock<String> = LazyLock::new(|| VersionInfo::new().to_long_string());

/// The version printed by `-V`.
pub(crate) fn short() -> &'static str {
    &SHORT
}

/// The version printed by `--version`.
pub(crate) fn long() -> &'static str {
    &LONG
}

struct VersionInfo {
    /// rhaiunit's version.
    version: &'static str,

    /// The operating system and architecture this binary was built for.
    host: (&'static str, &'static str),
}

impl VersionInfo {
    const fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            host: (std::env::consts::OS, std::env::consts::ARCH),
        }
    }

    fn to_short_string(&self) -> String {
        self.version.to_owned()
    }

    fn to_long_string(&self) -> String {
        let mut s = self.to_short_string();
        swrite!(s, "\nrelease: {}", self.version);
        swrite!(s, "\nhost: {}-{}", self.host.1, self.host.0);
        s
    }
}
