// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for rhaiunit.
//!
//! Configuration is layered, with later layers taking precedence:
//!
//! 1. the default config bundled into the binary ([`RhaiUnitConfig::DEFAULT_CONFIG`]);
//! 2. `.config/rhaiunit.toml` in the working directory, if present;
//! 3. environment variables prefixed with `RHAIUNIT_`.
//!
//! Command-line directives such as `-todir` override the configured values for the rest of a run.

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind},
    sandbox::ResourceSet,
    stack_trace::StackTraceFilter,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Overall configuration for rhaiunit.
#[derive(Clone, Debug)]
pub struct RhaiUnitConfig {
    todir: Utf8PathBuf,
    resource_dirs: Vec<Utf8PathBuf>,
    stack_trace_filter: StackTraceFilter,
}

impl RhaiUnitConfig {
    /// The default location of the config within the working directory.
    pub const CONFIG_PATH: &'static str = ".config/rhaiunit.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Environment configuration uses this prefix, plus a _.
    pub const ENVIRONMENT_PREFIX: &'static str = "RHAIUNIT";

    /// Environment variables with the prefix that are not configuration.
    const RESERVED_ENV_VARS: &'static [&'static str] = &["RHAIUNIT_COLOR", "RHAIUNIT_LOG"];

    /// Keys whose environment values are lists, with the separator between items.
    ///
    /// Filters are regular expressions, which may contain commas, so they go one per line.
    const LIST_KEYS: &'static [(&'static str, char)] = &[
        ("resource-dirs", ','),
        ("stack-trace.extra-filters", '\n'),
    ];

    /// Reads the config from the working directory and the process environment.
    ///
    /// Unknown keys are logged as warnings.
    pub fn from_env(cwd: &Utf8Path) -> Result<Self, ConfigParseError> {
        // Variables that aren't valid UTF-8 can't name a config key.
        let env = std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)));
        Self::from_sources(cwd, None, env, &mut DefaultConfigWarnings)
    }

    /// Reads the config from the given sources.
    ///
    /// If `file` is `None`, the config is read from [`Self::CONFIG_PATH`] within `cwd`, if it
    /// exists. `env` supplies the environment variables to layer on top.
    pub fn from_sources(
        cwd: &Utf8Path,
        file: Option<&Utf8Path>,
        env: impl IntoIterator<Item = (String, String)>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = cwd.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let builder = Self::add_environment(builder, env)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        let (deserialized, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        if !unknown.is_empty() {
            warnings.unknown_config_keys(&config_file, &unknown);
        }

        let stack_trace_filter =
            StackTraceFilter::new(&deserialized.stack_trace.extra_filters)
                .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        Ok(Self {
            todir: absolutize(cwd, deserialized.todir),
            resource_dirs: deserialized
                .resource_dirs
                .into_iter()
                .map(|dir| absolutize(cwd, dir))
                .collect(),
            stack_trace_filter,
        })
    }

    /// The directory reports are written to until a `-todir` directive says otherwise.
    pub fn todir(&self) -> &Utf8Path {
        &self.todir
    }

    /// Extra directories searched by `load` and `readFile`.
    pub fn resource_dirs(&self) -> &[Utf8PathBuf] {
        &self.resource_dirs
    }

    /// Returns the resource set scripts resolve paths through.
    pub fn resource_set(&self) -> ResourceSet {
        ResourceSet::new().with_dirs(self.resource_dirs.iter().cloned())
    }

    /// The filter applied to stack dumps of failures.
    pub fn stack_trace_filter(&self) -> &StackTraceFilter {
        &self.stack_trace_filter
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// Applies `RHAIUNIT_*` variables as overrides.
    ///
    /// `__` separates nested keys and `_` stands for `-`, so `RHAIUNIT_STACK_TRACE__EXTRA_FILTERS`
    /// sets `stack-trace.extra-filters`. List values are split on the separator in
    /// [`Self::LIST_KEYS`].
    fn add_environment(
        mut builder: ConfigBuilder<DefaultState>,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigParseErrorKind> {
        let prefix = format!("{}_", Self::ENVIRONMENT_PREFIX);
        for (name, value) in env {
            if Self::RESERVED_ENV_VARS.contains(&name.as_str()) {
                continue;
            }
            let Some(key) = name.strip_prefix(&prefix) else {
                continue;
            };
            if key.is_empty() {
                continue;
            }
            let key = key
                .split("__")
                .map(|part| part.to_lowercase().replace('_', "-"))
                .join(".");

            let separator = Self::LIST_KEYS
                .iter()
                .find_map(|&(list_key, separator)| (list_key == key).then_some(separator));
            builder = match separator {
                Some(separator) => {
                    let list: Vec<String> = value
                        .split(separator)
                        .map(|item| item.trim_end_matches('\r'))
                        .filter(|item| !item.is_empty())
                        .map(str::to_owned)
                        .collect();
                    builder.set_override(key, list)
                }
                None => builder.set_override(key, value),
            }
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;
        }
        Ok(builder)
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(RhaiUnitConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: RhaiUnitConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // The config crate also reports the key. Drop it so it's only printed once.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

fn absolutize(cwd: &Utf8Path, path: Utf8PathBuf) -> Utf8PathBuf {
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

/// Trait for handling configuration warnings.
///
/// This trait allows for different warning handling strategies, such as logging warnings (the
/// default behavior) or collecting them for testing purposes.
pub trait ConfigWarnings {
    /// Handle unknown configuration keys found in a config file.
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>);
}

/// Default implementation of [`ConfigWarnings`] that logs warnings using the `tracing` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        let mut unknown_str = String::new();
        if unknown.len() == 1 {
            unknown_str.push_str("key: ");
            unknown_str.extend(unknown.iter().map(String::as_str));
        } else {
            unknown_str.push_str("keys:\n");
            for ignored_key in unknown {
                unknown_str.push_str("\n  - ");
                unknown_str.push_str(ignored_key);
            }
        }

        warn!("in config file {config_file}, ignoring unknown configuration {unknown_str}");
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RhaiUnitConfigDeserialize {
    todir: Utf8PathBuf,
    #[serde(default)]
    resource_dirs: Vec<Utf8PathBuf>,
    #[serde(default)]
    stack_trace: StackTraceConfigDeserialize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct StackTraceConfigDeserialize {
    #[serde(default)]
    extra_filters: Vec<String>,
}
