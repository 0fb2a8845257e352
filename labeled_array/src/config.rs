/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Engine configuration.
//!
//! Configuration is resolved from layers, highest priority first:
//!
//! 1. test overrides pushed through [`global::ConfigLock`],
//! 2. environment variables ([`DEFAULT_BINS_ENV`],
//!    [`EDGE_PADDING_ENV`]),
//! 3. a YAML file loaded with [`global::init_from_yaml`],
//! 4. the defaults of [`EngineConfig`].
//!
//! Each layer may set any subset of the fields. The environment
//! layer is read when the configuration is first used and again on
//! every [`global::init_from_env`].

use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

/// Environment variable overriding [`EngineConfig::default_bin_count`].
pub const DEFAULT_BINS_ENV: &str = "LABELED_ARRAY_DEFAULT_BINS";

/// Environment variable overriding [`EngineConfig::edge_padding`].
pub const EDGE_PADDING_ENV: &str = "LABELED_ARRAY_EDGE_PADDING";

/// The type of error for configuration loading.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Resolved engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bin count used when histogramming with automatic binning.
    pub default_bin_count: usize,
    /// Padding, in bin widths, added on each side of the data range
    /// by automatic bin edges.
    pub edge_padding: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_bin_count: 256,
            edge_padding: 0.5,
        }
    }
}

/// One configuration layer. Unset fields defer to lower layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub default_bin_count: Option<usize>,
    pub edge_padding: Option<f64>,
}

impl ConfigLayer {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_bin_count == Some(0) {
            return Err(ConfigError::Invalid {
                key: "default_bin_count",
                reason: "must be positive".to_string(),
            });
        }
        if let Some(padding) = self.edge_padding {
            if !padding.is_finite() || padding < 0.0 {
                return Err(ConfigError::Invalid {
                    key: "edge_padding",
                    reason: format!("must be a non-negative number, got {}", padding),
                });
            }
        }
        Ok(())
    }

    fn apply(&self, config: &mut EngineConfig) {
        if let Some(n) = self.default_bin_count {
            config.default_bin_count = n;
        }
        if let Some(p) = self.edge_padding {
            config.edge_padding = p;
        }
    }
}

/// Read the environment layer. Values that fail to parse or validate
/// are logged and ignored.
pub fn from_env() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    if let Ok(raw) = std::env::var(DEFAULT_BINS_ENV) {
        match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => layer.default_bin_count = Some(n),
            _ => tracing::error!(
                var = DEFAULT_BINS_ENV,
                value = %raw,
                "invalid bin count, keeping default"
            ),
        }
    }
    if let Ok(raw) = std::env::var(EDGE_PADDING_ENV) {
        match raw.trim().parse::<f64>() {
            Ok(p) if p.is_finite() && p >= 0.0 => layer.edge_padding = Some(p),
            _ => tracing::error!(
                var = EDGE_PADDING_ENV,
                value = %raw,
                "invalid edge padding, keeping default"
            ),
        }
    }
    layer
}

/// Read a configuration layer from a YAML file.
pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<ConfigLayer, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let layer: ConfigLayer = serde_yaml::from_str(&text)?;
    layer.validate()?;
    Ok(layer)
}

/// Process-wide configuration state.
pub mod global {
    use std::marker::PhantomData;
    use std::path::Path;
    use std::sync::LazyLock;
    use std::sync::atomic::AtomicU64;
    use std::sync::atomic::Ordering;

    use parking_lot::Mutex;
    use parking_lot::MutexGuard;
    use parking_lot::RwLock;

    use super::ConfigError;
    use super::ConfigLayer;
    use super::EngineConfig;

    struct Layers {
        overrides: Vec<(u64, ConfigLayer)>,
        env: ConfigLayer,
        file: ConfigLayer,
    }

    static LAYERS: LazyLock<RwLock<Layers>> = LazyLock::new(|| {
        RwLock::new(Layers {
            overrides: Vec::new(),
            env: super::from_env(),
            file: ConfigLayer::default(),
        })
    });

    static OVERRIDE_TOKEN_SEQ: AtomicU64 = AtomicU64::new(0);

    /// The effective configuration.
    pub fn get() -> EngineConfig {
        let layers = LAYERS.read();
        let mut config = EngineConfig::default();
        layers.file.apply(&mut config);
        layers.env.apply(&mut config);
        for (_, layer) in &layers.overrides {
            layer.apply(&mut config);
        }
        config
    }

    /// Re-read the environment layer.
    pub fn init_from_env() {
        let env = super::from_env();
        tracing::info!(?env, "loaded configuration from environment");
        LAYERS.write().env = env;
    }

    /// Install the YAML file at `path` as the file layer, replacing
    /// any previously loaded file.
    pub fn init_from_yaml<P: AsRef<Path>>(path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let file = super::from_yaml(path)?;
        tracing::info!(path = %path.display(), ?file, "loaded configuration file");
        LAYERS.write().file = file;
        Ok(())
    }

    /// Drop the file and environment layers.
    ///
    /// Should be called while holding [`lock`] in tests.
    pub fn reset_to_defaults() {
        let mut layers = LAYERS.write();
        layers.env = ConfigLayer::default();
        layers.file = ConfigLayer::default();
    }

    /// Acquire the global configuration lock.
    ///
    /// The lock serializes mutations of the global configuration.
    /// Tests hold it to push overrides via
    /// [`ConfigLock::override_config`], and to read configuration
    /// without racing tests that do.
    ///
    /// ```
    /// use labeled_array::config::ConfigLayer;
    /// use labeled_array::config::global;
    ///
    /// let lock = global::lock();
    /// let _guard = lock.override_config(ConfigLayer {
    ///     default_bin_count: Some(8),
    ///     ..Default::default()
    /// });
    /// assert_eq!(global::get().default_bin_count, 8);
    /// ```
    pub fn lock() -> ConfigLock {
        static MUTEX: Mutex<()> = Mutex::new(());
        ConfigLock {
            _guard: MUTEX.lock(),
        }
    }

    /// A guard holding the global configuration lock. Overrides can
    /// only be created through it and cannot outlive it.
    pub struct ConfigLock {
        _guard: MutexGuard<'static, ()>,
    }

    impl ConfigLock {
        /// Push `layer` on top of every other layer until the returned
        /// guard is dropped.
        pub fn override_config(&self, layer: ConfigLayer) -> ConfigOverrideGuard<'_> {
            let token = OVERRIDE_TOKEN_SEQ.fetch_add(1, Ordering::Relaxed);
            LAYERS.write().overrides.push((token, layer));
            ConfigOverrideGuard {
                token,
                _phantom: PhantomData,
            }
        }
    }

    /// Removes every override that is still active.
    impl Drop for ConfigLock {
        fn drop(&mut self) {
            LAYERS.write().overrides.clear();
        }
    }

    /// Restores the configuration when dropped.
    pub struct ConfigOverrideGuard<'a> {
        token: u64,
        _phantom: PhantomData<&'a ()>,
    }

    impl Drop for ConfigOverrideGuard<'_> {
        fn drop(&mut self) {
            LAYERS.write().overrides.retain(|(t, _)| *t != self.token);
        }
    }
}
