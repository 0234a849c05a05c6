//! Opposed reconstruction configuration

use tracing::warn;

/// Perceptual compression exponent used when none is configured.
pub const DEFAULT_POWER: f32 = 3.0;

/// Configuration for an opposed highlight processor
#[derive(Debug, Clone)]
pub struct OpposedConfig {
    /// Exponent `P` of the cube space reference averages are taken in
    pub power: f32,
    /// Run the mask and chrominance passes; when false only the cached correction is applied
    pub quality: bool,
    /// Return the reconstructed input-sized frame alongside the output
    pub keep_input_copy: bool,
}

impl Default for OpposedConfig {
    fn default() -> Self {
        Self {
            power: DEFAULT_POWER,
            quality: true,
            keep_input_copy: false,
        }
    }
}

/// Returns `power` when it is a usable exponent, `DEFAULT_POWER` otherwise.
pub fn effective_power(power: f32) -> f32 {
    if power.is_finite() && power > 0.0 {
        power
    } else {
        warn!(power, fallback = DEFAULT_POWER, "Invalid reconstruction exponent");
        DEFAULT_POWER
    }
}

impl OpposedConfig {
    pub fn builder() -> OpposedConfigBuilder {
        OpposedConfigBuilder::default()
    }
}

/// Builder for OpposedConfig
#[derive(Default)]
pub struct OpposedConfigBuilder {
    power: Option<f32>,
    quality: Option<bool>,
    keep_input_copy: Option<bool>,
}

impl OpposedConfigBuilder {
    pub fn power(mut self, power: f32) -> Self {
        self.power = Some(power);
        self
    }

    pub fn quality(mut self, quality: bool) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn keep_input_copy(mut self, keep: bool) -> Self {
        self.keep_input_copy = Some(keep);
        self
    }

    pub fn build(self) -> OpposedConfig {
        let default = OpposedConfig::default();
        OpposedConfig {
            power: self.power.map_or(default.power, effective_power),
            quality: self.quality.unwrap_or(default.quality),
            keep_input_copy: self.keep_input_copy.unwrap_or(default.keep_input_copy),
        }
    }
}
