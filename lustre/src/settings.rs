use crate::{gpu, Error, Result};

/// Tunables of the accumulation and denoising pipeline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settings {
    pub denoising: DenoisingSettings,
    pub reprojection: ReprojectionSettings,

    /// When set, game cameras stop tracing new samples once the frame index
    /// reaches this value and keep re-presenting their history instead
    pub progressive_frame_cap: Option<u32>,
}

impl Settings {
    /// Highest supported sample count; larger integers are no longer exactly
    /// representable by the half-float count buffers.
    pub const MAX_SAMPLE_COUNT: u32 = 2048;

    /// Highest supported number of denoising passes.
    pub const MAX_DENOISING_PASSES: u32 = 8;

    pub fn validate(&self) -> Result<()> {
        let d = &self.denoising;
        let r = &self.reprojection;

        if d.passes > Self::MAX_DENOISING_PASSES {
            return Err(invalid(format!(
                "denoising.passes must be at most {}, got {}",
                Self::MAX_DENOISING_PASSES,
                d.passes
            )));
        }

        for (name, value) in [
            ("denoising.spatial_sigma", d.spatial_sigma),
            ("denoising.color_sigma", d.color_sigma),
            ("denoising.base_color_sigma", d.base_color_sigma),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        if !(d.normal_sigma.is_finite() && d.normal_sigma >= 0.0) {
            return Err(invalid(format!(
                "denoising.normal_sigma must be non-negative, got {}",
                d.normal_sigma
            )));
        }

        if !(0.0..=1.0).contains(&d.high_pass_strength) {
            return Err(invalid(format!(
                "denoising.high_pass_strength must lie in [0, 1], got {}",
                d.high_pass_strength
            )));
        }

        if !(-1.0..=1.0).contains(&r.normal_threshold) {
            return Err(invalid(format!(
                "reprojection.normal_threshold must lie in [-1, 1], got {}",
                r.normal_threshold
            )));
        }

        if !(r.base_color_threshold.is_finite()
            && r.base_color_threshold >= 0.0)
        {
            return Err(invalid(format!(
                "reprojection.base_color_threshold must be non-negative, got \
                 {}",
                r.base_color_threshold
            )));
        }

        if !(1..=Self::MAX_SAMPLE_COUNT).contains(&r.max_sample_count) {
            return Err(invalid(format!(
                "reprojection.max_sample_count must lie in [1, {}], got {}",
                Self::MAX_SAMPLE_COUNT,
                r.max_sample_count
            )));
        }

        if self.progressive_frame_cap == Some(0) {
            return Err(invalid("progressive_frame_cap must be non-zero"));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DenoisingSettings {
    /// Number of à-trous passes; the n-th pass uses stride `2^n`
    pub passes: u32,

    /// Standard deviation of the spatial term, measured in taps
    pub spatial_sigma: f32,

    /// Standard deviation of the color-similarity term
    pub color_sigma: f32,

    /// Exponent of the normal-similarity term
    pub normal_sigma: f32,

    /// Standard deviation of the base-color-similarity term
    pub base_color_sigma: f32,

    /// How much of the raw color is blended back into the denoised one,
    /// once all passes are done; `0.0` means fully filtered, `1.0` means
    /// unfiltered
    pub high_pass_strength: f32,
}

impl DenoisingSettings {
    /// Returns parameters of the n-th pass.
    ///
    /// High-pass strength is carried only by the last pass, so that the
    /// blend toward the raw color doesn't compound across passes.
    pub fn pass_params(&self, nth: u32) -> gpu::DenoisingPassParams {
        let high_pass_strength = if nth + 1 == self.passes {
            self.high_pass_strength
        } else {
            0.0
        };

        gpu::DenoisingPassParams {
            stride: 1 << nth,
            spatial_sigma: self.spatial_sigma,
            color_sigma: self.color_sigma,
            normal_sigma: self.normal_sigma,
            base_color_sigma: self.base_color_sigma,
            high_pass_strength,
            ..Default::default()
        }
    }
}

impl Default for DenoisingSettings {
    fn default() -> Self {
        Self {
            passes: 3,
            spatial_sigma: 1.0,
            color_sigma: 0.6,
            normal_sigma: 64.0,
            base_color_sigma: 0.1,
            high_pass_strength: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReprojectionSettings {
    /// Minimum cosine between current and history normal for the history to
    /// be reused
    pub normal_threshold: f32,

    /// Maximum distance between current and history base color for the
    /// history to be reused
    pub base_color_threshold: f32,

    pub max_sample_count: u32,
}

impl ReprojectionSettings {
    pub fn params(&self) -> gpu::ReprojectionPassParams {
        gpu::ReprojectionPassParams {
            normal_threshold: self.normal_threshold,
            base_color_threshold: self.base_color_threshold,
            max_sample_count: self.max_sample_count as f32,
            ..Default::default()
        }
    }
}

impl Default for ReprojectionSettings {
    fn default() -> Self {
        Self {
            normal_threshold: 0.9,
            base_color_threshold: 0.1,
            max_sample_count: 256,
        }
    }
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidSettings(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let target = Settings::default();

        assert!(target.validate().is_ok());
        assert_eq!(3, target.denoising.passes);
        assert_eq!(0.9, target.reprojection.normal_threshold);
        assert_eq!(0.1, target.reprojection.base_color_threshold);
        assert_eq!(256, target.reprojection.max_sample_count);
        assert_eq!(None, target.progressive_frame_cap);
    }

    #[test]
    fn pass_params() {
        let target = DenoisingSettings::default();

        let strides: Vec<_> =
            (0..3).map(|nth| target.pass_params(nth).stride).collect();

        assert_eq!(vec![1, 2, 4], strides);
        assert_eq!(0.0, target.pass_params(2).high_pass_strength);

        // ---

        let target = DenoisingSettings {
            high_pass_strength: 0.5,
            ..Default::default()
        };

        let strengths: Vec<_> = (0..3)
            .map(|nth| target.pass_params(nth).high_pass_strength)
            .collect();

        assert_eq!(vec![0.0, 0.0, 0.5], strengths);
    }

    #[test]
    fn validate() {
        fn check(f: impl FnOnce(&mut Settings)) -> bool {
            let mut settings = Settings::default();

            f(&mut settings);

            matches!(settings.validate(), Err(Error::InvalidSettings(_)))
        }

        assert!(check(|s| s.denoising.passes = 9));
        assert!(check(|s| s.denoising.color_sigma = 0.0));
        assert!(check(|s| s.denoising.spatial_sigma = f32::NAN));
        assert!(check(|s| s.denoising.normal_sigma = -1.0));
        assert!(check(|s| s.denoising.high_pass_strength = 1.5));
        assert!(check(|s| s.reprojection.normal_threshold = 2.0));
        assert!(check(|s| s.reprojection.base_color_threshold = -0.1));
        assert!(check(|s| s.reprojection.max_sample_count = 0));
        assert!(check(|s| s.reprojection.max_sample_count = 4096));
        assert!(check(|s| s.progressive_frame_cap = Some(0)));

        assert!(!check(|s| s.denoising.passes = 0));
        assert!(!check(|s| s.progressive_frame_cap = Some(10_000)));
    }
}
