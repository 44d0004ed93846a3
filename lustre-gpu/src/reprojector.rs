use glam::Vec4;

use crate::{ReprojectionPassParams, Surface};

/// What has been accumulated for a pixel so far.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct History {
    pub color: Vec4,
    pub surface: Surface,
    pub sample_count: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reprojection {
    pub color: Vec4,
    pub sample_count: f32,
    pub is_valid: bool,
}

/// Blends current frame with the history accumulated at the same pixel.
///
/// History is read at the very same screen position (there are no motion
/// vectors), so it's only meaningful for static cameras and scenes; whenever
/// the surface seen through a pixel changes, the history gets discarded.
pub struct TemporalReprojector<'a> {
    pub params: &'a ReprojectionPassParams,
}

impl TemporalReprojector<'_> {
    pub fn is_valid(&self, curr: &Surface, prev: &Surface) -> bool {
        let params = self.params;

        curr.normal_similarity(prev) >= params.normal_threshold
            && curr.base_color_distance(prev) <= params.base_color_threshold
    }

    pub fn run(
        &self,
        color: Vec4,
        surface: &Surface,
        history: &History,
    ) -> Reprojection {
        if !self.is_valid(surface, &history.surface) {
            return Reprojection {
                color,
                sample_count: 1.0,
                is_valid: false,
            };
        }

        let max_sample_count = self.params.max_sample_count.max(1.0);
        let prev_count = history.sample_count.clamp(0.0, max_sample_count);
        let alpha = 1.0 / (prev_count + 1.0);

        Reprojection {
            color: history.color * (1.0 - alpha) + color * alpha,
            sample_count: (prev_count + 1.0).min(max_sample_count),
            is_valid: true,
        }
    }
}
