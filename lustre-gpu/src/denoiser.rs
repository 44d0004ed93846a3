use glam::{ivec2, IVec2, UVec2, Vec4, Vec4Swizzles};

use crate::{DenoisingPassParams, Image, Surface, SurfaceMap};

/// Single pass of the edge-aware à-trous filter.
///
/// Each pass is a 5x5 kernel whose taps are spread `params.stride` pixels
/// apart; running it with strides 1, 2, 4 approximates a 17x17 kernel while
/// fetching only 25 texels per pass.
///
/// The output is blended back toward `original` by
/// `params.high_pass_strength`; when chaining passes, the strength should be
/// non-zero only on the last one, so that the blend happens once, against the
/// unfiltered image.
///
/// Thanks to:
///
/// - https://jo.dreggn.org/home/2010_atrous.pdf
///   (Edge-Avoiding À-Trous Wavelet Transform for fast Global Illumination
///   Filtering by Dammertz et al.)
pub struct SpatialDenoiser<'a, I> {
    pub params: &'a DenoisingPassParams,
    pub surface_map: SurfaceMap<I>,
    pub input: I,
    pub original: I,
}

impl<'a, I> SpatialDenoiser<'a, I>
where
    I: Image,
{
    pub const RADIUS: i32 = 2;

    pub fn run(&self, screen_pos: UVec2) -> Vec4 {
        let center_color = self.input.read(screen_pos);
        let center_surface = self.surface_map.get(screen_pos);

        let mut sum_weights = 1.0;
        let mut sum_color = center_color;
        let mut sample_offset = ivec2(-Self::RADIUS, -Self::RADIUS);

        loop {
            let sample_pos = screen_pos.as_ivec2()
                + sample_offset * (self.params.stride as i32);

            if self.input.contains(sample_pos) && sample_offset != IVec2::ZERO
            {
                let sample_pos = sample_pos.as_uvec2();
                let sample_color = self.input.read(sample_pos);
                let sample_surface = self.surface_map.get(sample_pos);

                let sample_weight = eval_sample_weight(
                    self.params,
                    sample_offset,
                    center_color,
                    &center_surface,
                    sample_color,
                    &sample_surface,
                );

                if sample_weight > 0.0 {
                    sum_weights += sample_weight;
                    sum_color += sample_color * sample_weight;
                }
            }

            // ---

            sample_offset.x += 1;

            if sample_offset.x > Self::RADIUS {
                sample_offset.x = -Self::RADIUS;
                sample_offset.y += 1;

                if sample_offset.y > Self::RADIUS {
                    break;
                }
            }
        }

        let filtered = sum_color / sum_weights;
        let strength = self.params.high_pass_strength;

        if strength > 0.0 {
            filtered * (1.0 - strength)
                + self.original.read(screen_pos) * strength
        } else {
            filtered
        }
    }
}

/// Returns how much given sample should contribute to the center pixel.
///
/// `offset` is measured in taps, not in pixels, so the spatial term covers the
/// same part of the kernel regardless of the pass' stride.
pub fn eval_sample_weight(
    params: &DenoisingPassParams,
    offset: IVec2,
    center_color: Vec4,
    center_surface: &Surface,
    sample_color: Vec4,
    sample_surface: &Surface,
) -> f32 {
    let spatial_weight = gaussian(
        offset.as_vec2().length_squared(),
        params.spatial_sigma,
    );

    let color_weight = gaussian(
        (sample_color.xyz() - center_color.xyz()).length_squared(),
        params.color_sigma,
    );

    let normal_weight = {
        let cos = center_surface.normal_similarity(sample_surface);

        if cos > 0.0 {
            cos.min(1.0).powf(params.normal_sigma)
        } else {
            0.0
        }
    };

    let base_color_weight = gaussian(
        (sample_surface.base_color - center_surface.base_color)
            .length_squared(),
        params.base_color_sigma,
    );

    spatial_weight * color_weight * normal_weight * base_color_weight
}

fn gaussian(distance_squared: f32, sigma: f32) -> f32 {
    (-distance_squared / (2.0 * sigma * sigma)).exp()
}
