use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DenoisingPassParams {
    /// Distance (in pixels) between two neighbouring taps of the kernel
    pub stride: u32,

    /// Standard deviation of the spatial term, measured in taps
    pub spatial_sigma: f32,

    /// Standard deviation of the color-similarity term
    pub color_sigma: f32,

    /// Exponent of the normal-similarity term
    pub normal_sigma: f32,

    /// Standard deviation of the base-color-similarity term
    pub base_color_sigma: f32,

    /// How much of the original (unfiltered) color is blended back into the
    /// pass' output; `0.0` means fully filtered, `1.0` means unfiltered
    pub high_pass_strength: f32,

    pub padding: [u32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ReprojectionPassParams {
    /// Minimum cosine between current and history normal
    pub normal_threshold: f32,

    /// Maximum distance between current and history base color
    pub base_color_threshold: f32,

    /// Upper bound of the per-pixel accumulated sample count
    pub max_sample_count: f32,

    pub padding: u32,
}
