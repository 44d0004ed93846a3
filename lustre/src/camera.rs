use glam::{vec4, UVec2, Vec2, Vec3};

use crate::gpu;

/// Stable identity of a camera registered in the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CameraHandle(usize);

impl CameraHandle {
    pub(crate) fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn id(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CameraKind {
    /// Camera rendering the actual game / scene; advances the frame index
    #[default]
    Game,

    /// Camera rendering a preview (e.g. material thumbnails)
    Preview,

    /// Camera of the editor's scene view
    SceneView,
}

impl CameraKind {
    /// Returns whether rendering this camera should advance the progressive
    /// frame index.
    ///
    /// Editor cameras get re-rendered at arbitrary times and would make the
    /// sequence of samples seen by the game camera depend on the user's
    /// interactions.
    pub fn advances_frames(self) -> bool {
        matches!(self, CameraKind::Game)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Camera {
    /// Size of the camera's output, in pixels
    pub viewport: UVec2,
    pub kind: CameraKind,

    /// Lens parameters; cameras without a lens cannot be rendered
    pub lens: Option<Lens>,
}

impl Camera {
    pub fn new(viewport: UVec2, lens: Lens) -> Self {
        Self {
            viewport,
            kind: Default::default(),
            lens: Some(lens),
        }
    }

    pub fn with_kind(mut self, kind: CameraKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns whether `other` requires reallocating buffers sized after this
    /// camera.
    pub fn is_invalidated_by(&self, other: &Self) -> bool {
        self.viewport != other.viewport
    }

    pub fn describe(&self) -> String {
        format!(
            "{:?} ({}x{}{})",
            self.kind,
            self.viewport.x,
            self.viewport.y,
            if self.lens.is_some() { "" } else { ", no lens" },
        )
    }
}

/// Thin-lens camera model; see: [`gpu::Lens`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lens {
    pub origin: Vec3,

    /// Left-bottom corner of the focus plane, in world-space
    pub left_bottom_corner: Vec3,
    pub right: Vec3,
    pub up: Vec3,

    /// Size of the focus plane, in world-space units
    pub size: Vec2,
    pub aperture: f32,
}

impl Lens {
    /// Creates a lens looking from `position` towards `target`, focused on
    /// the plane passing through `target`.
    ///
    /// `fov` is the vertical field of view, in radians; `aspect_ratio` is
    /// width divided by height.
    pub fn looking_at(
        position: Vec3,
        target: Vec3,
        up: Vec3,
        fov: f32,
        aspect_ratio: f32,
        aperture: f32,
    ) -> Self {
        let forward = (target - position).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);
        let focus_distance = (target - position).length();

        let height = 2.0 * focus_distance * (fov * 0.5).tan();
        let width = height * aspect_ratio;

        let left_bottom_corner =
            target - right * (width * 0.5) - up * (height * 0.5);

        Self {
            origin: position,
            left_bottom_corner,
            right,
            up,
            size: Vec2::new(width, height),
            aperture,
        }
    }

    pub fn serialize(&self) -> gpu::Lens {
        gpu::Lens {
            d0: self.left_bottom_corner.extend(self.aperture * 0.5),
            d1: self.right.extend(0.0),
            d2: self.up.extend(0.0),
            d3: vec4(self.size.x, self.size.y, 0.0, 0.0),
            d4: self.origin.extend(0.0),
        }
    }
}
