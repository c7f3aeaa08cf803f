//! Geometry over normalized canvas coordinates.
//!
//! Positions are layer centers and sizes are fractions of the canvas
//! width/height. Rotation is in degrees, clockwise in the y-down canvas
//! space, and is never wrapped.

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

use crate::layers::Transform;

/// Convert a normalized coordinate to pixels.
pub fn to_pixel(normalized: f64, canvas_dim: f64) -> f64 {
    normalized * canvas_dim
}

/// Convert a pixel coordinate to a normalized one.
pub fn to_normalized(pixel: f64, canvas_dim: f64) -> f64 {
    if canvas_dim == 0.0 { 0.0 } else { pixel / canvas_dim }
}

/// Convert a normalized point to canvas pixels.
pub fn point_to_pixels(point: Point, canvas: Size) -> Point {
    Point::new(to_pixel(point.x, canvas.width), to_pixel(point.y, canvas.height))
}

/// Convert a canvas-pixel point to normalized coordinates.
pub fn point_to_normalized(point: Point, canvas: Size) -> Point {
    Point::new(
        to_normalized(point.x, canvas.width),
        to_normalized(point.y, canvas.height),
    )
}

/// Rotate a vector by `degrees`.
pub fn rotate_vec(v: Vec2, degrees: f64) -> Vec2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Rotate `point` about `center` by `degrees`.
pub fn rotate_about(point: Point, center: Point, degrees: f64) -> Point {
    center + rotate_vec(point - center, degrees)
}

/// Test whether a normalized point lies inside a (possibly rotated) layer.
///
/// The point is rotated about the layer center by the negative layer
/// rotation, which turns the test into an axis-aligned half-extent check.
pub fn hit_test(point: Point, transform: &Transform, canvas: Size) -> bool {
    let p = point_to_pixels(point, canvas);
    let center = point_to_pixels(transform.position, canvas);
    let half_w = transform.size.width * canvas.width / 2.0;
    let half_h = transform.size.height * canvas.height / 2.0;

    let local = rotate_vec(p - center, -transform.rotation);
    local.x.abs() <= half_w && local.y.abs() <= half_h
}

/// The unrotated rectangle of a transform, in normalized coordinates.
pub fn unrotated_rect(transform: &Transform) -> Rect {
    Rect::from_center_size(transform.position, transform.size)
}

/// The four corners of a transform in canvas pixels (nw, ne, se, sw).
pub fn pixel_corners(transform: &Transform, canvas: Size) -> [Point; 4] {
    let center = point_to_pixels(transform.position, canvas);
    let hw = transform.size.width * canvas.width / 2.0;
    let hh = transform.size.height * canvas.height / 2.0;
    [
        Vec2::new(-hw, -hh),
        Vec2::new(hw, -hh),
        Vec2::new(hw, hh),
        Vec2::new(-hw, hh),
    ]
    .map(|offset| center + rotate_vec(offset, transform.rotation))
}

/// Axis-aligned bounding box of a transform, in normalized coordinates.
///
/// Corners are rotated in pixel space so non-square canvases stay exact.
pub fn compute_aabb(transform: &Transform, canvas: Size) -> Rect {
    if transform.rotation == 0.0 {
        return unrotated_rect(transform);
    }

    let corners = pixel_corners(transform, canvas);
    let mut bounds = Rect::from_points(corners[0], corners[0]);
    for corner in &corners[1..] {
        bounds = bounds.union_pt(*corner);
    }
    Rect::new(
        to_normalized(bounds.x0, canvas.width),
        to_normalized(bounds.y0, canvas.height),
        to_normalized(bounds.x1, canvas.width),
        to_normalized(bounds.y1, canvas.height),
    )
}

/// Open-interval overlap test between a drag rectangle and an AABB.
///
/// The drag rectangle may have negative extents; it is normalized first.
pub fn rect_intersects(drag: Rect, aabb: Rect) -> bool {
    let drag = drag.abs();
    drag.x0 < aabb.x1 && drag.x1 > aabb.x0 && drag.y0 < aabb.y1 && drag.y1 > aabb.y0
}

/// Union of the unrotated rectangles of several transforms.
pub fn union_rect<'a>(transforms: impl IntoIterator<Item = &'a Transform>) -> Option<Rect> {
    transforms
        .into_iter()
        .map(unrotated_rect)
        .reduce(|acc, rect| acc.union(rect))
}

/// Compass direction of a resize handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::NW,
        ResizeHandle::N,
        ResizeHandle::NE,
        ResizeHandle::E,
        ResizeHandle::SE,
        ResizeHandle::S,
        ResizeHandle::SW,
        ResizeHandle::W,
    ];

    /// Sign of the handle on each axis: east/south are positive.
    pub fn direction(self) -> (f64, f64) {
        match self {
            ResizeHandle::N => (0.0, -1.0),
            ResizeHandle::S => (0.0, 1.0),
            ResizeHandle::E => (1.0, 0.0),
            ResizeHandle::W => (-1.0, 0.0),
            ResizeHandle::NE => (1.0, -1.0),
            ResizeHandle::NW => (-1.0, -1.0),
            ResizeHandle::SE => (1.0, 1.0),
            ResizeHandle::SW => (-1.0, 1.0),
        }
    }

    /// Whether only the height follows the pointer.
    pub fn is_vertical_edge(self) -> bool {
        matches!(self, ResizeHandle::N | ResizeHandle::S)
    }

    pub fn name(self) -> &'static str {
        match self {
            ResizeHandle::N => "n",
            ResizeHandle::S => "s",
            ResizeHandle::E => "e",
            ResizeHandle::W => "w",
            ResizeHandle::NE => "ne",
            ResizeHandle::NW => "nw",
            ResizeHandle::SE => "se",
            ResizeHandle::SW => "sw",
        }
    }
}

/// A center/size pair, the input and output of [`resize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub position: Point,
    pub size: Size,
}

impl Frame {
    pub fn new(position: Point, size: Size) -> Self {
        Self { position, size }
    }
}

impl From<&Transform> for Frame {
    fn from(transform: &Transform) -> Self {
        Self::new(transform.position, transform.size)
    }
}

/// Anchor-preserving resize.
///
/// Each handle contributes a width and/or height delta (`e` +dx, `w` -dx,
/// `s` +dy, `n` -dy). With `lock_aspect`, height drives for pure `n`/`s`
/// handles and width drives otherwise. Sizes never drop below `min`, and the
/// center moves by half the size delta toward the active handle so the
/// opposite edge stays put.
pub fn resize(handle: ResizeHandle, delta: Vec2, start: Frame, lock_aspect: bool, min: Size) -> Frame {
    let (sx, sy) = handle.direction();
    let mut width = start.size.width + sx * delta.x;
    let mut height = start.size.height + sy * delta.y;

    if lock_aspect && start.size.width > 0.0 && start.size.height > 0.0 {
        let factor = if handle.is_vertical_edge() {
            height / start.size.height
        } else {
            width / start.size.width
        };
        let min_factor = (min.width / start.size.width).max(min.height / start.size.height);
        let factor = factor.max(min_factor);
        width = start.size.width * factor;
        height = start.size.height * factor;
    } else {
        width = width.max(min.width);
        height = height.max(min.height);
    }

    let dw = width - start.size.width;
    let dh = height - start.size.height;
    Frame {
        position: Point::new(
            start.position.x + sx * dw / 2.0,
            start.position.y + sy * dh / 2.0,
        ),
        size: Size::new(width, height),
    }
}

/// [`resize`] for a rotated frame: the delta is taken into the frame's local
/// axes and the resulting center shift is rotated back.
pub fn resize_rotated(
    handle: ResizeHandle,
    delta: Vec2,
    start: Frame,
    rotation: f64,
    lock_aspect: bool,
    min: Size,
) -> Frame {
    let local_delta = rotate_vec(delta, -rotation);
    let local = resize(
        handle,
        local_delta,
        Frame::new(Point::ORIGIN, start.size),
        lock_aspect,
        min,
    );
    Frame {
        position: start.position + rotate_vec(local.position.to_vec2(), rotation),
        size: local.size,
    }
}

/// Angle of the pointer around a center, in degrees.
pub fn rotation_from_pointer(pointer: Point, center: Point) -> f64 {
    (pointer.y - center.y).atan2(pointer.x - center.x).to_degrees()
}

/// Rotation gesture bookkeeping.
///
/// Captures the offset between the pointer angle and the layer rotation at
/// gesture start so rotation stays continuous wherever the drag began.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationTracker {
    pub angle_offset: f64,
}

impl RotationTracker {
    pub fn begin(pointer: Point, center: Point, layer_rotation: f64) -> Self {
        Self {
            angle_offset: rotation_from_pointer(pointer, center) - layer_rotation,
        }
    }

    pub fn rotation_at(&self, pointer: Point, center: Point) -> f64 {
        rotation_from_pointer(pointer, center) - self.angle_offset
    }
}
