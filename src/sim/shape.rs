//! Geometric primitives and pairwise overlap tests
//!
//! Positions and sizes are integer pixels. Comparisons are strict, so two
//! rectangles that only share an edge still count as touching and a point on
//! a rectangle's edge does not count as inside it.

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Shape kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    /// Axis-aligned box anchored at the owner's position
    Rect { size: IVec2 },
    /// Complement of a box: everything outside it is solid
    InvRect { size: IVec2 },
    Point,
}

impl Shape {
    pub fn rect(w: i32, h: i32) -> Self {
        Shape::Rect {
            size: IVec2::new(w, h),
        }
    }

    pub fn inv_rect(w: i32, h: i32) -> Self {
        Shape::InvRect {
            size: IVec2::new(w, h),
        }
    }

    /// Box size; points have none
    pub fn size(&self) -> IVec2 {
        match *self {
            Shape::Rect { size } | Shape::InvRect { size } => size,
            Shape::Point => IVec2::ZERO,
        }
    }
}

/// Point strictly inside a box
#[inline]
pub fn point_in_rect(p: IVec2, pos: IVec2, size: IVec2) -> bool {
    p.x > pos.x && p.x < pos.x + size.x && p.y > pos.y && p.y < pos.y + size.y
}

/// Point outside (or on the edge of) a box
#[inline]
pub fn point_outside_rect(p: IVec2, pos: IVec2, size: IVec2) -> bool {
    p.x > pos.x + size.x || p.y > pos.y + size.y || p.x < pos.x || p.y < pos.y
}

/// Boxes overlap or touch
#[inline]
pub fn rect_rect(a: IVec2, a_size: IVec2, b: IVec2, b_size: IVec2) -> bool {
    !(a.x > b.x + b_size.x || a.y > b.y + b_size.y || a.x + a_size.x < b.x || a.y + a_size.y < b.y)
}

/// Box `a` sticks out of box `b`
#[inline]
pub fn rect_escapes(a: IVec2, a_size: IVec2, b: IVec2, b_size: IVec2) -> bool {
    a.x + a_size.x > b.x + b_size.x
        || a.y + a_size.y > b.y + b_size.y
        || a.x < b.x
        || a.y < b.y
}

/// Pairwise overlap test.
///
/// Only the pairs listed below are defined; every other ordering reports no
/// contact.
pub fn shape_intersect(a: &Shape, pos_a: IVec2, b: &Shape, pos_b: IVec2) -> bool {
    match (*a, *b) {
        (Shape::Rect { size: sa }, Shape::Rect { size: sb }) => rect_rect(pos_a, sa, pos_b, sb),
        (Shape::Point, Shape::Point) => pos_a == pos_b,
        (Shape::Rect { size }, Shape::Point) => point_in_rect(pos_b, pos_a, size),
        (Shape::Point, Shape::Rect { size }) => point_in_rect(pos_a, pos_b, size),
        (Shape::Rect { size: sa }, Shape::InvRect { size: sb }) => {
            rect_escapes(pos_a, sa, pos_b, sb)
        }
        (Shape::Point, Shape::InvRect { size }) => point_outside_rect(pos_a, pos_b, size),
        _ => false,
    }
}
