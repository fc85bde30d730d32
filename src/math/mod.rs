//! Value types the kernel catalogue operates on
//!
//! All fixed-size types are `#[repr(C)]` so backends can address their fields
//! with plain pointer arithmetic. Dense matrices and vectors ([`MatX`], [`VecX`])
//! are row-major heap buffers of arbitrary size.

mod draw_vert;
mod joint;
mod matx;
mod vector;

pub use draw_vert::{DominantTri, DrawVert};
pub use joint::{Angles, JointMat, JointQuat, JointWeight, Quat};
pub use matx::{MatX, VecX};
pub use vector::{Plane, Vec2, Vec3, Vec4};
