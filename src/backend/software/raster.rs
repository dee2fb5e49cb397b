//! Triangle rasterization and per-fragment operations.
//!
//! Clip-space triangles are clipped against the near plane (`z >= 0`) and
//! `w > 0`, projected, culled by winding, and scan-converted with a top-left
//! fill rule so shared edges are covered exactly once. Attributes are
//! interpolated perspective-correctly.
//!
//! Fragment operations follow the fixed-function order: stencil test, depth
//! test, stencil update, depth write, blend.

use glam::{Vec2, Vec3, Vec4};
use smallvec::SmallVec;

use super::framebuffer::Framebuffer;
use super::program::{ClipVertex, FragmentShader, Varyings, VertexTransform};
use crate::assets::MeshData;
use crate::renderer::state::{BlendFactor, BlendState, Face, FrontFace, PipelineState};

const MIN_W: f32 = 1e-5;
/// Tolerance for depth values produced exactly on the far plane.
const FAR_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct RasterStats {
    pub triangles: u64,
    pub fragments: u64,
}

type Polygon = SmallVec<[ClipVertex; 8]>;

pub(super) fn draw_mesh(
    fb: &mut Framebuffer,
    mesh: &MeshData,
    vertex: &VertexTransform,
    fragment: &FragmentShader<'_>,
    state: &PipelineState,
) -> RasterStats {
    let mut stats = RasterStats::default();
    if fb.width() == 0 || fb.height() == 0 {
        return stats;
    }

    for [a, b, c] in mesh.triangles() {
        let triangle: Polygon =
            SmallVec::from_slice(&[vertex.run(a), vertex.run(b), vertex.run(c)]);
        let polygon = clip_polygon(triangle);
        for i in 1..polygon.len().saturating_sub(1) {
            rasterize(
                fb,
                [&polygon[0], &polygon[i], &polygon[i + 1]],
                fragment,
                state,
                &mut stats,
            );
        }
    }
    stats
}

fn clip_polygon(polygon: Polygon) -> Polygon {
    let polygon = clip_against(&polygon, |c| c.w - MIN_W);
    clip_against(&polygon, |c| c.z)
}

/// Sutherland–Hodgman against one plane; keeps the side where `distance >= 0`.
fn clip_against(input: &[ClipVertex], distance: impl Fn(Vec4) -> f32) -> Polygon {
    let mut out = Polygon::new();
    if input.is_empty() {
        return out;
    }
    for (i, current) in input.iter().enumerate() {
        let next = &input[(i + 1) % input.len()];
        let dc = distance(current.clip);
        let dn = distance(next.clip);
        if dc >= 0.0 {
            out.push(*current);
        }
        if (dc >= 0.0) != (dn >= 0.0) {
            let t = dc / (dc - dn);
            out.push(current.lerp(next, t));
        }
    }
    out
}

/// Twice the signed area of `(a, b, p)`; positive when `p` lies to the right
/// of `a → b` in y-down screen space.
#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

#[inline]
fn is_top_left(a: Vec2, b: Vec2) -> bool {
    let d = b - a;
    (d.y == 0.0 && d.x > 0.0) || d.y < 0.0
}

#[inline]
fn covers(e: f32, a: Vec2, b: Vec2) -> bool {
    e > 0.0 || (e == 0.0 && is_top_left(a, b))
}

fn is_culled(state: &PipelineState, counter_clockwise: bool) -> bool {
    if !state.cull.enabled {
        return false;
    }
    let front = match state.cull.front_face {
        FrontFace::Ccw => counter_clockwise,
        FrontFace::Cw => !counter_clockwise,
    };
    match state.cull.face {
        Face::Back => !front,
        Face::Front => front,
    }
}

fn rasterize(
    fb: &mut Framebuffer,
    v: [&ClipVertex; 3],
    fragment: &FragmentShader<'_>,
    state: &PipelineState,
    stats: &mut RasterStats,
) {
    let (width, height) = (fb.width() as f32, fb.height() as f32);

    let inv_w = v.map(|cv| 1.0 / cv.clip.w);
    let screen: [Vec3; 3] = std::array::from_fn(|i| {
        let ndc = v[i].clip.truncate() * inv_w[i];
        Vec3::new(
            (ndc.x * 0.5 + 0.5) * width,
            (0.5 - ndc.y * 0.5) * height,
            ndc.z,
        )
    });
    let xy = screen.map(|s| s.truncate());

    let area = edge(xy[0], xy[1], xy[2]);
    if area == 0.0 || !area.is_finite() {
        return;
    }
    // y 轴向下：屏幕空间面积为负即 NDC 中的逆时针
    if is_culled(state, area < 0.0) {
        return;
    }
    stats.triangles += 1;

    let order: [usize; 3] = if area > 0.0 { [0, 1, 2] } else { [0, 2, 1] };
    let p = order.map(|i| xy[i]);
    let area = area.abs();

    let min = p[0].min(p[1]).min(p[2]);
    let max = p[0].max(p[1]).max(p[2]);
    let x0 = min.x.floor().max(0.0) as u32;
    let y0 = min.y.floor().max(0.0) as u32;
    let x1 = (max.x.ceil().min(width - 1.0)).max(0.0) as u32;
    let y1 = (max.y.ceil().min(height - 1.0)).max(0.0) as u32;

    let varyings = order.map(|i| &v[i].varyings);
    let depth = order.map(|i| screen[i].z);
    let inv_w = order.map(|i| inv_w[i]);
    let may_discard = fragment.may_discard();

    for py in y0..=y1 {
        for px in x0..=x1 {
            let sample = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
            let e0 = edge(p[1], p[2], sample);
            let e1 = edge(p[2], p[0], sample);
            let e2 = edge(p[0], p[1], sample);
            if !(covers(e0, p[1], p[2]) && covers(e1, p[2], p[0]) && covers(e2, p[0], p[1])) {
                continue;
            }

            let b = [e0 / area, e1 / area, e2 / area];
            let z = b[0] * depth[0] + b[1] * depth[1] + b[2] * depth[2];
            if !(-FAR_EPSILON..=1.0 + FAR_EPSILON).contains(&z) {
                continue;
            }
            let z = z.clamp(0.0, 1.0);

            let pw = [b[0] * inv_w[0], b[1] * inv_w[1], b[2] * inv_w[2]];
            let sum = pw[0] + pw[1] + pw[2];
            if sum <= 0.0 {
                continue;
            }
            let attrs = Varyings::weighted(varyings, [pw[0] / sum, pw[1] / sum, pw[2] / sum]);

            let Some(index) = fb.index(px, py) else {
                continue;
            };
            if process_fragment(fb, index, z, &attrs, fragment, state, may_discard) {
                stats.fragments += 1;
            }
        }
    }
}

/// Returns whether the fragment reached the color buffer.
fn process_fragment(
    fb: &mut Framebuffer,
    index: usize,
    z: f32,
    attrs: &Varyings,
    fragment: &FragmentShader<'_>,
    state: &PipelineState,
    may_discard: bool,
) -> bool {
    let early = if may_discard {
        match fragment.shade(attrs) {
            Some(color) => Some(color),
            None => return false,
        }
    } else {
        None
    };

    let stencil = &state.stencil;
    if stencil.test_enabled {
        let stored = fb.stencil[index];
        if !stencil.test(stored) {
            fb.stencil[index] = stencil.update(stencil.fail_op, stored);
            return false;
        }
    }

    let depth = &state.depth;
    if depth.test_enabled && !depth.compare.passes(z, fb.depth[index]) {
        if stencil.test_enabled {
            fb.stencil[index] = stencil.update(stencil.depth_fail_op, fb.stencil[index]);
        }
        return false;
    }

    if stencil.test_enabled {
        fb.stencil[index] = stencil.update(stencil.pass_op, fb.stencil[index]);
    }
    if depth.test_enabled && depth.write_enabled {
        fb.depth[index] = z;
    }

    let Some(src) = early.or_else(|| fragment.shade(attrs)) else {
        return false;
    };
    let dst = fb.color.texel_mut(index);
    *dst = blend(&state.blend, src, *dst);
    true
}

#[inline]
fn factor(f: BlendFactor, src_alpha: f32) -> f32 {
    match f {
        BlendFactor::Zero => 0.0,
        BlendFactor::One => 1.0,
        BlendFactor::SrcAlpha => src_alpha,
        BlendFactor::OneMinusSrcAlpha => 1.0 - src_alpha,
    }
}

fn blend(state: &BlendState, src: Vec4, dst: Vec4) -> Vec4 {
    if !state.enabled {
        return src.clamp(Vec4::ZERO, Vec4::ONE);
    }
    let s = factor(state.src_factor, src.w);
    let d = factor(state.dst_factor, src.w);
    (src * s + dst * d).clamp(Vec4::ZERO, Vec4::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cv(x: f32, y: f32, z: f32, w: f32) -> ClipVertex {
        ClipVertex {
            clip: Vec4::new(x, y, z, w),
            varyings: Varyings::default(),
        }
    }

    #[test]
    fn triangle_in_front_is_untouched() {
        let tri: Polygon = SmallVec::from_slice(&[
            cv(0.0, 0.0, 0.5, 1.0),
            cv(1.0, 0.0, 0.5, 1.0),
            cv(0.0, 1.0, 0.5, 1.0),
        ]);
        assert_eq!(clip_polygon(tri).len(), 3);
    }

    #[test]
    fn near_plane_crossing_becomes_quad() {
        let tri: Polygon = SmallVec::from_slice(&[
            cv(0.0, 0.0, -1.0, 1.0),
            cv(1.0, 0.0, 1.0, 2.0),
            cv(0.0, 1.0, 1.0, 2.0),
        ]);
        let clipped = clip_polygon(tri);
        assert_eq!(clipped.len(), 4);
        assert!(clipped.iter().all(|v| v.clip.z >= -1e-6));
    }

    #[test]
    fn fully_behind_is_dropped() {
        let tri: Polygon = SmallVec::from_slice(&[
            cv(0.0, 0.0, -1.0, -1.0),
            cv(1.0, 0.0, -1.0, -1.0),
            cv(0.0, 1.0, -1.0, -1.0),
        ]);
        assert!(clip_polygon(tri).is_empty());
    }

    #[test]
    fn alpha_blend_over() {
        let out = blend(
            &BlendState::ALPHA,
            Vec4::new(1.0, 0.0, 0.0, 0.25),
            Vec4::new(0.0, 0.0, 1.0, 1.0),
        );
        assert!((out - Vec4::new(0.25, 0.0, 0.75, 0.8125)).length() < 1e-6);
    }

    #[test]
    fn culling_table() {
        let mut state = PipelineState::BASELINE;
        assert!(!is_culled(&state, true));
        assert!(is_culled(&state, false));
        state.cull.face = Face::Front;
        assert!(is_culled(&state, true));
        state.cull.enabled = false;
        assert!(!is_culled(&state, false));
    }

    #[test]
    fn top_left_rule_shares_edges_once() {
        // Two triangles sharing the diagonal of a 4×4 square; every covered
        // pixel must be hit exactly once.
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(4.0, 0.0);
        let c = Vec2::new(4.0, 4.0);
        let d = Vec2::new(0.0, 4.0);
        let tris = [[a, b, c], [a, c, d]];
        for py in 0..4 {
            for px in 0..4 {
                let s = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
                let hits = tris
                    .iter()
                    .filter(|t| {
                        let (p0, p1, p2) = (t[0], t[1], t[2]);
                        covers(edge(p1, p2, s), p1, p2)
                            && covers(edge(p2, p0, s), p2, p0)
                            && covers(edge(p0, p1, s), p0, p1)
                    })
                    .count();
                assert_eq!(hits, 1, "pixel ({px}, {py})");
            }
        }
    }
}
