//! Holding tabs: uncut bridges left in the lowest passes.

use kerf_geom::{slope_from_angle, Path, Point2, Ring};
use tracing::warn;

/// Chord lines run this far out from the tab chord.
const CHORD_REACH: f64 = 10_000.0;

/// Tab layout parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabSpec {
    /// Bridge width.
    pub width: f64,
    /// Number of tabs around each path.
    pub count: u32,
    /// Angle of the first tab in degrees; the rest follow clockwise.
    pub angle: f64,
}

/// The two chord lines that bound one tab.
///
/// `c1`/`c2` sit either side of the center, `o1`/`o2` are the same points
/// projected far out along the tab direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabLine {
    /// Near point on the first side.
    pub c1: Point2,
    /// Far point on the first side.
    pub o1: Point2,
    /// Near point on the second side.
    pub c2: Point2,
    /// Far point on the second side.
    pub o2: Point2,
}

impl TabLine {
    /// The quadrilateral swept by the tab, `[o1, c1, c2, o2]`.
    pub fn clip_quad(&self) -> Ring {
        Ring::new(vec![self.o1, self.c1, self.c2, self.o2])
    }
}

/// Tab chord lines around `center`, evenly spaced and clockwise from `spec.angle`.
pub fn tab_lines(center: Point2, tool_diameter: f64, spec: &TabSpec) -> Vec<TabLine> {
    if spec.count == 0 {
        return Vec::new();
    }
    let increment = 360.0 / spec.count as f64;
    let offset = (spec.width + tool_diameter) / 2.0;

    (0..spec.count)
        .map(|k| {
            let angle = spec.angle - k as f64 * increment;
            let slope = slope_from_angle(angle);
            let normal = slope_from_angle(angle + 90.0);
            let c1 = center + normal * offset;
            let c2 = center - normal * offset;
            TabLine {
                c1,
                o1: c1 + slope * CHORD_REACH,
                c2,
                o2: c2 + slope * CHORD_REACH,
            }
        })
        .collect()
}

/// Paths after tab cutting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabbedPaths {
    /// Open segments between tabs, plus any paths passed through.
    pub paths: Vec<Path>,
    /// Paths that could not be tabbed and were passed through whole.
    pub untabbed: usize,
}

/// Split closed paths at `z` into open segments that skip the tab regions.
///
/// Each path is walked clockwise. A path that no tab line crosses is passed
/// through unchanged and counted in [`TabbedPaths::untabbed`].
pub fn cut_tabs(paths: Vec<Path>, z: f64, tool_diameter: f64, spec: &TabSpec) -> TabbedPaths {
    let mut out = TabbedPaths::default();

    for path in paths {
        let mut ring = path.to_ring();
        ring.ensure_cw();

        let hits = match ring.bounds() {
            Some((min, max)) => {
                let center = Point2::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0);
                let mut hits = Vec::new();
                for line in tab_lines(center, tool_diameter, spec) {
                    let h1 = ring.intersections(line.c1, line.o1).last().copied();
                    let h2 = ring.intersections(line.c2, line.o2).last().copied();
                    if let (Some(h1), Some(h2)) = (h1, h2) {
                        hits.push(h1);
                        hits.push(h2);
                    }
                }
                hits
            }
            None => Vec::new(),
        };

        if hits.is_empty() {
            out.untabbed += 1;
            out.paths.push(path);
            continue;
        }

        // pair the trailing side of each tab with the leading side of the next
        let mut hits = hits;
        hits.rotate_left(1);
        for pair in hits.chunks_exact(2) {
            let points = ring.emit_segment(&pair[0], &pair[1]);
            out.paths.push(Path::from_points_2d(&points, z, path.depth));
        }
    }

    if out.untabbed > 0 {
        warn!("unable to compute tabs for {} traces @ z={}", out.untabbed, z);
    }
    out
}
