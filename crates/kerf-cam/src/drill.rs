//! Hole drilling and registration holes.

use std::f64::consts::PI;

use kerf_geom::{Bounds3, Path, Point2, Point3};
use kerf_slicer::CrossSection;

use crate::config::{RegistrationAxis, StockSize};
use crate::slice::{CamMode, Slice};

/// Minimum circularity of a drillable hole.
const MIN_CIRCULARITY: f64 = 0.985;

/// Allowed relative area error against the drill's circle.
const AREA_TOLERANCE: f64 = 0.05;

/// Centers closer than this fraction of the drill diameter are the same hole.
const MERGE_FRACTION: f64 = 0.1;

/// Group drillable hole centers across levels.
///
/// Sections are visited in order. A center joins the first cluster whose most
/// recent center is within 10% of the drill diameter; otherwise it starts a
/// new cluster. Each returned cluster lists its centers in visit order, with
/// the section level as Z.
pub fn drill_clusters(sections: &[CrossSection], tool_diameter: f64) -> Vec<Vec<Point3>> {
    let target = PI * (tool_diameter / 2.0).powi(2);
    let merge = tool_diameter * MERGE_FRACTION;
    let mut clusters: Vec<Vec<Point3>> = Vec::new();

    for section in sections {
        for hole in section.tops.iter().flat_map(|s| s.holes.iter()) {
            if hole.circularity() < MIN_CIRCULARITY
                || (hole.area() - target).abs() > target * AREA_TOLERANCE
            {
                continue;
            }
            let c = hole.centroid();
            let center = Point3::new(c.x, c.y, section.z);
            let existing = clusters.iter_mut().find(|cluster| {
                cluster.last().is_some_and(|last| {
                    (Point2::new(last.x, last.y) - c).norm() <= merge
                })
            });
            match existing {
                Some(cluster) => cluster.push(center),
                None => clusters.push(vec![center]),
            }
        }
    }

    clusters
}

/// One drill slice per hole: a plunge at the averaged center through every
/// level the hole was seen at.
pub fn drill_slices(sections: &[CrossSection], tool_diameter: f64) -> Vec<Slice> {
    drill_clusters(sections, tool_diameter)
        .into_iter()
        .filter_map(|cluster| {
            let first = cluster.first()?;
            let n = cluster.len() as f64;
            let cx = cluster.iter().map(|p| p.x).sum::<f64>() / n;
            let cy = cluster.iter().map(|p| p.y).sum::<f64>() / n;
            let points = cluster.iter().map(|p| Point3::new(cx, cy, p.z)).collect();
            Some(Slice::new(first.z, CamMode::Drill).with_lines(vec![Path::open(points)]))
        })
        .collect()
}

/// Two plunges either side of the part along its mid-axis, placed a quarter
/// of the spare stock out from the part, from the part top through the stock.
pub fn registration_slice(
    bounds: &Bounds3,
    stock: &StockSize,
    axis: RegistrationAxis,
    z_thru: f64,
) -> Slice {
    let mid_x = (bounds.min.x + bounds.max.x) / 2.0;
    let mid_y = (bounds.min.y + bounds.max.y) / 2.0;
    let dx = (stock.x - bounds.size_x()) / 4.0;
    let dy = (stock.y - bounds.size_y()) / 4.0;

    let holes = match axis {
        RegistrationAxis::X => [
            Point2::new(bounds.min.x - dx, mid_y),
            Point2::new(bounds.max.x + dx, mid_y),
        ],
        RegistrationAxis::Y => [
            Point2::new(mid_x, bounds.min.y - dy),
            Point2::new(mid_x, bounds.max.y + dy),
        ],
    };

    let top = bounds.max.z;
    let bottom = top - stock.z - z_thru;
    let paths = holes
        .iter()
        .map(|h| Path::open(vec![Point3::new(h.x, h.y, top), Point3::new(h.x, h.y, bottom)]))
        .collect();
    Slice::new(top, CamMode::Drill).with_lines(paths)
}
