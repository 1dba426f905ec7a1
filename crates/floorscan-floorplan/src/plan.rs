use floorscan_3d::Section;

/// A section projected onto the XY plane.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FloorPlan {
    polylines: Vec<Vec<[f64; 2]>>,
}

impl FloorPlan {
    /// Create a plan from 2D polylines.
    pub fn new(polylines: Vec<Vec<[f64; 2]>>) -> Self {
        Self { polylines }
    }

    /// Drop the height of every section point.
    pub fn from_section(section: &Section) -> Self {
        let polylines = section
            .polylines()
            .iter()
            .map(|line| line.iter().map(|p| [p[0], p[1]]).collect())
            .collect();
        Self { polylines }
    }

    /// The polylines in plan coordinates.
    pub fn polylines(&self) -> &[Vec<[f64; 2]>] {
        &self.polylines
    }

    /// Check if the plan has no points.
    pub fn is_empty(&self) -> bool {
        self.polylines.iter().all(|p| p.is_empty())
    }

    /// Bounds of all points as `(min, max)`.
    pub fn bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        let mut points = self.polylines.iter().flatten();
        let first = *points.next()?;
        Some(points.fold((first, first), |(lo, hi), p| {
            (
                [lo[0].min(p[0]), lo[1].min(p[1])],
                [hi[0].max(p[0]), hi[1].max(p[1])],
            )
        }))
    }
}

/// Maps plan coordinates into a pixel grid with padding, keeping the aspect ratio.
///
/// The plan is centred in the drawable area and the y axis points up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanTransform {
    scale: f64,
    origin: [f64; 2],
    offset: [f64; 2],
    height: f64,
}

impl PlanTransform {
    /// Fit `bounds` into a `width` x `height` pixel grid leaving `padding` on each side.
    pub fn fit(bounds: ([f64; 2], [f64; 2]), width: u32, height: u32, padding: u32) -> Self {
        let (lo, hi) = bounds;
        let extent = [hi[0] - lo[0], hi[1] - lo[1]];
        let avail = [
            (width as f64 - 2.0 * padding as f64).max(1.0),
            (height as f64 - 2.0 * padding as f64).max(1.0),
        ];

        let scale = match (extent[0] > 0.0, extent[1] > 0.0) {
            (true, true) => (avail[0] / extent[0]).min(avail[1] / extent[1]),
            (true, false) => avail[0] / extent[0],
            (false, true) => avail[1] / extent[1],
            (false, false) => 1.0,
        };

        let offset = [
            padding as f64 + (avail[0] - extent[0] * scale) / 2.0,
            padding as f64 + (avail[1] - extent[1] * scale) / 2.0,
        ];

        Self {
            scale,
            origin: lo,
            offset,
            height: height as f64,
        }
    }

    /// Pixel scale per plan unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Pixel coordinates of a plan point, with row 0 at the top.
    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        let x = self.offset[0] + (p[0] - self.origin[0]) * self.scale;
        let y = self.offset[1] + (p[1] - self.origin[1]) * self.scale;
        [x, self.height - y]
    }
}
