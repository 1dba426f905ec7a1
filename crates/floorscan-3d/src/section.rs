use std::collections::HashMap;

use crate::mesh::TriangleMesh;

/// Error types for plane sections.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SectionError {
    /// The mesh has no triangles.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// The plane does not cut the mesh.
    #[error("no valid slice at height {0}")]
    NoIntersection(f64),
}

/// The intersection of a mesh with the plane `z = height`, as connected polylines.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    height: f64,
    polylines: Vec<Vec<[f64; 3]>>,
}

impl Section {
    /// Height of the cutting plane.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// The chained polylines. Closed loops end with their first point.
    pub fn polylines(&self) -> &[Vec<[f64; 3]>] {
        &self.polylines
    }

    /// Total number of line segments.
    pub fn num_segments(&self) -> usize {
        self.polylines.iter().map(|p| p.len().saturating_sub(1)).sum()
    }
}

// squared length below which a segment is considered a point
const DEGENERATE_EPS: f64 = 1e-18;

/// The segment where a triangle crosses `z = height`.
///
/// Vertices exactly on the plane count as above it, so a triangle touching the plane
/// with a single vertex yields no segment.
fn triangle_segment(tri: &[[f64; 3]; 3], height: f64) -> Option<[[f64; 3]; 2]> {
    let d = tri.map(|p| p[2] - height);
    let above = d.map(|v| v >= 0.0);
    if above[0] == above[1] && above[1] == above[2] {
        return None;
    }

    let mut ends = [[0.0; 3]; 2];
    let mut n = 0;
    for (i, j) in [(0, 1), (1, 2), (2, 0)] {
        if above[i] != above[j] {
            let t = d[i] / (d[i] - d[j]);
            ends[n] = [
                tri[i][0] + t * (tri[j][0] - tri[i][0]),
                tri[i][1] + t * (tri[j][1] - tri[i][1]),
                height,
            ];
            n += 1;
        }
    }

    let len2 = (ends[0][0] - ends[1][0]).powi(2) + (ends[0][1] - ends[1][1]).powi(2);
    (len2 > DEGENERATE_EPS).then_some(ends)
}

/// Intersect every triangle of `mesh` with the plane `z = height`.
pub fn segments_at_height(mesh: &TriangleMesh, height: f64) -> Vec<[[f64; 3]; 2]> {
    (0..mesh.num_faces())
        .filter_map(|f| triangle_segment(&mesh.triangle(f), height))
        .collect()
}

/// Join segments sharing endpoints into polylines.
///
/// Endpoints closer than `tolerance` along every axis are merged. Open chains start
/// at an endpoint of odd degree; what remains are closed loops.
pub fn chain_segments(segments: &[[[f64; 3]; 2]], tolerance: f64) -> Vec<Vec<[f64; 3]>> {
    let key = |p: &[f64; 3]| -> [i64; 3] { p.map(|c| (c / tolerance).round() as i64) };

    let mut node_ids: HashMap<[i64; 3], usize> = HashMap::new();
    let mut nodes: Vec<[f64; 3]> = Vec::new();
    let mut edges: Vec<[usize; 2]> = Vec::new();

    for segment in segments {
        let [a, b] = segment.map(|p| {
            *node_ids.entry(key(&p)).or_insert_with(|| {
                nodes.push(p);
                nodes.len() - 1
            })
        });
        if a != b {
            edges.push([a, b]);
        }
    }

    let mut adjacency = vec![Vec::new(); nodes.len()];
    for (e, &[a, b]) in edges.iter().enumerate() {
        adjacency[a].push(e);
        adjacency[b].push(e);
    }

    let mut used = vec![false; edges.len()];
    let walk = |start: usize, used: &mut Vec<bool>| -> Vec<[f64; 3]> {
        let mut path = vec![nodes[start]];
        let mut current = start;
        while let Some(&e) = adjacency[current].iter().find(|&&e| !used[e]) {
            used[e] = true;
            let [a, b] = edges[e];
            current = if a == current { b } else { a };
            path.push(nodes[current]);
        }
        path
    };

    let mut polylines = Vec::new();
    let open_ends = (0..nodes.len()).filter(|&n| adjacency[n].len() % 2 == 1);
    for start in open_ends.collect::<Vec<_>>() {
        let path = walk(start, &mut used);
        if path.len() > 1 {
            polylines.push(path);
        }
    }
    for e in 0..edges.len() {
        if !used[e] {
            polylines.push(walk(edges[e][0], &mut used));
        }
    }
    polylines
}

/// Cut `mesh` with the horizontal plane `z = height`.
///
/// # Arguments
///
/// * `mesh` - The mesh to cut.
/// * `height` - The plane height in mesh units.
///
/// # Returns
///
/// The section polylines, or an error when the mesh is empty or the plane misses it.
pub fn section_at_height(mesh: &TriangleMesh, height: f64) -> Result<Section, SectionError> {
    if mesh.is_empty() {
        return Err(SectionError::EmptyMesh);
    }

    let segments = segments_at_height(mesh, height);
    if segments.is_empty() {
        return Err(SectionError::NoIntersection(height));
    }

    // merge tolerance relative to the mesh extent
    let extent = mesh
        .bounds()
        .map(|(lo, hi)| (0..3).map(|i| hi[i] - lo[i]).fold(0.0, f64::max))
        .unwrap_or(1.0);
    let tolerance = (extent * 1e-9).max(1e-12);

    let polylines = chain_segments(&segments, tolerance);
    log::debug!(
        "section at {height}: {} segments in {} polylines",
        segments.len(),
        polylines.len()
    );

    Ok(Section { height, polylines })
}
