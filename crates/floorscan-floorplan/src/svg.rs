use std::fmt::Write;

use crate::plan::FloorPlan;

/// Render the plan as an SVG document in plan units.
///
/// The y axis is flipped so that +y points up in viewers. Strokes use
/// `non-scaling-stroke` so `stroke_width` is in screen pixels whatever the scan scale.
pub fn render_svg(plan: &FloorPlan, stroke_width: f64) -> String {
    let (lo, hi) = plan.bounds().unwrap_or(([0.0, 0.0], [0.0, 0.0]));
    let extent = (hi[0] - lo[0]).max(hi[1] - lo[1]);
    let margin = if extent > 0.0 { extent * 0.02 } else { 1.0 };

    let min_x = lo[0] - margin;
    let min_y = -hi[1] - margin;
    let width = hi[0] - lo[0] + 2.0 * margin;
    let height = hi[1] - lo[1] + 2.0 * margin;

    let mut svg = String::new();
    // writing into a String cannot fail
    let _ = writeln!(svg, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{min_x} {min_y} {width} {height}">"#
    );
    let _ = writeln!(
        svg,
        r#"<rect x="{min_x}" y="{min_y}" width="{width}" height="{height}" fill="white"/>"#
    );
    let _ = writeln!(
        svg,
        r#"<g fill="none" stroke="black" stroke-width="{stroke_width}" stroke-linecap="round" stroke-linejoin="round">"#
    );

    for line in plan.polylines().iter().filter(|l| l.len() > 1) {
        let points = line
            .iter()
            // `0.0 - y` keeps zero from printing as -0
            .map(|p| format!("{},{}", p[0], 0.0 - p[1]))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            svg,
            r#"<polyline points="{points}" vector-effect="non-scaling-stroke"/>"#
        );
    }

    let _ = writeln!(svg, "</g>");
    let _ = writeln!(svg, "</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_svg() {
        let plan = FloorPlan::new(vec![
            vec![[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [0.0, 0.0]],
            vec![[5.0, 5.0]],
        ]);
        let svg = render_svg(&plan, 2.0);

        assert!(svg.starts_with("<?xml"));
        assert_eq!(svg.matches("<polyline").count(), 1);
        assert!(svg.contains(r#"points="0,0 2,0 2,-1 0,0""#));
        assert!(svg.contains(r#"stroke-width="2""#));
        // the attribute is not inherited, only the polylines carry it
        assert_eq!(svg.matches("non-scaling-stroke").count(), 1);
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_render_empty_plan() {
        let svg = render_svg(&FloorPlan::default(), 1.0);
        assert_eq!(svg.matches("<polyline").count(), 0);
        assert!(svg.contains(r#"viewBox="-1 -1 2 2""#));
    }
}
