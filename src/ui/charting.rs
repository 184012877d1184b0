/// Compute X (run number) and Y (seconds) bounds for the summary chart
pub fn compute_chart_params(points: &[(f64, f64)]) -> (f64, f64) {
    let mut highest_secs = 0.0;
    for &(_, secs) in points {
        if secs > highest_secs {
            highest_secs = secs;
        }
    }

    let mut last_run = match points.last() {
        Some(p) => p.0,
        None => 1.0,
    };
    if last_run < 1.0 {
        last_run = 1.0;
    }

    (last_run, highest_secs.ceil())
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
