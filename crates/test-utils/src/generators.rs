//! Synthetic data generators for CTD-like casts.
//!
//! Values follow a simple thermocline so tests can check ordering
//! and ranges without fixture files.

/// Temperature at the surface of a generated cast (deg C).
pub const SURFACE_TEMPERATURE: f64 = 18.0;

/// Creates a CTD cast as CSV text with `samples` rows.
///
/// Columns are `depth,temperature,salinity`. Depth increases by 1 m per
/// row starting at 1 m; temperature falls and salinity rises with depth.
///
/// # Example
///
/// ```
/// use test_utils::generate_ctd_csv;
///
/// let csv = generate_ctd_csv(3);
/// assert_eq!(csv.lines().count(), 4); // header + 3 rows
/// assert!(csv.starts_with("depth,temperature,salinity"));
/// ```
pub fn generate_ctd_csv(samples: usize) -> String {
    let mut out = String::from("depth,temperature,salinity\n");
    for i in 0..samples {
        let depth = (i + 1) as f64;
        out.push_str(&format!(
            "{:.1},{:.3},{:.3}\n",
            depth,
            temperature_at(depth),
            salinity_at(depth)
        ));
    }
    out
}

/// Temperature of the synthetic profile at `depth` metres.
pub fn temperature_at(depth: f64) -> f64 {
    // Mixed layer to 10 m, then a linear thermocline
    if depth <= 10.0 {
        SURFACE_TEMPERATURE
    } else {
        SURFACE_TEMPERATURE - (depth - 10.0) * 0.1
    }
}

/// Salinity of the synthetic profile at `depth` metres.
pub fn salinity_at(depth: f64) -> f64 {
    34.5 + depth * 0.01
}
