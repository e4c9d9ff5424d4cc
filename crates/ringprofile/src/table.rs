//! Tabular rendering of a [`RadialProfile`].
//!
//! Columns are `Ring, Distance_<unit>, Mean_Intensity, Area_<unit>^2,
//! Pixel_Count`. Empty rings keep their NaN mean, printed as `NaN`.

use std::fmt::Write as _;
use std::io::Write;

use crate::profile::RadialProfile;

/// Column headers for a profile measured in `unit`.
pub fn headers(unit: &str) -> [String; 5] {
    [
        "Ring".to_string(),
        format!("Distance_{}", unit),
        "Mean_Intensity".to_string(),
        format!("Area_{}^2", unit),
        "Pixel_Count".to_string(),
    ]
}

fn row_fields(profile: &RadialProfile) -> impl Iterator<Item = [String; 5]> + '_ {
    profile.rings.iter().map(|r| {
        [
            r.index.to_string(),
            format_value(r.distance),
            format_value(r.mean_intensity),
            format_value(r.area),
            r.pixel_count.to_string(),
        ]
    })
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.4}", v)
    }
}

/// Write the profile as CSV with a header row.
pub fn write_csv<W: Write>(profile: &RadialProfile, writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(headers(&profile.unit))?;
    for row in row_fields(profile) {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Right-aligned plain-text table.
pub fn format_table(profile: &RadialProfile) -> String {
    let header = headers(&profile.unit);
    let rows: Vec<[String; 5]> = row_fields(profile).collect();

    let mut widths = header.clone().map(|h| h.len());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    let mut push_line = |cells: &[String; 5]| {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{:>w$}", c, w = w))
            .collect();
        let _ = writeln!(out, "{}", line.join("  "));
    };
    push_line(&header);
    for row in &rows {
        push_line(row);
    }
    out
}
