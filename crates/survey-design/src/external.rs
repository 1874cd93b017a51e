//! Imported plot center lists
//!
//! The import format is a header row followed by one plot per row whose first
//! two columns are longitude and latitude. Remaining columns are ignored.

use crate::error::DesignError;
use survey_geo::Point;

/// Parse an imported point list into geographic plot centers
///
/// Blank lines are skipped. The header row is always skipped, whatever it holds.
///
/// # Errors
/// - `DesignError::InvalidPointList` for a row with fewer than two columns,
///   an unparsable number, or a list with no data rows
pub fn parse_point_csv(text: &str) -> Result<Vec<Point>, DesignError> {
    let points = text
        .lines()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| parse_row(index + 1, line))
        .collect::<Result<Vec<_>, _>>()?;

    if points.is_empty() {
        return Err(DesignError::InvalidPointList {
            line: 0,
            message: "no data rows".to_string(),
        });
    }
    Ok(points)
}

fn parse_row(line: usize, row: &str) -> Result<Point, DesignError> {
    let mut fields = row.split(',').map(str::trim);
    let mut next_number = |name: &str| -> Result<f64, DesignError> {
        let field = fields.next().ok_or_else(|| DesignError::InvalidPointList {
            line,
            message: format!("missing {name} column"),
        })?;
        field.parse::<f64>().map_err(|_| DesignError::InvalidPointList {
            line,
            message: format!("{name} is not a number: {field:?}"),
        })
    };
    let lon = next_number("lon")?;
    let lat = next_number("lat")?;
    Ok(Point::new(lon, lat))
}
