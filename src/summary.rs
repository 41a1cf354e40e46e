use crate::decision::Move;
use crate::error::LocationError;
use crate::gridref;
use crate::model::SourceRecord;
use crate::transform::compass_direction;

/// Digest of an archive record for edit summaries, e.g.
/// "subject SO80930136; viewpoint SO80980134; looking WNW; use6fig; geograph".
pub fn format_row(record: &SourceRecord) -> Result<String, LocationError> {
    let grid = record.grid()?;
    let mut out = String::from("subject ");
    if record.natgrlen == 4 {
        out.push_str(&record.grid_reference);
    } else {
        out.push_str(&gridref::en_to_gridref(
            grid,
            record.nateastings as f64,
            record.natnorthings as f64,
            record.natgrlen,
        )?);
    }
    if record.has_viewpoint() {
        out.push_str("; viewpoint ");
        out.push_str(&gridref::en_to_gridref(
            grid,
            record.viewpoint_eastings as f64,
            record.viewpoint_northings as f64,
            record.viewpoint_grlen,
        )?);
    }
    if let Some(heading) = record.heading() {
        out.push_str("; looking ");
        out.push_str(compass_direction(f64::from(heading)));
    }
    if record.use6fig && (record.natgrlen > 4 || record.viewpoint_grlen > 4) {
        out.push_str("; use6fig");
    }
    if record.moderation_status.is_fully_moderated() {
        out.push_str("; geograph");
    }
    Ok(out)
}

/// Human-readable movement, e.g. "moved 40.6 m WNW".
pub fn describe_move(movement: &Move) -> String {
    format!(
        "moved {:.1} m {}",
        movement.distance,
        compass_direction(movement.azimuth)
    )
}
