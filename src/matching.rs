//! Recognizers for coordinates that were written before: mechanically
//! rounded copies of bot output, and structured statements paired with
//! wikitext templates.

use serde_json::Value;

use crate::error::LocationError;
use crate::model::ExistingLocation;

/// The globe structured coordinates must be attached to.
const EARTH: &str = "http://www.wikidata.org/entity/Q2";
/// Qualifier property carrying the heading of a coordinate statement.
const HEADING_QUALIFIER: &str = "P7787";

/// The six rounding policies observed in historical edits: 5, 4 and 3
/// decimal places, each rounded to nearest or towards zero. Subtracting
/// half a unit in the last place before formatting turns round-to-nearest
/// into round-towards-zero. Reverse-engineered from the wild; a heuristic,
/// not a law, so the list is preserved exactly rather than generalized.
fn possible_roundings(original: f64) -> [String; 6] {
    [
        format!("{:.5}", original),
        format!("{:.5}", original - f64::copysign(0.000005, original)),
        format!("{:.4}", original),
        format!("{:.4}", original - f64::copysign(0.00005, original)),
        format!("{:.3}", original),
        format!("{:.3}", original - f64::copysign(0.0005, original)),
    ]
}

/// Could the template's coordinates be a mechanically rounded copy of the
/// originally recorded position? Such values carry no human creativity, so
/// overwriting them loses nothing.
pub fn matches_rounded_original(
    original_lat: f64,
    original_lon: f64,
    candidate: &ExistingLocation,
) -> bool {
    possible_roundings(original_lat)
        .iter()
        .any(|rounded| *rounded == candidate.latitude)
        && possible_roundings(original_lon)
            .iter()
            .any(|rounded| *rounded == candidate.longitude)
}

/// A structured geocoordinate statement, reduced to the fields the
/// equivalence check needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub property: String,
    pub latitude: f64,
    pub longitude: f64,
    pub globe: String,
    pub heading: Option<f64>,
    /// True when qualifiers other than the heading are attached.
    pub extra_qualifiers: bool,
}

impl Statement {
    /// Pull the relevant fields out of one statement of an SDC entity's
    /// JSON. Returns None when the value is not a coordinate statement.
    pub fn from_sdc(value: &Value) -> Option<Self> {
        let mainsnak = value.get("mainsnak")?;
        let coordinate = mainsnak.get("datavalue")?.get("value")?;
        let qualifier_order: Vec<&str> = value
            .get("qualifiers-order")
            .and_then(Value::as_array)
            .map(|order| order.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let heading = value
            .get("qualifiers")
            .and_then(|qualifiers| qualifiers.get(HEADING_QUALIFIER))
            .and_then(|headings| headings.get(0))
            .and_then(|snak| snak.get("datavalue")?.get("value")?.get("amount")?.as_str())
            .and_then(|amount| amount.trim_start_matches('+').parse().ok());
        Some(Statement {
            property: mainsnak.get("property")?.as_str()?.to_string(),
            latitude: coordinate.get("latitude")?.as_f64()?,
            longitude: coordinate.get("longitude")?.as_f64()?,
            globe: coordinate.get("globe")?.as_str()?.to_string(),
            heading,
            extra_qualifiers: qualifier_order
                .iter()
                .any(|&qualifier| qualifier != HEADING_QUALIFIER),
        })
    }
}

/// Does a structured statement say the same thing as the wikitext template
/// for its role? Precision is advisory on both sides and takes no part.
pub fn statement_matches_template(statement: &Statement, template: &ExistingLocation) -> bool {
    if statement.property != template.role.property_id() {
        return false;
    }
    if statement.globe != EARTH {
        return false;
    }
    let Some((lat, lon)) = template.coords() else {
        return false;
    };
    if lat != statement.latitude || lon != statement.longitude {
        return false;
    }
    if let Some(bearing) = statement.heading {
        if statement.extra_qualifiers {
            return false;
        }
        // A template without a heading parameter is ambiguous rather than
        // contradictory; only a differing value is a mismatch.
        if let Some(heading) = template.provenance().heading {
            if f64::from(heading) != bearing {
                return false;
            }
        }
    }
    true
}

/// Hard stop when a statement and its paired template disagree: guessing
/// which side is right is how bad coordinates spread.
pub fn verify_statement(
    statement: &Statement,
    template: &ExistingLocation,
) -> Result<(), LocationError> {
    if statement_matches_template(statement, template) {
        Ok(())
    } else {
        Err(LocationError::StatementMismatch(template.role))
    }
}
