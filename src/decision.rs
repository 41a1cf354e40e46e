use tracing::info;

use crate::error::LocationError;
use crate::model::{ExistingLocation, LocationFact, Role};
use crate::transform::GeodesyProvider;

/// How far an updated fact moved, for edit summaries.
#[derive(Debug, Clone, Copy)]
pub struct Move {
    pub azimuth: f64,
    pub back_azimuth: f64,
    pub distance: f64,
}

/// Why a role was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    /// Neither an existing nor a computed fact.
    BothAbsent,
    /// The existing template already says exactly what we would write.
    Identical,
    /// Some existing geocoding was entered by hand; never clobber it.
    ForeignProvenance,
    /// Degrees/minutes/seconds template with no grid reference: not safely
    /// comparable.
    DmsWithoutGridRef,
    /// Coordinates on the page are not decimal numbers.
    NotComparable,
    /// Moved less than the new fact's claimed precision: jitter, not signal.
    SubPrecisionMove,
    /// The grid reference recorded on the page has not changed.
    SourceUnchanged,
}

#[derive(Debug, Clone, Copy)]
pub enum Decision {
    Add,
    Update(Move),
    Remove,
    NoChange(HoldReason),
}

impl Decision {
    pub fn is_change(&self) -> bool {
        !matches!(self, Decision::NoChange(_))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Decisions {
    pub camera: Decision,
    pub object: Decision,
}

impl Decisions {
    pub fn any_change(&self) -> bool {
        self.camera.is_change() || self.object.is_change()
    }
}

/// Decides, per page and per role, whether to add, update or remove a
/// location fact. Pure given its inputs, so a page whose latest revision
/// changed underneath us can simply be re-read and re-decided.
pub struct DecisionEngine<'a, G> {
    geodesy: &'a G,
}

impl<'a, G: GeodesyProvider> DecisionEngine<'a, G> {
    pub fn new(geodesy: &'a G) -> Self {
        Self { geodesy }
    }

    pub fn decide(
        &self,
        existing_camera: Option<&ExistingLocation>,
        existing_object: Option<&ExistingLocation>,
        new_camera: Option<&LocationFact>,
        new_object: Option<&LocationFact>,
    ) -> Result<Decisions, LocationError> {
        if existing_camera.is_none() && existing_object.is_none() {
            // Nothing geocoded at all yet: add whatever the archive gives us.
            let add_if = |fact: Option<&LocationFact>| match fact {
                Some(_) => Decision::Add,
                None => Decision::NoChange(HoldReason::BothAbsent),
            };
            return Ok(Decisions {
                camera: add_if(new_camera),
                object: add_if(new_object),
            });
        }

        // Never touch a page where either role was geocoded by hand, even if
        // only the other role needs work.
        let foreign = [existing_camera, existing_object]
            .into_iter()
            .flatten()
            .any(|existing| !existing.is_archive_provenanced());
        if foreign {
            info!("existing geocoding is not from the archive: leaving both roles alone");
            return Ok(Decisions {
                camera: Decision::NoChange(HoldReason::ForeignProvenance),
                object: Decision::NoChange(HoldReason::ForeignProvenance),
            });
        }

        Ok(Decisions {
            camera: self.decide_role(Role::Camera, existing_camera, new_camera)?,
            object: self.decide_role(Role::Object, existing_object, new_object)?,
        })
    }

    fn decide_role(
        &self,
        role: Role,
        existing: Option<&ExistingLocation>,
        candidate: Option<&LocationFact>,
    ) -> Result<Decision, LocationError> {
        let (existing, candidate) = match (existing, candidate) {
            (None, None) => return Ok(Decision::NoChange(HoldReason::BothAbsent)),
            (None, Some(_)) => return Ok(Decision::Add),
            // The archive no longer yields this fact (or its precision
            // collapsed below the acceptable floor and the builder dropped
            // it): the stale template goes.
            (Some(_), None) => return Ok(Decision::Remove),
            (Some(existing), Some(candidate)) => (existing, candidate),
        };

        if existing.matches_fact(candidate) {
            return Ok(Decision::NoChange(HoldReason::Identical));
        }

        let provenance = existing.provenance();
        if !provenance.has_grid_reference() {
            if existing.dms {
                info!("{role} template is DMS with no gridref: not updating");
                return Ok(Decision::NoChange(HoldReason::DmsWithoutGridRef));
            }
            let Some(from) = existing.coords() else {
                info!("{role} template coordinates are not decimal: not updating");
                return Ok(Decision::NoChange(HoldReason::NotComparable));
            };
            let movement = self.move_between(from, candidate)?;
            if movement.distance < candidate.precision {
                info!(
                    "{role} has only moved by {:.0} m: not updating",
                    movement.distance
                );
                return Ok(Decision::NoChange(HoldReason::SubPrecisionMove));
            }
        }
        if provenance.source == candidate.provenance.source {
            info!("{role} gridref unchanged: not updating");
            return Ok(Decision::NoChange(HoldReason::SourceUnchanged));
        }

        match existing.coords() {
            Some(from) => Ok(Decision::Update(self.move_between(from, candidate)?)),
            None => {
                info!("{role} template coordinates are not decimal: not updating");
                Ok(Decision::NoChange(HoldReason::NotComparable))
            }
        }
    }

    fn move_between(
        &self,
        from: (f64, f64),
        candidate: &LocationFact,
    ) -> Result<Move, LocationError> {
        let (lat, lon) = candidate.coords();
        let (azimuth, back_azimuth, distance) = self.geodesy.inverse(from.0, from.1, lat, lon)?;
        Ok(Move {
            azimuth,
            back_azimuth,
            distance,
        })
    }
}
