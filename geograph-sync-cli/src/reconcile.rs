//! One full read-decide-apply cycle against a page held in a file. The
//! wiki client proper does the same dance against live pages; keeping the
//! cycle a pure function of (page text, archive row) is what makes
//! re-running it after an edit conflict safe.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use geograph_sync::document::{self, WikiDocument};
use geograph_sync::{
    summary, Decision, DecisionEngine, Decisions, LocationBuilder, LocationError, ProjGeodesy,
    RegionLookup, Role, SourceArchive, SourceRecord,
};

use crate::wikitext::SimpleWikiDocument;

/// Region lookup backed by an operator-supplied code. The live bot asks a
/// point-in-region service; offline we either know the area or skip it.
pub struct FixedRegionLookup(pub Option<String>);

impl RegionLookup for FixedRegionLookup {
    fn resolve(&self, _lat: f64, _lon: f64) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Archive mirror backed by a JSON file holding one row or an array of
/// rows, enough to reconcile pages offline.
pub struct JsonArchive {
    rows: Vec<SourceRecord>,
}

impl JsonArchive {
    pub fn from_json(json: &str) -> Result<Self> {
        let rows = match serde_json::from_str::<Vec<SourceRecord>>(json) {
            Ok(rows) => rows,
            Err(_) => vec![serde_json::from_str(json).context("parsing archive record")?],
        };
        Ok(Self { rows })
    }
}

impl SourceArchive for JsonArchive {
    fn lookup(&self, image_id: u64) -> Result<Option<SourceRecord>> {
        Ok(self
            .rows
            .iter()
            .find(|row| row.gridimage_id == image_id)
            .cloned())
    }
}

#[derive(Debug)]
pub struct Outcome {
    pub decisions: Decisions,
    pub summary: String,
    pub text: String,
    pub changed: bool,
}

pub fn reconcile_page(page: &Path, record: &Path, region: Option<String>) -> Result<Outcome> {
    let text = fs::read_to_string(page).with_context(|| format!("reading {}", page.display()))?;
    let rows = fs::read_to_string(record)
        .with_context(|| format!("reading {}", record.display()))?;
    let archive = JsonArchive::from_json(&rows)?;
    reconcile(&text, &archive, region)
}

pub fn reconcile<A: SourceArchive>(
    text: &str,
    archive: &A,
    region: Option<String>,
) -> Result<Outcome> {
    let mut doc = SimpleWikiDocument::parse(text);

    let image_id = document::image_id(&doc)?;
    info!("Geograph ID is {image_id}");
    let record = archive
        .lookup(image_id)?
        .ok_or(LocationError::NotInArchive(image_id))?;

    let geodesy = ProjGeodesy::new()?;
    let region = FixedRegionLookup(region);
    let builder = LocationBuilder::new(&geodesy, &region);
    let engine = DecisionEngine::new(&geodesy);

    let existing_camera = document::existing_location(&doc, Role::Camera)?;
    let existing_object = document::existing_location(&doc, Role::Object)?;
    info!("old camera: {existing_camera:?}");
    info!("old object: {existing_object:?}");

    // First pass without spending region lookups; they are only paid for
    // once we know we are going to write.
    let probe = builder.build(&record, false)?;
    let decisions = engine.decide(
        existing_camera.as_ref(),
        existing_object.as_ref(),
        probe.camera.as_ref(),
        probe.object.as_ref(),
    )?;
    info!("camera: {:?}", decisions.camera);
    info!("object: {:?}", decisions.object);

    if !decisions.any_change() {
        return Ok(Outcome {
            decisions,
            summary: String::new(),
            text: text.to_string(),
            changed: false,
        });
    }

    let facts = builder.build(&record, true)?;
    if decisions.camera.is_change() {
        document::set_location(&mut doc, Role::Camera, facts.camera.as_ref())?;
    }
    if decisions.object.is_change() {
        document::set_location(&mut doc, Role::Object, facts.object.as_ref())?;
    }

    let summary = edit_summary(&record, &decisions)?;
    info!("edit summary: {summary}");

    let new_text = doc.serialize();
    let changed = new_text != text;
    Ok(Outcome {
        decisions,
        summary,
        text: new_text,
        changed,
    })
}

fn edit_summary(record: &SourceRecord, decisions: &Decisions) -> Result<String> {
    let mut parts = Vec::new();
    for (role, decision) in [
        (Role::Camera, &decisions.camera),
        (Role::Object, &decisions.object),
    ] {
        match decision {
            Decision::Add => parts.push(format!("add {role} location")),
            Decision::Update(movement) => parts.push(format!(
                "update {role} location ({})",
                summary::describe_move(movement)
            )),
            Decision::Remove => parts.push(format!(
                "remove Geograph-derived {role} location (no longer on Geograph, or 1km precision)"
            )),
            Decision::NoChange(_) => {}
        }
    }
    if parts.is_empty() {
        return Ok(String::new());
    }
    let mut text = parts.join(" and ");
    if let Some(first) = text.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    text.push_str(&format!(", from Geograph ({})", summary::format_row(record)?));
    Ok(text)
}
