use std::collections::BTreeMap;

use actix_web::http::StatusCode;
use actix_web::{middleware, web, App, HttpResponse, HttpServer, ResponseError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::assignment::{
    AssignError, AssignableUnit, AssignmentEngine, ErrorKind, FallbackOccupancyGenerator, Period,
    SeedPolicy, ShiftWindow, Slot, SlotId, UnitId,
};
use crate::directory::Directory;
use crate::source::{seed_section, OccupancySource, SourceError};

/// Shared state handed to every handler. Built once at startup.
pub struct AppState {
    pub engine: AssignmentEngine,
    pub directory: Directory,
    pub source: Box<dyn OccupancySource + Send + Sync>,
    pub generator: FallbackOccupancyGenerator,
    pub seed_policy: SeedPolicy,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Assign(#[from] AssignError),

    #[error("unknown unit {0}")]
    UnknownUnit(UnitId),

    #[error("unknown slot {0}")]
    UnknownSlot(SlotId),

    #[error("unknown section {0}")]
    UnknownSection(String),

    #[error("date and shift must be given together")]
    InvalidPeriod,

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Assign(err) => err.code(),
            ApiError::UnknownUnit(_) => "UnknownUnit",
            ApiError::UnknownSlot(_) => "UnknownSlot",
            ApiError::UnknownSection(_) => "UnknownSection",
            ApiError::InvalidPeriod => "InvalidPeriod",
            ApiError::Source(SourceError::UnknownSection(_)) => "UnknownSection",
            ApiError::Source(_) => "Internal",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Assign(err) => err.user_message(),
            ApiError::Source(SourceError::UnknownSection(section)) => {
                format!("unknown section {}", section)
            }
            ApiError::Source(_) => "Something went wrong, please try again".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Assign(err) => match err.kind() {
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Ineligible => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::UnknownUnit(_) | ApiError::UnknownSlot(_) | ApiError::UnknownSection(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::InvalidPeriod => StatusCode::BAD_REQUEST,
            ApiError::Source(SourceError::UnknownSection(_)) => StatusCode::NOT_FOUND,
            ApiError::Source(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        HttpResponse::build(status).json(serde_json::json!({
            "success": false,
            "error": self.code(),
            "message": self.message(),
        }))
    }
}

/// Period fields shared by request bodies and query strings. Both absent
/// means an open-ended (housing) period.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodParams {
    date: Option<NaiveDate>,
    shift: Option<ShiftWindow>,
}

impl PeriodParams {
    fn period(&self) -> Result<Period, ApiError> {
        match (self.date, self.shift) {
            (Some(date), Some(shift)) => Ok(Period::shift(date, shift)),
            (None, None) => Ok(Period::Indefinite),
            _ => Err(ApiError::InvalidPeriod),
        }
    }
}

#[derive(Deserialize)]
pub struct AssignRequest {
    unit_id: UnitId,
    slot_id: SlotId,
    #[serde(flatten)]
    period: PeriodParams,
}

#[derive(Deserialize)]
pub struct MoveRequest {
    unit_id: UnitId,
    from_slot: SlotId,
    to_slot: SlotId,
    #[serde(flatten)]
    period: PeriodParams,
}

#[derive(Deserialize)]
pub struct ReleaseRequest {
    unit_id: UnitId,
    slot_id: SlotId,
    #[serde(flatten)]
    period: PeriodParams,
}

#[derive(Serialize)]
pub struct SectionStats {
    slots: usize,
    occupied: usize,
    capacity: usize,
    full_slots: usize,
    synthetic: bool,
}

impl AppState {
    fn unit(&self, id: &UnitId) -> Result<&AssignableUnit, ApiError> {
        self.directory
            .unit(id)
            .ok_or_else(|| ApiError::UnknownUnit(id.clone()))
    }

    fn slot(&self, id: &SlotId) -> Result<&Slot, ApiError> {
        self.directory
            .slot(id)
            .ok_or_else(|| ApiError::UnknownSlot(id.clone()))
    }

    fn section_slots(&self, section: &str) -> Result<Vec<&Slot>, ApiError> {
        let slots = self.directory.slots_in_section(section);
        if slots.is_empty() {
            return Err(ApiError::UnknownSection(section.to_string()));
        }
        Ok(slots)
    }
}

async fn assign(
    req: web::Json<AssignRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let period = req.period.period()?;
    let unit = state.unit(&req.unit_id)?;
    let slot = state.slot(&req.slot_id)?;

    let outcome = state.engine.assign(unit, slot, &period)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "changed": outcome.changed,
        "snapshot": outcome.snapshot,
    })))
}

async fn move_unit(
    req: web::Json<MoveRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let period = req.period.period()?;
    let unit = state.unit(&req.unit_id)?;
    let from = state.slot(&req.from_slot)?;
    let to = state.slot(&req.to_slot)?;

    let outcome = state.engine.move_unit(unit, from, to, &period)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "changed": outcome.changed,
        "source": outcome.source,
        "destination": outcome.destination,
    })))
}

async fn release(
    req: web::Json<ReleaseRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let period = req.period.period()?;
    let slot = state.slot(&req.slot_id)?;

    // Release works on ids alone so records for departed units can be cleared
    let snapshot = state.engine.release(&req.unit_id, slot, &period)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "snapshot": snapshot,
    })))
}

async fn slot_occupancy(
    slot_id: web::Path<String>,
    query: web::Query<PeriodParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let period = query.period()?;
    let slot = state.slot(&SlotId::new(slot_id.into_inner()))?;
    Ok(HttpResponse::Ok().json(state.engine.occupancy(slot, &period)))
}

async fn section_occupancy(
    section: web::Path<String>,
    query: web::Query<PeriodParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let period = query.period()?;
    let slots = state.section_slots(&section)?;
    let snapshots = state.engine.occupancy_of_section(slots, &period);
    let synthetic = snapshots.iter().any(|s| s.synthetic);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "section": section.as_str(),
        "synthetic": synthetic,
        "slots": snapshots,
    })))
}

// Pulls the section from the authoritative source, generating occupancy if
// the source is down
async fn load_section(
    section: web::Path<String>,
    query: web::Query<PeriodParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let period = query.period()?;
    let report = seed_section(
        &state.engine,
        &state.directory,
        state.source.as_ref(),
        &state.generator,
        state.seed_policy,
        &section,
        &period,
    )?;
    info!(section = %section.as_str(), %period, synthetic = report.synthetic, "Section loaded");
    Ok(HttpResponse::Ok().json(report))
}

async fn get_stats(
    query: web::Query<PeriodParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let period = query.period()?;
    let mut stats: BTreeMap<String, SectionStats> = BTreeMap::new();

    for slot in state.directory.slots() {
        let section = slot.section.clone().unwrap_or_else(|| "unassigned".to_string());
        let snapshot = state.engine.occupancy(slot, &period);
        let entry = stats.entry(section).or_insert_with(|| SectionStats {
            slots: 0,
            occupied: 0,
            capacity: 0,
            full_slots: 0,
            synthetic: false,
        });
        entry.slots += 1;
        entry.occupied += snapshot.count;
        entry.capacity += snapshot.capacity;
        if snapshot.count >= snapshot.capacity {
            entry.full_slots += 1;
        }
        entry.synthetic |= snapshot.synthetic;
    }

    Ok(HttpResponse::Ok().json(stats))
}

/// Registers the API routes; shared by the server and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/assign", web::post().to(assign))
        .route("/api/move", web::post().to(move_unit))
        .route("/api/release", web::post().to(release))
        .route("/api/stats", web::get().to(get_stats))
        .route("/api/occupancy/slot/{slot_id}", web::get().to(slot_occupancy))
        .route("/api/occupancy/section/{section}", web::get().to(section_occupancy))
        .route("/api/sections/{section}/load", web::post().to(load_section));
}

pub async fn start_server(port: u16, state: web::Data<AppState>) -> std::io::Result<()> {
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
