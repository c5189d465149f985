use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::excel::{ingest_directory, normalize_plate, write_artifact, CalamineReader};
use crate::schedule::board::{build_board, VehicleSnapshot};
use crate::schedule::compute_status;
use crate::store::{
    collection_source, current_odometer, load_service_sets, publish_service_sets, set_odometer, DocumentStore,
    SqliteStore,
};

/// Estado compartido por los handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: AppConfig,
    /// Fecha fija para los cálculos; `None` usa la fecha local.
    pub today: Option<NaiveDate>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: AppConfig) -> Self {
        AppState { store, config, today: None }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

#[derive(Deserialize)]
struct KmRequest {
    kilometers: f64,
}

async fn health_handler() -> impl Responder {
    HttpResponse::Ok().json(json!({"status": "ok"}))
}

/// POST /ingest
/// Lee el directorio de datos, escribe el artefacto JSON y publica en el almacén.
async fn ingest_handler(state: web::Data<AppState>) -> impl Responder {
    let set = ingest_directory(&CalamineReader, &state.config.data_dir);
    if let Err(e) = write_artifact(&set, &state.config.output_path) {
        error!("no se pudo escribir el artefacto: {}", e);
        return HttpResponse::InternalServerError().json(json!({"error": format!("failed to write artifact: {}", e)}));
    }
    if let Err(e) = publish_service_sets(&*state.store, &set) {
        return HttpResponse::InternalServerError().json(json!({"error": format!("failed to publish services: {}", e)}));
    }
    let services: usize = set.values().map(Vec::len).sum();
    info!("ingesta: {} vehículos, {} servicios", set.len(), services);
    HttpResponse::Ok().json(json!({"vehicles": set.len(), "services": services}))
}

/// GET /vehicles
async fn vehicles_handler(state: web::Data<AppState>) -> impl Responder {
    match load_service_sets(&*state.store) {
        Ok(set) => {
            let plates: Vec<&String> = set.keys().collect();
            HttpResponse::Ok().json(json!({"vehicles": plates}))
        }
        Err(e) => HttpResponse::InternalServerError().json(json!({"error": format!("failed to load services: {}", e)})),
    }
}

/// GET /vehicles/{plate}/services
/// Servicios del vehículo con su estado calculado para hoy.
async fn vehicle_services_handler(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let plate = normalize_plate(&path.into_inner());
    let mut set = match load_service_sets(&*state.store) {
        Ok(s) => s,
        Err(e) => return HttpResponse::InternalServerError().json(json!({"error": format!("failed to load services: {}", e)})),
    };
    let Some(services) = set.remove(&plate) else {
        return HttpResponse::NotFound().json(json!({"error": format!("unknown vehicle '{}'", plate)}));
    };
    let odometer = match current_odometer(&*state.store, &plate) {
        Ok(km) => km,
        Err(e) => return HttpResponse::InternalServerError().json(json!({"error": format!("failed to read odometer: {}", e)})),
    };

    let today = state.today();
    let out: Vec<serde_json::Value> = services
        .iter()
        .map(|svc| json!({"service": svc, "status": compute_status(svc, odometer, today)}))
        .collect();
    HttpResponse::Ok().json(json!({"vehicle": plate, "kilometers": odometer, "services": out}))
}

/// PUT /vehicles/{plate}/km
async fn set_km_handler(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<KmRequest>,
) -> impl Responder {
    let plate = normalize_plate(&path.into_inner());
    let km = body.kilometers;
    if plate.is_empty() || !km.is_finite() || km < 0.0 {
        return HttpResponse::BadRequest().json(json!({"error": "kilometers must be a non-negative number"}));
    }
    match set_odometer(&*state.store, &plate, km) {
        Ok(()) => HttpResponse::Ok().json(json!({"vehicle": plate, "kilometers": km})),
        Err(e) => HttpResponse::InternalServerError().json(json!({"error": format!("failed to store odometer: {}", e)})),
    }
}

/// GET /board
async fn board_handler(state: web::Data<AppState>) -> impl Responder {
    let store = &*state.store;
    let set = match load_service_sets(store) {
        Ok(s) => s,
        Err(e) => return HttpResponse::InternalServerError().json(json!({"error": format!("failed to load services: {}", e)})),
    };
    let mut snapshots = Vec::with_capacity(set.len());
    for (plate, services) in set {
        let odometer = match current_odometer(store, &plate) {
            Ok(km) => km,
            Err(e) => return HttpResponse::InternalServerError().json(json!({"error": format!("failed to read odometer: {}", e)})),
        };
        let source = match collection_source(store, &plate) {
            Ok(s) => s,
            Err(e) => return HttpResponse::InternalServerError().json(json!({"error": format!("failed to read vehicle: {}", e)})),
        };
        snapshots.push(VehicleSnapshot { plate, odometer, collection_source: source, services });
    }
    HttpResponse::Ok().json(build_board(&snapshots, state.today()))
}

async fn help_handler() -> impl Responder {
    let help = json!({
        "description": "Mantenimiento de flota: ingesta de exportaciones de servicio y cálculo de vencimientos.",
        "endpoints": {
            "GET /health": "estado del servicio",
            "POST /ingest": "lee el directorio de datos, escribe el artefacto JSON y publica los servicios",
            "GET /vehicles": "placas con servicios",
            "GET /vehicles/{plate}/services": "servicios del vehículo con su estado (nextTarget, remaining, classification, displayValue)",
            "PUT /vehicles/{plate}/km": "guarda el odómetro actual",
            "GET /board": "servicios dentro de la ventana de aviso, agrupados por categoría"
        },
        "km_example": {"kilometers": 120500}
    });
    HttpResponse::Ok().json(help)
}

/// Registra las rutas. El `AppState` se añade aparte con `app_data`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_handler))
        .route("/help", web::get().to(help_handler))
        .route("/ingest", web::post().to(ingest_handler))
        .route("/vehicles", web::get().to(vehicles_handler))
        .route("/vehicles/{plate}/services", web::get().to(vehicle_services_handler))
        .route("/vehicles/{plate}/km", web::put().to(set_km_handler))
        .route("/board", web::get().to(board_handler));
}

pub async fn run_server(config: AppConfig) -> std::io::Result<()> {
    let store = SqliteStore::open(&config.db_path).map_err(|e| std::io::Error::other(e.to_string()))?;
    let bind = config.bind.clone();
    let state = web::Data::new(AppState::new(Arc::new(store), config));

    info!("servidor escuchando en http://{}", bind);
    HttpServer::new(move || {
        // el panel web se sirve desde otro origen
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT"])
            .allow_any_header()
            .max_age(3600);
        App::new().wrap(cors).app_data(state.clone()).configure(configure)
    })
    .bind(bind.as_str())?
    .run()
    .await
}
