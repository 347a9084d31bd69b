use actix_cors::Cors;
use actix_web::error::{BlockingError, InternalError};
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use bioinsight_core::{
    Error, ModelContext, ModelKind, PredictionService, RecordStore, SearchFilter, SearchService,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Services shared by every worker
#[derive(Clone)]
pub struct AppState {
    pub predictions: PredictionService,
    pub search: SearchService,
}

impl AppState {
    pub fn new(models: Arc<ModelContext>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            predictions: PredictionService::new(models),
            search: SearchService::new(store),
        }
    }
}

pub struct RestApi;

impl RestApi {
    pub async fn start(state: AppState, host: &str, port: u16) -> std::io::Result<()> {
        info!("Binding HTTP API to {}:{}", host, port);
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .wrap(Logger::default())
                .app_data(web::Data::new(state.clone()))
                .configure(Self::configure)
        })
        .bind((host, port))?
        .run()
        .await
    }

    /// Register every route; shared by the server and the tests
    pub fn configure(cfg: &mut web::ServiceConfig) {
        let json_config = web::JsonConfig::default().error_handler(|err, _req| {
            let body = serde_json::json!({ "error": err.to_string() });
            InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
        });

        cfg.app_data(json_config)
            .route("/health", web::get().to(health))
            .route("/data/bioactivity", web::get().to(list_bioactivity))
            .route("/search", web::post().to(search))
            .route("/predict/logistic", web::post().to(predict_logistic))
            .route("/predict/xgboost", web::post().to(predict_xgboost))
            .route("/predict/best", web::post().to(predict_best))
            .route("/predict/explain", web::post().to(explain))
            .route("/models/metrics", web::get().to(model_metrics));
    }
}

async fn health() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}

async fn list_bioactivity(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let search = state.search.clone();
    Ok(respond(web::block(move || search.browse()).await))
}

async fn search(
    state: web::Data<AppState>,
    req: web::Json<SearchFilter>,
) -> ActixResult<HttpResponse> {
    let search = state.search.clone();
    let filter = req.into_inner();
    Ok(respond(web::block(move || search.search(&filter)).await))
}

async fn predict_logistic(
    state: web::Data<AppState>,
    req: web::Json<Value>,
) -> ActixResult<HttpResponse> {
    run_prediction(&state, ModelKind::Logistic, req.into_inner()).await
}

async fn predict_xgboost(
    state: web::Data<AppState>,
    req: web::Json<Value>,
) -> ActixResult<HttpResponse> {
    run_prediction(&state, ModelKind::Xgboost, req.into_inner()).await
}

async fn predict_best(
    state: web::Data<AppState>,
    req: web::Json<Value>,
) -> ActixResult<HttpResponse> {
    run_prediction(&state, ModelKind::BEST, req.into_inner()).await
}

async fn run_prediction(
    state: &AppState,
    kind: ModelKind,
    input: Value,
) -> ActixResult<HttpResponse> {
    let predictions = state.predictions.clone();
    Ok(respond(web::block(move || predictions.predict(kind, &input)).await))
}

async fn explain(
    state: web::Data<AppState>,
    req: web::Json<Value>,
) -> ActixResult<HttpResponse> {
    let predictions = state.predictions.clone();
    let input = req.into_inner();
    Ok(respond(web::block(move || predictions.explain(&input)).await))
}

async fn model_metrics(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.predictions.metrics()))
}

/// Map a blocking-pool result onto an HTTP response
fn respond<T: Serialize>(
    result: Result<bioinsight_core::Result<T>, BlockingError>,
) -> HttpResponse {
    match result {
        Ok(Ok(body)) => HttpResponse::Ok().json(body),
        Ok(Err(e)) if e.is_client_error() => HttpResponse::BadRequest().json(serde_json::json!({
            "error": e.to_string()
        })),
        Ok(Err(e)) => {
            warn!("Request failed: {}", e);
            internal_error(&e)
        }
        Err(e) => {
            warn!("Blocking task failed: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "worker pool unavailable"
            }))
        }
    }
}

fn internal_error(e: &Error) -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({
        "error": e.to_string()
    }))
}
