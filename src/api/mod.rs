use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::core::{
    AmortizationRow, LoanError, LoanType, ProductCatalog, RiskBand, SimulationRequest,
    calculate_amortization_schedule, simulate,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    #[serde(alias = "product_id")]
    product_id: Option<u32>,
    #[serde(alias = "loan_type")]
    loan_type: Option<LoanType>,
    #[serde(alias = "loan_amount")]
    loan_amount: Option<f64>,
    #[serde(
        alias = "loan_term_months",
        alias = "termMonths",
        alias = "term_months"
    )]
    loan_term_months: Option<u32>,
    #[serde(alias = "annualIncome", alias = "annual_income")]
    income: Option<f64>,
    #[serde(alias = "property_value")]
    property_value: Option<f64>,
    #[serde(alias = "risk_band")]
    risk_band: Option<RiskBand>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AmortizationQuery {
    #[serde(alias = "loanAmount", alias = "loan_amount")]
    amount: Option<f64>,
    #[serde(alias = "annualRate", alias = "annual_rate")]
    rate: Option<f64>,
    #[serde(alias = "term_months", alias = "term")]
    term_months: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ServiceInfo {
    message: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AmortizationResponse {
    amount: f64,
    rate: f64,
    term_months: u32,
    rows: Vec<AmortizationRow>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(catalog: Arc<ProductCatalog>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/loan-products", get(list_products_handler))
        .route("/api/loan-products/:id", get(get_product_handler))
        .route("/api/simulations", post(simulate_handler))
        .route("/api/amortization", get(amortization_handler))
        .fallback(not_found_handler)
        .with_state(catalog)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_http_server(addr: SocketAddr, catalog: ProductCatalog) -> std::io::Result<()> {
    if catalog.is_empty() {
        warn!("product catalog is empty; every simulation will return 404");
    } else {
        info!(products = catalog.len(), "product catalog ready");
    }
    let app = router(Arc::new(catalog));

    let listener = TcpListener::bind(addr).await?;
    info!("loan-sim HTTP API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn index_handler() -> Response {
    json_response(
        StatusCode::OK,
        ServiceInfo {
            message: "Loan Simulator API",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

async fn health_handler() -> Response {
    json_response(
        StatusCode::OK,
        HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn list_products_handler(State(catalog): State<Arc<ProductCatalog>>) -> Response {
    let products: Vec<_> = catalog.active().collect();
    json_response(StatusCode::OK, products)
}

async fn get_product_handler(
    State(catalog): State<Arc<ProductCatalog>>,
    Path(id): Path<u32>,
) -> Response {
    match catalog.get(id) {
        Ok(product) => json_response(StatusCode::OK, product),
        Err(err) => loan_error_response(&err),
    }
}

async fn simulate_handler(
    State(catalog): State<Arc<ProductCatalog>>,
    Json(payload): Json<SimulatePayload>,
) -> Response {
    let request = match simulation_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let outcome = catalog
        .get(request.product_id)
        .and_then(|product| simulate(product, &request));
    match outcome {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(err) => {
            debug!(product_id = request.product_id, %err, "simulation rejected");
            loan_error_response(&err)
        }
    }
}

async fn amortization_handler(Query(query): Query<AmortizationQuery>) -> Response {
    let (amount, rate, term_months) = match (query.amount, query.rate, query.term_months) {
        (Some(amount), Some(rate), Some(term_months)) => (amount, rate, term_months),
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "amount, rate and termMonths are required",
            );
        }
    };

    match calculate_amortization_schedule(amount, rate, term_months) {
        Ok(rows) => json_response(
            StatusCode::OK,
            AmortizationResponse {
                amount,
                rate,
                term_months,
                rows,
            },
        ),
        Err(err) => loan_error_response(&err),
    }
}

fn simulation_request_from_payload(payload: SimulatePayload) -> Result<SimulationRequest, String> {
    let product_id = payload
        .product_id
        .ok_or_else(|| "productId is required".to_string())?;
    let loan_amount = payload
        .loan_amount
        .ok_or_else(|| "loanAmount is required".to_string())?;
    let term_months = payload
        .loan_term_months
        .ok_or_else(|| "loanTermMonths is required".to_string())?;
    let annual_income = payload
        .income
        .ok_or_else(|| "income is required".to_string())?;

    if !loan_amount.is_finite() || loan_amount <= 0.0 {
        return Err("loanAmount must be > 0".to_string());
    }
    if term_months == 0 {
        return Err("loanTermMonths must be > 0".to_string());
    }
    if !annual_income.is_finite() || annual_income <= 0.0 {
        return Err("income must be > 0".to_string());
    }

    Ok(SimulationRequest {
        product_id,
        loan_type: payload.loan_type,
        loan_amount,
        term_months,
        annual_income,
        property_value: payload.property_value,
        risk_band: payload.risk_band,
    })
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn loan_error_response(err: &LoanError) -> Response {
    let status = match err {
        LoanError::ProductNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    error_response(status, &err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn payload_from_json(json: &str) -> Result<SimulationRequest, String> {
        let payload = serde_json::from_str::<SimulatePayload>(json)
            .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
        simulation_request_from_payload(payload)
    }

    fn test_app() -> Router {
        router(Arc::new(ProductCatalog::seeded()))
    }

    async fn send(request: Request<Body>) -> (StatusCode, Option<HeaderValue>, Value) {
        let response = test_app().oneshot(request).await.expect("infallible service");
        let status = response.status();
        let cache_control = response.headers().get(header::CACHE_CONTROL).cloned();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("readable body")
            .to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, cache_control, json)
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("valid request");
        let (status, _, json) = send(request).await;
        (status, json)
    }

    async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request");
        let (status, _, json) = send(request).await;
        (status, json)
    }

    #[test]
    fn payload_parses_camel_case_keys() {
        let request = payload_from_json(
            r#"{
              "productId": 1,
              "loanType": "home",
              "loanAmount": 200000,
              "loanTermMonths": 360,
              "income": 120000,
              "propertyValue": 250000,
              "riskBand": "fair"
            }"#,
        )
        .expect("json should parse");

        assert_eq!(request.product_id, 1);
        assert_eq!(request.loan_type, Some(LoanType::Home));
        assert_approx(request.loan_amount, 200_000.0);
        assert_eq!(request.term_months, 360);
        assert_approx(request.annual_income, 120_000.0);
        assert_eq!(request.property_value, Some(250_000.0));
        assert_eq!(request.risk_band, Some(RiskBand::Fair));
    }

    #[test]
    fn payload_accepts_snake_case_keys() {
        let request = payload_from_json(
            r#"{
              "product_id": 3,
              "loan_type": "personal",
              "loan_amount": 5000,
              "loan_term_months": 24,
              "income": 40000
            }"#,
        )
        .expect("json should parse");

        assert_eq!(request.product_id, 3);
        assert_eq!(request.loan_type, Some(LoanType::Personal));
        assert_eq!(request.term_months, 24);
        assert_eq!(request.property_value, None);
        assert_eq!(request.risk_band, None);
    }

    #[test]
    fn payload_requires_core_fields() {
        let err = payload_from_json(r#"{"productId": 1, "loanAmount": 1000, "income": 5}"#)
            .expect_err("missing term");
        assert!(err.contains("loanTermMonths"));

        let err = payload_from_json(
            r#"{"productId": 1, "loanAmount": 1000, "loanTermMonths": 12, "income": 0}"#,
        )
        .expect_err("zero income");
        assert!(err.contains("income"));
    }

    #[tokio::test]
    async fn index_and_health_report_version() {
        let (status, json) = get_json("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Loan Simulator API");

        let (status, json) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
    }

    #[tokio::test]
    async fn lists_seeded_products() {
        let request = Request::builder()
            .uri("/api/loan-products")
            .body(Body::empty())
            .expect("valid request");
        let (status, cache_control, json) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache_control, Some(HeaderValue::from_static("no-store")));

        let products = json.as_array().expect("array of products");
        assert_eq!(products.len(), 3);
        assert_eq!(products[0]["name"], "Home Loan Standard");
        assert_eq!(products[0]["type"], "home");
        assert_eq!(products[0]["maxLtv"], 80.0);
        assert_eq!(products[2]["maxLtv"], Value::Null);
        assert_eq!(products[1]["riskBands"]["poor"], 3.0);
    }

    #[tokio::test]
    async fn get_product_by_id_or_404() {
        let (status, json) = get_json("/api/loan-products/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["type"], "vehicle");
        assert_eq!(json["baseRate"], 3.9);

        let (status, json) = get_json("/api/loan-products/99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().expect("message").contains("99"));
    }

    #[tokio::test]
    async fn simulation_returns_full_result() {
        let (status, json) = post_json(
            "/api/simulations",
            json!({
                "productId": 1,
                "loanType": "home",
                "loanAmount": 200000,
                "loanTermMonths": 360,
                "income": 120000,
                "propertyValue": 250000
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["interestRate"], 4.5);
        let payment = json["monthlyPayment"].as_f64().expect("payment");
        assert!((payment - 1_013.37).abs() < 0.005);
        assert_eq!(json["ltvRatio"], 80.0);
        assert_eq!(json["aprConverged"], true);
        let rows = json["amortization"].as_array().expect("rows");
        assert_eq!(rows.len(), 360);
        assert_eq!(rows[0]["month"], 1);
        assert_eq!(rows[0]["interest"], 750.0);
        assert_eq!(rows[359]["balance"], 0.0);
    }

    #[tokio::test]
    async fn simulation_rejections_map_to_status_codes() {
        let (status, json) = post_json(
            "/api/simulations",
            json!({
                "productId": 1,
                "loanAmount": 200000,
                "loanTermMonths": 360,
                "income": 120000,
                "propertyValue": 200000
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().expect("message").contains("Loan-to-Value"));

        let (status, json) = post_json(
            "/api/simulations",
            json!({
                "productId": 3,
                "loanAmount": 60000,
                "loanTermMonths": 36,
                "income": 90000
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Loan parameters out of allowed range");

        let (status, _) = post_json(
            "/api/simulations",
            json!({
                "productId": 9,
                "loanAmount": 6000,
                "loanTermMonths": 36,
                "income": 90000
            }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn amortization_endpoint_returns_rows() {
        let (status, json) = get_json("/api/amortization?amount=1200&rate=0&termMonths=12").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["termMonths"], 12);
        let rows = json["rows"].as_array().expect("rows");
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[11]["balance"], 0.0);

        let (status, json) = get_json("/api/amortization?amount=1200&rate=5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().expect("message").contains("termMonths"));

        let (status, _) = get_json("/api/amortization?amount=1200&rate=5&termMonths=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn amortization_endpoint_rejects_unschedulable_terms() {
        let (status, json) =
            get_json("/api/amortization?amount=1000&rate=0&termMonths=2000000000").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().expect("message").contains("term_months"));

        let (status, json) =
            get_json("/api/amortization?amount=1000&rate=0.000000000000001&termMonths=12").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().expect("message").contains("annual_rate_percent"));

        let (status, json) =
            get_json("/api/amortization?amount=1000&rate=5000&termMonths=1200").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().expect("message").contains("annual_rate_percent"));
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (status, json) = get_json("/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Not found");
    }
}
