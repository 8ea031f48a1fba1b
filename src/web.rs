// Web front end - axum pages and JSON API over the inventory
// Machines live at the root and purchases under `/purchases`; both get the same pages:
//
//   GET      /             listing with total quantity
//   GET/POST /add          add form
//   GET/POST /edit/:id     edit form
//   GET      /delete/:id   delete, then back to the listing
//   GET      /export       download the collection as CSV
//   GET/POST /import       upload a CSV file
//   GET      /api/machines JSON listing (also /api/purchases)
//
// Form text is turned into integers here; anything that does not parse comes
// back to the user as a 400 page instead of reaching the service.

use axum::{
    extract::{DefaultBodyLimit, Form, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use chrono::Local;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::error::{InventoryError, Result};
use crate::inventory::{Inventory, Listing};
use crate::models::{Machine, MachineFields, Purchase, PurchaseFields, Record};
use crate::uploads::UploadArea;

const UPLOAD_LIMIT: usize = 16 * 1024 * 1024;
const CLOSE_POLL: Duration = Duration::from_millis(25);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub inventory: Arc<Inventory>,
    pub uploads: UploadArea,
}

impl AppState {
    pub fn new(inventory: Inventory, uploads: UploadArea) -> Self {
        AppState {
            inventory: Arc::new(inventory),
            uploads,
        }
    }

    /// Close the store once every other handle to the inventory is gone.
    ///
    /// In-flight connections and import tasks may still hold clones after
    /// `serve` returns, so this polls until `grace` runs out. Returns
    /// `Ok(false)` if handles were still alive at the deadline; the store is
    /// then released by whoever drops the last one.
    pub async fn close(self, grace: Duration) -> Result<bool> {
        let deadline = Instant::now() + grace;
        let mut shared = self.inventory;

        loop {
            match Arc::try_unwrap(shared) {
                Ok(inventory) => {
                    inventory.close()?;
                    return Ok(true);
                }
                Err(still_shared) => {
                    if Instant::now() >= deadline {
                        return Ok(false);
                    }
                    shared = still_shared;
                    tokio::time::sleep(CLOSE_POLL).await;
                }
            }
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum WebError {
    Inventory(InventoryError),
    BadRequest(String),
    Internal(String),
}

impl From<InventoryError> for WebError {
    fn from(err: InventoryError) -> Self {
        WebError::Inventory(err)
    }
}

fn status_of(err: &InventoryError) -> StatusCode {
    match err {
        InventoryError::NotFound { .. } => StatusCode::NOT_FOUND,
        InventoryError::MalformedRow { .. } | InventoryError::Validation { .. } => {
            StatusCode::BAD_REQUEST
        }
        InventoryError::StorageUnavailable(_) | InventoryError::Io(_) | InventoryError::Csv(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl WebError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            WebError::Inventory(err) => (status_of(err), err.to_string()),
            WebError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            WebError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(%message, "request failed");
        } else {
            warn!(%message, "request rejected");
        }

        let body = format!(
            "<p class=\"error\">{}</p>\n<p><a href=\"javascript:history.back()\">Back</a> · <a href=\"/\">Machines</a></p>",
            escape(&message)
        );
        (status, page("Error", &body)).into_response()
    }
}

type WebResult<T> = std::result::Result<T, WebError>;

// ============================================================================
// Form parsing
// ============================================================================

fn required_text(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(InventoryError::validation(field, "is required")),
    }
}

fn parse_count(field: &str, value: Option<String>) -> Result<u32> {
    let text = required_text(field, value)?;
    text.parse::<u32>().map_err(|_| {
        InventoryError::validation(field, format!("'{}' is not a whole number", text))
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct MachineForm {
    name: Option<String>,
    quantity: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseForm {
    date: Option<String>,
    product_name: Option<String>,
    quantity: Option<String>,
    cost: Option<String>,
}

// ============================================================================
// Per-entity page wiring
// ============================================================================

/// What the web layer needs to know about an entity to serve its pages
pub trait WebEntity: Record + Send + Sync + 'static {
    type Form: DeserializeOwned + Send + 'static;

    /// Route prefix; empty for machines
    const BASE: &'static str;

    fn parse_form(form: Self::Form) -> Result<Self::Fields>;

    fn cells(&self) -> Vec<String>;

    fn form_inputs(current: Option<&Self::Fields>) -> String;

    fn list_path() -> &'static str {
        if Self::BASE.is_empty() {
            "/"
        } else {
            Self::BASE
        }
    }
}

fn input(label: &str, name: &str, kind: &str, value: &str) -> String {
    format!(
        "<label>{} <input type=\"{}\" name=\"{}\" value=\"{}\" required></label><br>\n",
        label,
        kind,
        name,
        escape(value)
    )
}

fn optional_input(label: &str, name: &str, value: &str) -> String {
    format!(
        "<label>{} <input type=\"text\" name=\"{}\" value=\"{}\"></label><br>\n",
        label,
        name,
        escape(value)
    )
}

impl WebEntity for Machine {
    type Form = MachineForm;

    const BASE: &'static str = "";

    fn parse_form(form: MachineForm) -> Result<MachineFields> {
        Ok(MachineFields {
            name: required_text("name", form.name)?,
            quantity: parse_count("quantity", form.quantity)?,
        })
    }

    fn cells(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.clone(), self.quantity.to_string()]
    }

    fn form_inputs(current: Option<&MachineFields>) -> String {
        let name = current.map(|f| f.name.clone()).unwrap_or_default();
        let quantity = current.map(|f| f.quantity.to_string()).unwrap_or_default();
        input("Name", "name", "text", &name) + &input("Quantity", "quantity", "number", &quantity)
    }
}

impl WebEntity for Purchase {
    type Form = PurchaseForm;

    const BASE: &'static str = "/purchases";

    fn parse_form(form: PurchaseForm) -> Result<PurchaseFields> {
        Ok(PurchaseFields {
            // Free text, like everywhere else a purchase is created
            date: form.date.unwrap_or_default().trim().to_string(),
            product_name: required_text("product_name", form.product_name)?,
            quantity: parse_count("quantity", form.quantity)?,
            cost: parse_count("cost", form.cost)?,
        })
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.date.clone(),
            self.product_name.clone(),
            self.quantity.to_string(),
            self.cost.to_string(),
        ]
    }

    fn form_inputs(current: Option<&PurchaseFields>) -> String {
        let date = current.map(|f| f.date.clone()).unwrap_or_default();
        let product = current.map(|f| f.product_name.clone()).unwrap_or_default();
        let quantity = current.map(|f| f.quantity.to_string()).unwrap_or_default();
        let cost = current.map(|f| f.cost.to_string()).unwrap_or_default();
        [
            optional_input("Date", "date", &date),
            input("Product", "product_name", "text", &product),
            input("Quantity", "quantity", "number", &quantity),
            input("Cost", "cost", "number", &cost),
        ]
        .concat()
    }
}

// ============================================================================
// HTML
// ============================================================================

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n\
         <nav><a href=\"/\">Machines</a> | <a href=\"/purchases\">Purchases</a> | \
         <a href=\"/purchase_cost\">Purchase cost</a> | <a href=\"/revenue\">Revenue</a></nav>\n\
         <h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = escape(title),
        body = body
    ))
}

fn listing_body<R: WebEntity>(listing: &Listing<R>) -> String {
    let base = R::BASE;
    let mut html = format!(
        "<p><a href=\"{base}/add\">Add</a> | <a href=\"{base}/import\">Import CSV</a> | <a href=\"{base}/export\">Export CSV</a></p>\n<table>\n<tr>"
    );
    for column in R::csv_header() {
        html.push_str(&format!("<th>{}</th>", escape(column)));
    }
    html.push_str("<th></th></tr>\n");

    for record in &listing.records {
        html.push_str("<tr>");
        for cell in record.cells() {
            html.push_str(&format!("<td>{}</td>", escape(&cell)));
        }
        html.push_str(&format!(
            "<td><a href=\"{base}/edit/{id}\">Edit</a> <a href=\"{base}/delete/{id}\">Delete</a></td></tr>\n",
            id = record.id()
        ));
    }

    html.push_str(&format!(
        "</table>\n<p>Total quantity: {}</p>",
        listing.total_quantity
    ));
    html
}

// ============================================================================
// Page handlers
// ============================================================================

async fn list_page<R: WebEntity>(State(state): State<AppState>) -> WebResult<Html<String>> {
    let listing = state.inventory.list_with_total::<R>()?;
    Ok(page(R::COLLECTION.title(), &listing_body(&listing)))
}

async fn add_form<R: WebEntity>() -> Html<String> {
    let body = format!(
        "<form method=\"post\" action=\"{}/add\">\n{}<button type=\"submit\">Add</button>\n</form>",
        R::BASE,
        R::form_inputs(None)
    );
    page(&format!("Add to {}", R::COLLECTION.title()), &body)
}

async fn add_submit<R: WebEntity>(
    State(state): State<AppState>,
    Form(form): Form<R::Form>,
) -> WebResult<Redirect> {
    let fields = R::parse_form(form)?;
    state.inventory.add::<R>(&fields)?;
    Ok(Redirect::to(R::list_path()))
}

async fn edit_form<R: WebEntity>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> WebResult<Html<String>> {
    let record = state.inventory.get::<R>(id)?;
    let body = format!(
        "<form method=\"post\" action=\"{}/edit/{}\">\n{}<button type=\"submit\">Save</button>\n</form>",
        R::BASE,
        id,
        R::form_inputs(Some(&record.fields()))
    );
    Ok(page(&format!("Edit {} #{}", R::COLLECTION.table(), id), &body))
}

async fn edit_submit<R: WebEntity>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<R::Form>,
) -> WebResult<Redirect> {
    let fields = R::parse_form(form)?;
    state.inventory.edit::<R>(id, &fields)?;
    Ok(Redirect::to(R::list_path()))
}

async fn delete_record<R: WebEntity>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> WebResult<Redirect> {
    state.inventory.remove::<R>(id)?;
    Ok(Redirect::to(R::list_path()))
}

/// Stream the collection back as a download instead of writing it on the server
async fn export_csv<R: WebEntity>(State(state): State<AppState>) -> WebResult<impl IntoResponse> {
    let doc = state.inventory.export_all::<R>()?;
    let filename = format!(
        "{}_{}.csv",
        R::COLLECTION.file_stem(),
        Local::now().format("%Y%m%d_%H%M%S")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        doc,
    ))
}

async fn import_form<R: WebEntity>() -> Html<String> {
    let body = format!(
        "<p>Columns: {}</p>\n<form method=\"post\" action=\"{}/import\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"file\" accept=\".csv\" required>\n<button type=\"submit\">Import</button>\n</form>",
        escape(&R::COLUMNS.join(", ")),
        R::BASE
    );
    page(&format!("Import {}", R::COLLECTION.title()), &body)
}

async fn import_submit<R: WebEntity>(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> WebResult<Redirect> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| WebError::BadRequest(format!("Read error: {}", e)))?;
            upload = Some((name, bytes.to_vec()));
        }
    }

    let (name, bytes) = match upload {
        Some((name, bytes)) if !name.is_empty() => (name, bytes),
        _ => return Err(WebError::BadRequest("No file provided".to_string())),
    };

    let guard = state.uploads.stage(&name, &bytes)?;
    let inventory = Arc::clone(&state.inventory);

    // The guard moves into the blocking task and removes the file when it ends
    let count = tokio::task::spawn_blocking(move || inventory.import_file::<R>(guard.path()))
        .await
        .map_err(|e| WebError::Internal(format!("Import task failed: {}", e)))??;

    tracing::info!(file = %name, count, "upload imported");
    Ok(Redirect::to(R::list_path()))
}

async fn purchase_cost() -> Html<String> {
    page("Purchase cost", "<p>Purchase cost reporting is not available yet.</p>")
}

async fn revenue() -> Html<String> {
    page("Revenue", "<p>Revenue reporting is not available yet.</p>")
}

// ============================================================================
// JSON API
// ============================================================================

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/machines, /api/purchases
async fn api_list<R: WebEntity>(State(state): State<AppState>) -> Response {
    match state.inventory.list_with_total::<R>() {
        Ok(listing) => (StatusCode::OK, Json(ApiResponse::ok(listing))).into_response(),
        Err(e) => {
            error!(error = %e, "API listing failed");
            (status_of(&e), Json(ApiResponse::<()>::err(e.to_string()))).into_response()
        }
    }
}

// ============================================================================
// Router
// ============================================================================

fn entity_routes<R: WebEntity>() -> Router<AppState> {
    Router::new()
        .route("/", get(list_page::<R>))
        .route("/add", get(add_form::<R>).post(add_submit::<R>))
        .route("/edit/:id", get(edit_form::<R>).post(edit_submit::<R>))
        .route("/delete/:id", get(delete_record::<R>))
        .route("/export", get(export_csv::<R>))
        .route("/import", get(import_form::<R>).post(import_submit::<R>))
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/machines", get(api_list::<Machine>))
        .route("/purchases", get(api_list::<Purchase>))
        .layer(CorsLayer::permissive());

    Router::new()
        .merge(entity_routes::<Machine>())
        .nest(Purchase::BASE, entity_routes::<Purchase>())
        .route("/purchase_cost", get(purchase_cost))
        .route("/revenue", get(revenue))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const BOUNDARY: &str = "XINVENTORYBOUNDARY";

    fn test_app() -> (Router, AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let inventory = Inventory::new(Store::open_in_memory().unwrap());
        let state = AppState::new(inventory, UploadArea::new(dir.path().join("uploads")));
        (router(state.clone()), state, dir)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>, String) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let location = resp
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, location, String::from_utf8(body.to_vec()).unwrap())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn form_req(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn upload_req(uri: &str, filename: &str, contents: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = filename,
            c = contents
        );
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let (app, _, _dir) = test_app();
        let (status, _, body) = send(&app, get_req("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Total quantity: 0"));
    }

    #[tokio::test]
    async fn test_add_redirects_to_listing() {
        let (app, state, _dir) = test_app();

        let (status, location, _) = send(&app, form_req("/add", "name=Drill&quantity=5")).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/"));

        send(&app, form_req("/add", "name=Saw&quantity=3")).await;
        let listing = state.inventory.list_with_total::<Machine>().unwrap();
        assert_eq!(listing.total_quantity, 8);

        let (_, _, body) = send(&app, get_req("/")).await;
        assert!(body.contains("Drill"));
        assert!(body.contains("Total quantity: 8"));
    }

    #[tokio::test]
    async fn test_add_non_numeric_quantity_is_user_error() {
        let (app, state, _dir) = test_app();

        let (status, _, body) = send(&app, form_req("/add", "name=Drill&quantity=five")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("quantity"));
        assert_eq!(state.inventory.store().count::<Machine>().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_add_missing_field_is_user_error() {
        let (app, _, _dir) = test_app();
        let (status, _, body) = send(&app, form_req("/add", "name=Drill")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("is required"));
    }

    #[tokio::test]
    async fn test_purchase_date_is_optional() {
        let (app, state, _dir) = test_app();

        let (status, location, _) = send(
            &app,
            form_req("/purchases/add", "date=&product_name=Drill&quantity=2&cost=300"),
        )
        .await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/purchases"));

        let (status, _, _) = send(
            &app,
            form_req("/purchases/add", "product_name=Saw&quantity=1&cost=90"),
        )
        .await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let listing = state.inventory.list_with_total::<Purchase>().unwrap();
        assert_eq!(listing.records.len(), 2);
        assert_eq!(listing.records[0].date, "");
        assert_eq!(listing.records[1].date, "");
    }

    #[tokio::test]
    async fn test_edit_and_delete() {
        let (app, state, _dir) = test_app();
        let id = state
            .inventory
            .add::<Machine>(&MachineFields::new("Drill", 5))
            .unwrap();

        let (status, _, body) = send(&app, get_req(&format!("/edit/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("value=\"Drill\""));

        let (status, _, _) =
            send(&app, form_req(&format!("/edit/{}", id), "name=Press&quantity=2")).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(state.inventory.get::<Machine>(id).unwrap().name, "Press");

        let (status, location, _) = send(&app, get_req(&format!("/delete/{}", id))).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/"));

        let (status, _, _) = send(&app, get_req(&format!("/delete/{}", id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_edit_missing_is_not_found() {
        let (app, _, _dir) = test_app();
        let (status, _, body) = send(&app, get_req("/edit/42")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("not found"));
    }

    #[tokio::test]
    async fn test_export_is_download() {
        let (app, _, _dir) = test_app();
        let resp = app.clone().oneshot(get_req("/export")).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let disposition = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"machines_"));

        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"id,name,quantity\n");
    }

    #[tokio::test]
    async fn test_purchase_import_cleans_up_upload() {
        let (app, state, dir) = test_app();
        let doc = "date,product_name,quantity,cost\n2024-01-05,Drill,2,300\n2024-01-06,Saw,1,90";

        let (status, location, _) =
            send(&app, upload_req("/purchases/import", "purchases.csv", doc)).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/purchases"));

        let listing = state.inventory.list_with_total::<Purchase>().unwrap();
        assert_eq!(listing.records.len(), 2);
        assert_eq!(listing.total_quantity, 3);

        let leftover = std::fs::read_dir(dir.path().join("uploads")).unwrap().count();
        assert_eq!(leftover, 0, "Staged upload should be removed");
    }

    #[tokio::test]
    async fn test_malformed_import_is_user_error_and_cleans_up() {
        let (app, state, dir) = test_app();

        let (status, _, body) =
            send(&app, upload_req("/import", "machines.csv", "name,quantity\nBolt,many")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("line 2"));
        assert_eq!(state.inventory.store().count::<Machine>().unwrap(), 0);

        let leftover = std::fs::read_dir(dir.path().join("uploads")).unwrap().count();
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn test_import_rejects_non_csv_name() {
        let (app, _, _dir) = test_app();
        let (status, _, body) =
            send(&app, upload_req("/import", "machines.txt", "name,quantity\nBolt,1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains(".csv"));
    }

    #[tokio::test]
    async fn test_api_listing() {
        let (app, state, _dir) = test_app();
        state
            .inventory
            .add::<Machine>(&MachineFields::new("Drill", 5))
            .unwrap();

        let (status, _, body) = send(&app, get_req("/api/machines")).await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["total_quantity"], 5);
        assert_eq!(json["data"]["records"][0]["name"], "Drill");
    }

    #[tokio::test]
    async fn test_close_waits_for_late_handles() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(
            Inventory::new(Store::open_in_memory().unwrap()),
            UploadArea::new(dir.path()),
        );
        let held = state.inventory.clone();
        let worker = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            drop(held);
        });

        assert!(state.close(Duration::from_secs(2)).await.unwrap());
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_close_gives_up_after_grace() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(
            Inventory::new(Store::open_in_memory().unwrap()),
            UploadArea::new(dir.path()),
        );
        let held = state.inventory.clone();

        assert!(!state.close(Duration::from_millis(50)).await.unwrap());
        // The remaining handle still works and releases the store on drop
        assert!(held.list_with_total::<Machine>().unwrap().records.is_empty());
    }

    #[tokio::test]
    async fn test_placeholder_pages() {
        let (app, _, _dir) = test_app();
        for uri in ["/purchase_cost", "/revenue"] {
            let (status, _, _) = send(&app, get_req(uri)).await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>\"Saw\" & Co</b>"), "&lt;b&gt;&quot;Saw&quot; &amp; Co&lt;/b&gt;");
    }
}
