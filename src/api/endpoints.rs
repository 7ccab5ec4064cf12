use actix_multipart::Multipart;
use actix_web::{
    delete, get, post, put,
    web::{self, Path},
    HttpRequest, HttpResponse,
};
use chrono::Utc;
use futures_util::StreamExt;
use tracing::{instrument, Instrument};

use crate::{
    api::{
        rest::{
            GoogleAuthQuery, GoogleAuthResponse, OpdAddRequest, OpdResponse, OpdScopeQuery, PermissionListResponse, RecordDraftRequest, RecordPageResponse, RecordResponse,
            ResourceDescriptorResponse, UploadImageResponse,
        },
        security::SessionClaims,
        state::AppState,
    },
    model::{
        apperror::{ApplicationError, ErrorType},
        form::RecordForm,
        kinds::RecordKind,
        models::{AgencyRef, RecordDraft},
    },
    service::{
        permissions::PERMISSION_READ,
        resources::{describe, get_record_page},
        upload::{IMAGE_FIELD, ImageUploadService},
    },
};

/**
 * Registers every route. Fixed paths come before the generic `/api/{apiEndpoint}` routes they would otherwise collide with.
 */
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(opd_list)
        .service(opd_add)
        .service(opd_by_slug)
        .service(resources_list)
        .service(resource_get)
        .service(page_by_slug)
        .service(page_by_id)
        .service(upload_image)
        .service(permissions_list)
        .service(google_auth)
        .service(records_list)
        .service(record_add)
        .service(record_get)
        .service(record_update)
        .service(record_delete);
}

/**
 * Endpoint to list agencies.
 */
#[instrument(skip(http_request, app_state), fields(service = "listOpd", trace_id = get_trace_id(&http_request)))]
#[get("/api/opd")]
pub async fn opd_list(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let opd_list = app_state.opd_service.get_opd_list().instrument(span).await?;
    Ok(HttpResponse::Ok().json(opd_list.into_iter().map(OpdResponse::from).collect::<Vec<_>>()))
}

/**
 * Endpoint to add an agency.
 */
#[instrument(skip(http_request, request_body, claims, app_state), fields(service = "addOpd", trace_id = get_trace_id(&http_request)))]
#[post("/api/opd")]
pub async fn opd_add(http_request: HttpRequest, request_body: web::Json<OpdAddRequest>, claims: web::ReqData<SessionClaims>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let opd_add_input = request_body.into_inner().into_input(claims.display_name()).validate()?;
    let opd = app_state.opd_service.add_opd(opd_add_input).instrument(span).await?;
    Ok(HttpResponse::Created().json(OpdResponse::from(opd)))
}

/**
 * Endpoint to resolve an agency by slug.
 */
#[instrument(skip(http_request, app_state), fields(service = "getOpdBySlug", trace_id = get_trace_id(&http_request)))]
#[get("/api/opd/slug/{slug}")]
pub async fn opd_by_slug(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let opd = app_state.opd_service.resolve(&AgencyRef::Slug(path.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(OpdResponse::from(opd)))
}

/**
 * Endpoint to describe every record kind.
 */
#[instrument(skip(http_request), fields(service = "listResources", trace_id = get_trace_id(&http_request)))]
#[get("/api/resources")]
pub async fn resources_list(http_request: HttpRequest, query: web::Query<OpdScopeQuery>) -> Result<HttpResponse, ApplicationError> {
    let today = Utc::now().date_naive();
    let descriptors: Vec<ResourceDescriptorResponse> = RecordKind::ALL.into_iter().map(|kind| ResourceDescriptorResponse::from(describe(kind, query.opd_id, today))).collect();
    Ok(HttpResponse::Ok().json(descriptors))
}

/**
 * Endpoint to describe one record kind.
 */
#[instrument(skip(http_request), fields(service = "getResource", trace_id = get_trace_id(&http_request)))]
#[get("/api/resources/{apiEndpoint}")]
pub async fn resource_get(path: Path<String>, http_request: HttpRequest, query: web::Query<OpdScopeQuery>) -> Result<HttpResponse, ApplicationError> {
    let kind = parse_kind(&path)?;
    let descriptor = describe(kind, query.opd_id, Utc::now().date_naive());
    Ok(HttpResponse::Ok().json(ResourceDescriptorResponse::from(descriptor)))
}

/**
 * Endpoint for an agency page addressed by slug.
 */
#[instrument(skip(http_request, app_state), fields(service = "getPageBySlug", trace_id = get_trace_id(&http_request)))]
#[get("/api/pages/opd/{slug}/{apiEndpoint}")]
pub async fn page_by_slug(path: Path<(String, String)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (slug, api_endpoint) = path.into_inner();
    let kind = parse_kind(&api_endpoint)?;
    let page = get_record_page(&app_state.opd_service, &app_state.record_service, &AgencyRef::Slug(slug), kind, Utc::now().date_naive()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(RecordPageResponse::from(page)))
}

/**
 * Endpoint for the page of an agency with a fixed id.
 */
#[instrument(skip(http_request, app_state), fields(service = "getPageById", trace_id = get_trace_id(&http_request)))]
#[get("/api/pages/opd-id/{id}/{apiEndpoint}")]
pub async fn page_by_id(path: Path<(i64, String)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (id, api_endpoint) = path.into_inner();
    let kind = parse_kind(&api_endpoint)?;
    let page = get_record_page(&app_state.opd_service, &app_state.record_service, &AgencyRef::Id(id), kind, Utc::now().date_naive()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(RecordPageResponse::from(page)))
}

/**
 * Endpoint to list records of a kind.
 */
#[instrument(skip(http_request, app_state), fields(service = "listRecords", trace_id = get_trace_id(&http_request)))]
#[get("/api/{apiEndpoint}")]
pub async fn records_list(path: Path<String>, http_request: HttpRequest, query: web::Query<OpdScopeQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let kind = parse_kind(&path)?;
    let records = app_state.record_service.get_record_list(kind, query.opd_id).instrument(span).await?;
    let records: Vec<RecordResponse> = records.iter().cloned().map(RecordResponse::from).collect();
    Ok(HttpResponse::Ok().json(records))
}

/**
 * Endpoint to add a record. `opdId` in the query scopes the record to one agency.
 */
#[instrument(skip(http_request, request_body, claims, app_state), fields(service = "addRecord", trace_id = get_trace_id(&http_request)))]
#[post("/api/{apiEndpoint}")]
pub async fn record_add(
    path: Path<String>,
    http_request: HttpRequest,
    query: web::Query<OpdScopeQuery>,
    request_body: web::Json<RecordDraftRequest>,
    claims: web::ReqData<SessionClaims>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let kind = parse_kind(&path)?;
    let record_add_input = RecordForm::new(kind).create(RecordDraft::from(request_body.into_inner()), query.opd_id, claims.display_name())?;
    let record = app_state.record_service.add_record(record_add_input).instrument(span).await?;
    Ok(HttpResponse::Created().json(RecordResponse::from(record)))
}

/**
 * Endpoint to get one record.
 */
#[instrument(skip(http_request, app_state), fields(service = "getRecord", trace_id = get_trace_id(&http_request)))]
#[get("/api/{apiEndpoint}/{id}")]
pub async fn record_get(path: Path<(String, i64)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (api_endpoint, id) = path.into_inner();
    let kind = parse_kind(&api_endpoint)?;
    let record = app_state.record_service.get_record(kind, id).instrument(span).await?;
    Ok(HttpResponse::Ok().json(RecordResponse::from(record)))
}

/**
 * Endpoint to update a record.
 */
#[instrument(skip(http_request, request_body, claims, app_state), fields(service = "updateRecord", trace_id = get_trace_id(&http_request)))]
#[put("/api/{apiEndpoint}/{id}")]
pub async fn record_update(
    path: Path<(String, i64)>,
    http_request: HttpRequest,
    request_body: web::Json<RecordDraftRequest>,
    claims: web::ReqData<SessionClaims>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (api_endpoint, id) = path.into_inner();
    let kind = parse_kind(&api_endpoint)?;
    let record_update_input = RecordForm::new(kind).update(id, RecordDraft::from(request_body.into_inner()), claims.display_name())?;
    let record = app_state.record_service.update_record(record_update_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(RecordResponse::from(record)))
}

/**
 * Endpoint to delete a record.
 */
#[instrument(skip(http_request, app_state), fields(service = "deleteRecord", trace_id = get_trace_id(&http_request)))]
#[delete("/api/{apiEndpoint}/{id}")]
pub async fn record_delete(path: Path<(String, i64)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (api_endpoint, id) = path.into_inner();
    let kind = parse_kind(&api_endpoint)?;
    app_state.record_service.delete_record(kind, id).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/**
 * Endpoint to upload an image. The image is returned as a data url, nothing is stored.
 */
#[instrument(skip(http_request, payload, app_state), fields(service = "uploadImage", trace_id = get_trace_id(&http_request)))]
#[post("/api/upload/image")]
pub async fn upload_image(http_request: HttpRequest, mut payload: Multipart, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let upload_service = &app_state.upload_service;
    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|err| ApplicationError::invalid_field(IMAGE_FIELD, &format!("Malformed upload: {err}")))?;
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(|mime| mime.essence_str().to_string());
        upload_service.check_content_type(content_type.as_deref())?;
        let filename = field.content_disposition().and_then(|content_disposition| content_disposition.get_filename()).map(str::to_string);
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|err| ApplicationError::invalid_field(IMAGE_FIELD, &format!("Failed to read upload: {err}")))?;
            bytes.extend_from_slice(&chunk);
            if bytes.len() > upload_service.max_bytes() {
                break;
            }
        }
        let image = upload_service.accept(filename.as_deref(), content_type.as_deref(), &bytes)?;
        return Ok(HttpResponse::Ok().json(UploadImageResponse::from(image)));
    }
    Err(ImageUploadService::missing_image())
}

/**
 * Endpoint to list permissions. Requires the `permission:read` grant.
 */
#[instrument(skip(http_request, claims, app_state), fields(service = "listPermissions", trace_id = get_trace_id(&http_request)))]
#[get("/api/settings/permissions")]
pub async fn permissions_list(http_request: HttpRequest, claims: web::ReqData<SessionClaims>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    if !claims.has_permission(PERMISSION_READ) {
        return Err(ApplicationError::new(ErrorType::Forbidden, format!("Missing permission {PERMISSION_READ}")));
    }
    let permissions = app_state.permission_service.get_permission_list().instrument(span).await?;
    Ok(HttpResponse::Ok().json(PermissionListResponse::from(permissions)))
}

/**
 * Endpoint returning the Google authorization url for the signed in user.
 */
#[instrument(skip(http_request, claims, app_state), fields(service = "googleAuth", trace_id = get_trace_id(&http_request)))]
#[get("/api/google/auth")]
pub async fn google_auth(http_request: HttpRequest, query: web::Query<GoogleAuthQuery>, claims: web::ReqData<SessionClaims>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let auth_url = app_state.google_service.authorization_url(&claims.sub, query.return_url.as_deref())?;
    Ok(HttpResponse::Ok().json(GoogleAuthResponse { auth_url }))
}

fn parse_kind(api_endpoint: &str) -> Result<RecordKind, ApplicationError> {
    api_endpoint.parse::<RecordKind>().map_err(|()| ApplicationError::new(ErrorType::NotFound, format!("Unknown resource '{api_endpoint}'")))
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID").and_then(|v| v.to_str().ok().map(std::string::ToString::to_string)).unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod test {
    use actix_web::{
        App,
        http::{StatusCode, header},
        middleware::from_fn,
        test::{self, TestRequest},
    };
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde_json::{Value, json};

    use super::*;
    use crate::{
        api::{
            middleware::session_gate,
            rest::{json_error_handler, query_error_handler},
            security::{JwtSecurityService, PublicRoutes, test::{TEST_SECRET, create_token}},
        },
        dao::{opd::OpdDao, permissions::PermissionDao, records::RecordDao},
        model::config::{CacheConfig, GoogleConfig},
        service::{cache::ListCache, google::GoogleAuthService, opd::OpdService, permissions::PermissionService, records::RecordService},
    };

    const BOUNDARY: &str = "----opd-test-boundary";

    fn app_state(google: Option<GoogleConfig>) -> web::Data<AppState> {
        web::Data::new(AppState {
            jwt_service: JwtSecurityService::new(TEST_SECRET, "HS256", "session_token").unwrap(),
            public_routes: PublicRoutes::new(vec![], vec!["/sign-in".to_string(), "/api/public".to_string()]),
            sign_in_path: "/sign-in".to_string(),
            opd_service: OpdService::new(OpdDao::new(), None),
            record_service: RecordService::new(RecordDao::new(), None, ListCache::new(&CacheConfig::default())),
            permission_service: PermissionService::new(PermissionDao::new(), None),
            upload_service: ImageUploadService::new(5 * 1024 * 1024),
            google_service: GoogleAuthService::new(google),
        })
    }

    fn google_config() -> GoogleConfig {
        GoogleConfig {
            client_id: "client-123".to_string(),
            redirect_uri: "https://opd.example.org/api/google/callback".to_string(),
            auth_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/calendar".to_string()],
        }
    }

    macro_rules! test_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state)
                    .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                    .app_data(web::QueryConfig::default().error_handler(query_error_handler))
                    .wrap(from_fn(session_gate))
                    .configure(configure),
            )
            .await
        };
    }

    fn bearer(permissions: &[&str]) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", create_token("user-1", permissions, 3600)))
    }

    fn multipart(field: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n").into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> TestRequest {
        TestRequest::post()
            .uri("/api/upload/image")
            .insert_header(bearer(&[]))
            .insert_header((header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}")))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn test_get_trace_id_exists() {
        let request = TestRequest::default().insert_header(("X-Trace-ID", "test")).to_http_request();
        assert_eq!(get_trace_id(&request), "test");
    }

    #[actix_web::test]
    async fn test_get_trace_id_not_exists() {
        let request = TestRequest::default().to_http_request();
        assert!(!get_trace_id(&request).is_empty());
    }

    #[actix_web::test]
    async fn test_no_session_redirects_to_sign_in() {
        let app = test_app!(app_state(None));
        for uri in ["/api/opd", "/api/golongan-pegawai?opdId=1", "/api/settings/permissions", "/opd/dinas-x"] {
            let response = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{uri}");
            assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/sign-in");
        }
    }

    #[actix_web::test]
    async fn test_expired_session_redirects_to_sign_in() {
        let app = test_app!(app_state(None));
        let token = create_token("user-1", &[], -3600);
        let request = TestRequest::get().uri("/api/resources").insert_header((header::AUTHORIZATION, format!("Bearer {token}"))).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[actix_web::test]
    async fn test_public_prefix_skips_session_check() {
        let app = test_app!(app_state(None));
        for uri in ["/api/public", "/api/public/info/more"] {
            let response = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
        let response = test::call_service(&app, TestRequest::get().uri("/api/publicity").to_request()).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[actix_web::test]
    async fn test_unknown_kind_is_not_found() {
        let app = test_app!(app_state(None));
        let request = TestRequest::get().uri("/api/not-a-kind").insert_header(bearer(&[])).to_request();
        assert_eq!(test::call_service(&app, request).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_malformed_slug_page_is_not_found() {
        let app = test_app!(app_state(None));
        let request = TestRequest::get().uri("/api/pages/opd/Not_A_Slug/golongan-pegawai").insert_header(bearer(&[])).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["code"], 1005);
    }

    #[actix_web::test]
    async fn test_resources() {
        let app = test_app!(app_state(None));
        let request = TestRequest::get().uri("/api/resources").insert_header(bearer(&[])).to_request();
        let body: Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(body.as_array().unwrap().len(), 6);
        let request = TestRequest::get().uri("/api/resources/golongan-pegawai?opdId=3").insert_header(bearer(&[])).to_request();
        let body: Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(body["queryKey"], json!(["golongan-pegawai", 3]));
        assert_eq!(body["columns"].as_array().unwrap().len(), 6);
    }

    #[actix_web::test]
    async fn test_invalid_record_rejected_before_storage() {
        let app = test_app!(app_state(None));
        let request = TestRequest::post()
            .uri("/api/golongan-pegawai?opdId=3")
            .insert_header(bearer(&[]))
            .set_json(json!({"tahun": 2025, "bulan": 13, "golonganI": -1, "golonganV": 2}))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        let fields: Vec<&str> = body["errors"].as_array().unwrap().iter().map(|error| error["field"].as_str().unwrap()).collect();
        assert!(fields.contains(&"bulan"));
        assert!(fields.contains(&"golonganI"));
        assert!(fields.contains(&"golonganV"));
    }

    #[actix_web::test]
    async fn test_malformed_opd_scope() {
        let app = test_app!(app_state(None));
        let request = TestRequest::post()
            .uri("/api/golongan-pegawai?opdId=abc")
            .insert_header(bearer(&[]))
            .set_json(json!({"tahun": 2025, "bulan": 1}))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["code"], 1004);
        assert_eq!(body["errors"], json!([{"field": "opdId", "message": "Must be a whole number"}]));

        let request = TestRequest::get().uri("/api/golongan-pegawai?opdId=1.5").insert_header(bearer(&[])).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["errors"][0]["field"], "opdId");
    }

    #[actix_web::test]
    async fn test_malformed_json_body() {
        let app = test_app!(app_state(None));
        let request = TestRequest::post()
            .uri("/api/opd")
            .insert_header(bearer(&[]))
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{\"nama\": ")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["code"], 1004);
    }

    #[actix_web::test]
    async fn test_opd_add_missing_fields() {
        let app = test_app!(app_state(None));
        let request = TestRequest::post().uri("/api/opd").insert_header(bearer(&[])).set_json(json!({"nama": "Dinas X", "slug": "Dinas X"})).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        let fields: Vec<&str> = body["errors"].as_array().unwrap().iter().map(|error| error["field"].as_str().unwrap()).collect();
        assert_eq!(fields, vec!["singkatan", "slug"]);
    }

    #[actix_web::test]
    async fn test_permissions_require_grant() {
        let app = test_app!(app_state(None));
        let request = TestRequest::get().uri("/api/settings/permissions").insert_header(bearer(&["opd:read"])).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_google_auth_url() {
        let app = test_app!(app_state(Some(google_config())));
        let request = TestRequest::get().uri("/api/google/auth?returnUrl=%2Fsettings").insert_header(bearer(&[])).to_request();
        let body: Value = test::call_and_read_body_json(&app, request).await;
        let auth_url = url::Url::parse(body["authUrl"].as_str().unwrap()).unwrap();
        let (_, state) = auth_url.query_pairs().find(|(name, _)| name == "state").unwrap();
        let state: Value = serde_json::from_slice(&STANDARD.decode(state.as_bytes()).unwrap()).unwrap();
        assert_eq!(state, json!({"userId": "user-1", "returnUrl": "/settings"}));
    }

    #[actix_web::test]
    async fn test_google_auth_not_configured() {
        let app = test_app!(app_state(None));
        let request = TestRequest::get().uri("/api/google/auth").insert_header(bearer(&[])).to_request();
        assert_eq!(test::call_service(&app, request).await.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_upload_image() {
        let app = test_app!(app_state(None));
        let image: Vec<u8> = (0..=255_u8).cycle().take(4096).collect();
        let request = upload_request(multipart("image", "logo.png", "image/png", &image)).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["filename"], "logo.png");
        assert_eq!(body["type"], "image/png");
        assert_eq!(body["size"], 4096);
        let encoded = body["url"].as_str().unwrap().strip_prefix("data:image/png;base64,").unwrap();
        assert_eq!(STANDARD.decode(encoded).unwrap(), image);
    }

    #[actix_web::test]
    async fn test_upload_wrong_type() {
        let app = test_app!(app_state(None));
        let request = upload_request(multipart("image", "doc.pdf", "application/pdf", b"%PDF-1.4")).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["errors"][0]["field"], "image");
    }

    #[actix_web::test]
    async fn test_upload_without_image() {
        let app = test_app!(app_state(None));
        let request = upload_request(multipart("attachment", "logo.png", "image/png", b"png")).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["errors"][0]["message"], "No image provided");
    }
}
