use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    http::header,
    middleware::Next,
    web, Error, HttpMessage, HttpResponse,
};
use tracing::debug;

use crate::api::state::AppState;

/**
 * Middleware for timing requests.
 */
pub async fn timing_middleware(request: ServiceRequest, next: Next<impl MessageBody>) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let start_time = std::time::Instant::now();
    let path = request.path().to_owned();
    let method = request.method().to_owned();
    let response = next.call(request).await;
    let response_code = match &response {
        Ok(service_response) => service_response.status().as_u16(),
        Err(_) => 500,
    };
    debug!(target: "performance", "Request for {} {} with status {} processed in {}ms", method, path, response_code, start_time.elapsed().as_millis());
    response
}

/**
 * Lets public routes through and requires a valid session everywhere else.
 *
 * Verified claims are inserted into the request extensions, handlers read them with `web::ReqData<SessionClaims>`.
 * Requests without a valid session are redirected to the sign-in page.
 */
pub async fn session_gate<B: MessageBody + 'static>(request: ServiceRequest, next: Next<B>) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let Some(app_state) = request.app_data::<web::Data<AppState>>().cloned() else {
        return Err(actix_web::error::ErrorInternalServerError("Application state not configured"));
    };
    if app_state.public_routes.is_public(request.path()) {
        return next.call(request).await.map(ServiceResponse::map_into_left_body);
    }
    match app_state.jwt_service.validate(request.request()) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.call(request).await.map(ServiceResponse::map_into_left_body)
        }
        Err(err) => {
            debug!(path = request.path(), "No valid session, redirecting to sign in: {err}");
            let response = HttpResponse::TemporaryRedirect().insert_header((header::LOCATION, app_state.sign_in_path.as_str())).finish();
            Ok(request.into_response(response).map_into_right_body())
        }
    }
}
