use crate::{
    api::security::{JwtSecurityService, PublicRoutes},
    service::{google::GoogleAuthService, opd::OpdService, permissions::PermissionService, records::RecordService, upload::ImageUploadService},
};

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * Verifies session tokens.
     */
    pub jwt_service: JwtSecurityService,
    /**
     * Routes the session gate lets through.
     */
    pub public_routes: PublicRoutes,
    /**
     * Redirect target for requests without a session.
     */
    pub sign_in_path: String,
    pub opd_service: OpdService,
    /**
     * Monthly records of every kind, backed by the list cache.
     */
    pub record_service: RecordService,
    pub permission_service: PermissionService,
    pub upload_service: ImageUploadService,
    pub google_service: GoogleAuthService,
}
