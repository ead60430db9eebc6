//! OpenAPI document and Swagger UI.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Path of the interactive documentation.
pub const DOCS_PATH: &str = "/docs";
/// Path of the generated OpenAPI document.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "AI Data Insight Engine API",
        description = "Upload CSV or Excel files, track processing jobs and fetch data profiles.\n\n**Authentication:** every endpoint except registration, login and the service endpoints requires a JWT Bearer token."
    ),
    paths(
        // Service
        crate::routes::health::root,
        crate::routes::health::health_check,
        crate::routes::api_index,

        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::auth::logout,

        // Upload
        crate::handlers::upload::upload_file,

        // Jobs
        crate::handlers::jobs::get_job,
        crate::handlers::jobs::list_jobs,
        crate::handlers::jobs::delete_job,

        // Processing
        crate::handlers::processing::start_processing,
        crate::handlers::processing::get_results,
        crate::handlers::processing::download_file,
    ),
    components(
        schemas(
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::TokenResponse,
            insight_db::models::user::UserResponse,
            crate::handlers::upload::UploadForm,
            crate::handlers::upload::UploadResponse,
            insight_db::models::job::Job,
            insight_db::models::status::JobStatus,
            crate::handlers::jobs::JobPage,
            crate::handlers::processing::ProcessResponse,
            crate::handlers::processing::JobResults,
            crate::handlers::processing::ResultFiles,
            insight_core::profiling::Profile,
        )
    ),
    tags(
        (name = "Service", description = "Service banner, health and API index."),
        (name = "Auth", description = "Registration, login and token revocation."),
        (name = "Upload", description = "CSV and Excel file intake with type, size and content checks."),
        (name = "Jobs", description = "Tracking of the caller's upload jobs."),
        (name = "Processing", description = "Profiling runs, results and artifact downloads."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Access token from /api/v1/auth/login"))
                    .build(),
            ),
        );
    }
}

/// Swagger UI at [`DOCS_PATH`] serving the document at [`OPENAPI_PATH`].
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new(DOCS_PATH).url(OPENAPI_PATH, ApiDoc::openapi())
}
