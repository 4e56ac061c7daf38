use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::distance::{Coordinate, DistanceUnit};
use crate::models::{Activity, Category, ClassesPage, DayGroup, SessionWithDistance, Venue};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
        components.add_security_scheme(
            "query_token",
            SecurityScheme::ApiKey(ApiKey::Query(ApiKeyValue::new("token"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        crate::handlers::get_classes,
        crate::handlers::get_classes_ical
    ),
    components(schemas(
        ClassesPage,
        DayGroup,
        SessionWithDistance,
        Venue,
        Activity,
        Category,
        Coordinate,
        DistanceUnit
    )),
    tags(
        (name = "classes", description = "Class discovery by distance")
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;
