use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Tag backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::turn::current_turn,
        crate::routes::turn::draw,
        crate::routes::turn::complete,
        crate::routes::turn::pass,
        crate::routes::turn::veto,
        crate::routes::turn::start_transit,
        crate::routes::turn::stop_transit,
        crate::routes::admin::list_teams,
        crate::routes::admin::list_users,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::common::TurnSnapshot,
            crate::dto::common::ChallengeSnapshot,
            crate::dto::common::VisibleTurnPhase,
            crate::dto::turn::CompleteRequest,
            crate::dto::turn::DrawResponse,
            crate::dto::turn::VetoResponse,
            crate::dto::admin::TeamSummary,
            crate::dto::admin::UserSummary,
            crate::dao::models::Role,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "turn", description = "Runner turn loop: challenges, vetoes, transit"),
        (name = "admin", description = "Form-submission admin mutations"),
    )
)]
pub struct ApiDoc;
