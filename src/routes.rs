use crate::{api::attendance, auth::middleware::auth_middleware, config::Config};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

pub type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

// Limiter state lives in the config and is shared by every worker
fn build_limiter(requests_per_min: u32) -> anyhow::Result<LimiterConfig> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit: {requests_per_min} per minute"))?;
    Ok(cfg)
}

pub fn configure(
    cfg: &mut web::ServiceConfig,
    config: &Config,
    limiter: &LimiterConfig,
) {
    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Governor::new(limiter)) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance : table page or data
                    .service(
                        web::resource("").route(web::get().to(attendance::attendance_index)),
                    )
                    // /attendance/columns
                    .service(
                        web::resource("/columns")
                            .route(web::get().to(attendance::attendance_columns)),
                    ),
            ),
    );
}

pub fn protected_limiter(config: &Config) -> anyhow::Result<LimiterConfig> {
    build_limiter(config.rate_protected_per_min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::test_tokens::issue;
    use crate::models::TokenType;
    use crate::service::attendance::AttendanceQueryService;
    use crate::store::memory::MemoryAttendanceStore;
    use actix_web::{App, test};
    use std::sync::Arc;

    #[actix_web::test]
    async fn builds_limiter_for_any_rate() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(1000).is_ok());
        assert!(build_limiter(120_000).is_ok());
    }

    #[actix_web::test]
    async fn protected_scope_requires_bearer_token() {
        let config = Config {
            jwt_secret: "secret".to_string(),
            ..Config::default()
        };
        let limiter = protected_limiter(&config).unwrap();
        let service = web::Data::new(AttendanceQueryService::new(
            Arc::new(MemoryAttendanceStore::default()),
            &config,
        ));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config.clone()))
                .app_data(service)
                .configure(|cfg| configure(cfg, &config, &limiter)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/attendance/columns")
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let token = issue(1, &["manager"], TokenType::Access, "secret");
        let req = test::TestRequest::get()
            .uri("/api/attendance/columns")
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }
}
