mod cors;
mod dto;
mod pool;
mod routes;

use dto::{ResponseData, RESPONSE_BAD_REQUEST, RESPONSE_INTERNAL_ERROR};
use pool::Db;
use rocket::{serde::json::Json, Config, Request};
use sea_orm_rocket::Database;
use staking_evm_client::RouterClient;
use std::collections::HashSet;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

#[macro_use]
extern crate rocket;

#[get("/health")]
async fn health_ping() -> &'static str {
    ""
}

#[catch(404)]
async fn bad_request(req: &Request<'_>) -> Json<ResponseData<String>> {
    let message = format!("Couldn't find '{}'", req.uri());
    Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None))
}

#[catch(500)]
async fn internal_error() -> Json<ResponseData<String>> {
    Json(ResponseData::new(
        RESPONSE_INTERNAL_ERROR,
        "Whoops! Looks like we messed up.".to_owned(),
        None,
    ))
}

#[launch]
async fn rocket() -> _ {
    let staking_config = Config::figment().extract::<pool::StakingConfig>().unwrap();
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", &staking_config.rust_log);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                format!("staking_web_api={}", &staking_config.web_api_log)
                    .parse()
                    .expect("Error parsing directive"),
            ),
        )
        .with_span_events(FmtSpan::FULL)
        .init();

    let router_client = RouterClient::connect(
        &staking_config.rpc_http_url,
        &staking_config.relayer_private_key,
        &staking_config.router_address,
    )
    .await
    .expect("Router client failed to initialize!");

    let allowed_domains: HashSet<String> = staking_config
        .cors_allowed_domains
        .split(',')
        .map(|s| s.to_owned())
        .collect();

    rocket::build()
        .register("/", catchers![internal_error, bad_request])
        .attach(Db::init())
        .manage(staking_config)
        .manage(router_client)
        .attach(cors::OriginHeader { allowed_domains })
        .attach(routes::mount())
        .mount("/", routes![health_ping])
}
