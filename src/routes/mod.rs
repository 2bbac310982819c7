pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;

use actix_web::{web, Error, HttpRequest};

use crate::auth::AuthMiddleware;
use crate::error::AppError;

/// Renders extractor failures (missing fields, unparsable numbers) as 422 JSON.
fn extractor_error<E: std::fmt::Display>(err: E, req: &HttpRequest) -> Error {
    log::warn!("Rejected {} {}: {}", req.method(), req.path(), err);
    AppError::ValidationError(err.to_string()).into()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().error_handler(extractor_error))
        .app_data(web::QueryConfig::default().error_handler(extractor_error))
        .app_data(web::PathConfig::default().error_handler(extractor_error));

    cfg.service(health::index).service(health::health).service(
        web::scope("/api/v1")
            .wrap(AuthMiddleware)
            .service(
                web::scope("/auth")
                    .service(auth::create_user)
                    .service(auth::verify_form)
                    .service(auth::verify_link)
                    .service(auth::login)
                    .service(auth::logout)
                    .service(auth::forget_password)
                    .service(auth::reset_password)
                    .service(auth::change_password),
            )
            .service(
                web::scope("/user")
                    .service(users::get_user)
                    .service(users::update_user),
            )
            .service(
                web::scope("/task")
                    .service(tasks::create_task)
                    .service(tasks::list_tasks)
                    .service(tasks::get_task)
                    .service(tasks::update_task)
                    .service(tasks::delete_task)
                    .service(tasks::change_status)
                    .service(tasks::change_category)
                    .service(tasks::request_delete)
                    .service(tasks::delete_requested_tasks)
                    .service(tasks::search_delete_requested_tasks)
                    .service(tasks::search_tasks)
                    .service(tasks::filter_tasks),
            ),
    );
}
