use crate::{
    api::employee,
    error::{json_error_handler, query_error_handler},
};
use actix_web::{guard, web};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler));

    cfg.service(
        web::scope("/employees")
            // /employees
            .service(
                web::resource("")
                    .route(web::post().to(employee::create_employee))
                    .route(web::get().to(employee::list_employees)),
            )
            // fixed segments before /{employee_id}; GET-guarded so other methods
            // on an employee named "search" or "avg-salary" still reach it
            .service(
                web::resource("/avg-salary")
                    .guard(guard::Get())
                    .route(web::get().to(employee::average_salary_by_department)),
            )
            .service(
                web::resource("/search")
                    .guard(guard::Get())
                    .route(web::get().to(employee::search_employees_by_skill)),
            )
            // /employees/{employee_id}
            .service(
                web::resource("/{employee_id}")
                    .route(web::get().to(employee::get_employee))
                    .route(web::put().to(employee::update_employee))
                    .route(web::delete().to(employee::delete_employee)),
            ),
    );
}
