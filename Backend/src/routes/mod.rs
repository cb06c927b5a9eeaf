pub mod auth;
pub mod customers;
pub mod diagnosis;
pub mod feedings;
pub mod health;
pub mod inventory;
pub mod lots;
pub mod notifications;
pub mod purchase_orders;
pub mod retail;
pub mod sales_reports;
pub mod suppliers;
pub mod units;
pub mod users;
pub mod wholesale;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(users::users_routes)
            // produccion
            .configure(units::units_routes)
            .configure(lots::lots_routes)
            .configure(feedings::feedings_routes)
            .configure(diagnosis::diagnosis_routes)
            .configure(notifications::notifications_routes)
            // logistica
            .configure(suppliers::suppliers_routes)
            .configure(inventory::inventory_routes)
            .configure(purchase_orders::purchase_orders_routes)
            // comercializacion
            .configure(customers::customers_routes)
            .configure(wholesale::wholesale_routes)
            .configure(retail::retail_routes)
            .configure(sales_reports::sales_reports_routes),
    );
}
