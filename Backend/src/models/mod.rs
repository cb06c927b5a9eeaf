// ============================================================================
// MODELS - MAIN MODULE
// ============================================================================
//
// Description:
//   Entry point for every data model.
//   Each entity maps to one table through SeaORM.
//
// Modules:
//   usuarios
//     - users, security_question, user_group, password_reset_tokens
//   produccion
//     - rearing_unit : egg trays, tanks, cages (kind discriminator)
//     - lot : batches and their life stage
//     - mortality_record, movement_history : append-only lot logs
//     - daily_record : feeding/cleaning flags per lot and day
//     - feeding, water_condition
//     - unit_daily_summary : written by the daily summary job
//     - sequence_counter : human-readable code generation
//   logistica
//     - supplier, supply_category, supply, inventory_movement
//     - purchase_order, purchase_order_line
//   comercializacion
//     - customer, wholesale_order, wholesale_order_line
//     - retail_sale, retail_sale_line, sales_record
//   shared
//     - health : health check response
//     - dto : request/response payloads shared by routes and services
//
// Notes:
//   - All models go through SeaORM (no raw SQL)
//   - Closed value sets are DeriveActiveEnum stored as text
//   - Relations are declared in each model
//
// ============================================================================

pub mod health;
pub mod dto;

pub mod users;
pub mod security_question;
pub mod user_group;
pub mod password_reset_tokens;

pub mod rearing_unit;
pub mod lot;
pub mod mortality_record;
pub mod movement_history;
pub mod daily_record;
pub mod feeding;
pub mod water_condition;
pub mod unit_daily_summary;
pub mod sequence_counter;

pub mod supplier;
pub mod supply_category;
pub mod supply;
pub mod inventory_movement;
pub mod purchase_order;
pub mod purchase_order_line;

pub mod customer;
pub mod wholesale_order;
pub mod wholesale_order_line;
pub mod retail_sale;
pub mod retail_sale_line;
pub mod sales_record;
