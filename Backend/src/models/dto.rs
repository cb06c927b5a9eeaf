// Request / response payloads shared by routes and services

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::customer::CustomerKind;
use super::inventory_movement::MovementKind;
use super::lot::FeedType;
use super::rearing_unit::{UnitKind, UnitShape};
use super::sales_record::SaleType;
use super::supply::MeasureUnit;
use super::user_group::AccessGroup;

fn one() -> u32 {
    1
}

// ===== usuarios =====

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 150))]
    pub username: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 8))]
    pub dni: Option<String>,
    pub security_question_id: Option<i32>,
    pub security_answer: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub groups: Vec<AccessGroup>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 8))]
    pub dni: Option<String>,
    pub security_question_id: Option<i32>,
    pub security_answer: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
    pub groups: Option<Vec<AccessGroup>>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub dni: Option<String>,
    pub security_question_id: Option<i32>,
    pub is_staff: bool,
    pub is_active: bool,
    pub groups: Vec<AccessGroup>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SecurityQuestionRequest {
    #[validate(length(min = 5, max = 255))]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct RecoveryStartRequest {
    pub dni: String,
}

#[derive(Debug, Serialize)]
pub struct RecoveryQuestion {
    pub dni: String,
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct RecoveryAnswerRequest {
    pub dni: String,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct RecoveryToken {
    pub token: String,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecoveryResetRequest {
    pub token: String,
    #[validate(length(min = 8))]
    pub new_password: String,
}

// ===== produccion : units =====

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUnitsRequest {
    pub kind: UnitKind,
    #[serde(default = "one")]
    #[validate(range(min = 1, max = 50))]
    pub quantity: u32,
    pub shape: Option<UnitShape>,
    #[validate(range(exclusive_min = 0.0))]
    pub length_m: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub width_m: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub diameter_m: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub height_m: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub stocking_density_kg_m3: Option<f64>,
    #[validate(range(min = 1))]
    pub max_head_count: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUnitRequest {
    pub shape: Option<UnitShape>,
    #[validate(range(exclusive_min = 0.0))]
    pub length_m: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub width_m: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub diameter_m: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub height_m: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub stocking_density_kg_m3: Option<f64>,
    #[validate(range(min = 1))]
    pub max_head_count: Option<i32>,
}

// ===== produccion : lots =====

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEggLotRequest {
    pub unit_id: i32,
    #[validate(range(min = 1))]
    pub head_count: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MortalityRequest {
    #[validate(range(min = 1))]
    pub count: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SizeRequest {
    #[validate(range(min = 0.0))]
    pub size_min_cm: f64,
    #[validate(range(min = 0.0))]
    pub size_max_cm: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WeightRequest {
    #[validate(range(exclusive_min = 0.0))]
    pub avg_weight_g: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DailyTask {
    Feeding,
    Cleaning,
}

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub task: DailyTask,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransferRequest {
    pub destination_unit_id: i32,
    #[validate(range(min = 1))]
    pub head_count: i32,
}

// ===== produccion : feedings =====

#[derive(Debug, Deserialize, Validate)]
pub struct FeedingRequest {
    pub lot_id: i32,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    #[validate(range(exclusive_min = 0.0))]
    pub amount_g: f64,
    pub feed_type: Option<FeedType>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateFeedingRequest {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    #[validate(range(exclusive_min = 0.0))]
    pub amount_g: Option<f64>,
    pub feed_type: Option<FeedType>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedingFilter {
    pub lot_id: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// ===== produccion : diagnosis =====

#[derive(Debug, Deserialize, Validate)]
pub struct WaterConditionRequest {
    #[validate(range(min = -5.0, max = 45.0))]
    pub temperature_c: f64,
    #[validate(range(min = 0.0, max = 14.0))]
    pub ph: f64,
    #[validate(range(min = 0.0))]
    pub dissolved_oxygen_mg_l: f64,
    #[validate(range(min = 0.0))]
    pub ammonia_mg_l: f64,
}

#[derive(Debug, Deserialize)]
pub struct SymptomsRequest {
    /// Symptom names from the knowledge base symptom list
    pub symptoms: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictRequest {
    pub temperature_c: Option<f64>,
    pub ph: Option<f64>,
    pub dissolved_oxygen_mg_l: Option<f64>,
    pub ammonia_mg_l: Option<f64>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub simulate: bool,
}

// ===== logistica =====

#[derive(Debug, Deserialize, Validate)]
pub struct SupplierRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 11, max = 11))]
    pub ruc: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SupplyRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub category_id: i32,
    pub unit: MeasureUnit,
    pub min_stock: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    pub supply_id: i32,
    pub kind: MovementKind,
    pub quantity: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub supply_id: i32,
    pub quantity: Decimal,
    pub lot_id: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseLineRequest {
    pub supply_id: i32,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseOrderRequest {
    pub supplier_id: i32,
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub lines: Vec<PurchaseLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePurchaseOrderRequest {
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub lines: Option<Vec<PurchaseLineRequest>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// ===== comercializacion =====

#[derive(Debug, Deserialize, Validate)]
pub struct CustomerRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 8, max = 11))]
    pub tax_id: String,
    pub contact: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    pub kind: CustomerKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WholesaleLineRequest {
    pub description: String,
    pub tons: f64,
    pub price_per_ton: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct WholesaleOrderRequest {
    pub customer_id: i32,
    pub lot_id: i32,
    pub requested_tons: f64,
    pub price_per_ton: Decimal,
    pub notes: Option<String>,
    #[serde(default)]
    pub lines: Vec<WholesaleLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetailLineRequest {
    pub product: String,
    pub kg: f64,
    pub price_per_kg: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct PosSaleRequest {
    pub lot_id: i32,
    pub customer_id: Option<i32>,
    pub lines: Vec<RetailLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct RetailOrderRequest {
    pub lot_id: i32,
    pub customer_id: i32,
    pub delivery_address: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub lines: Vec<RetailLineRequest>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SalesReportFilter {
    pub sale_type: Option<SaleType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
