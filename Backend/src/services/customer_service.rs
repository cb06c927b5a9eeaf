// Wholesale and retail customers

use sea_orm::*;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::customer::{self, CustomerKind};
use crate::models::dto::CustomerRequest;
use crate::services::now;

pub struct CustomerService;

impl CustomerService {
    pub async fn list(db: &DatabaseConnection, kind: Option<CustomerKind>) -> AppResult<Vec<customer::Model>> {
        let mut query = customer::Entity::find().order_by_asc(customer::Column::Name);
        if let Some(kind) = kind {
            query = query.filter(customer::Column::Kind.eq(kind));
        }
        Ok(query.all(db).await?)
    }

    pub async fn get<C: ConnectionTrait>(conn: &C, customer_id: i32) -> AppResult<customer::Model> {
        customer::Entity::find_by_id(customer_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::not_found("Customer", customer_id))
    }

    pub async fn create(db: &DatabaseConnection, request: CustomerRequest) -> AppResult<customer::Model> {
        let tax_id = check_tax_id(&request.tax_id)?;
        Self::check_unique(db, &tax_id, None).await?;

        let created = customer::ActiveModel {
            name: Set(request.name.trim().to_string()),
            tax_id: Set(tax_id),
            contact: Set(request.contact),
            phone: Set(request.phone),
            email: Set(request.email),
            address: Set(request.address),
            kind: Set(request.kind),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!("🤝 Customer {} created", created.name);
        Ok(created)
    }

    pub async fn update(
        db: &DatabaseConnection,
        customer_id: i32,
        request: CustomerRequest,
    ) -> AppResult<customer::Model> {
        let existing = Self::get(db, customer_id).await?;
        let tax_id = check_tax_id(&request.tax_id)?;
        Self::check_unique(db, &tax_id, Some(existing.id)).await?;

        let mut active: customer::ActiveModel = existing.into();
        active.name = Set(request.name.trim().to_string());
        active.tax_id = Set(tax_id);
        active.contact = Set(request.contact);
        active.phone = Set(request.phone);
        active.email = Set(request.email);
        active.address = Set(request.address);
        active.kind = Set(request.kind);
        Ok(active.update(db).await?)
    }

    async fn check_unique(db: &DatabaseConnection, tax_id: &str, exclude_id: Option<i32>) -> AppResult<()> {
        let taken = customer::Entity::find()
            .filter(customer::Column::TaxId.eq(tax_id))
            .one(db)
            .await?;
        match taken {
            Some(other) if Some(other.id) != exclude_id => {
                Err(AppError::Conflict(format!("Tax id {} is already registered", tax_id)))
            }
            _ => Ok(()),
        }
    }
}

/// DNI (8 digits) or RUC (11 digits)
fn check_tax_id(tax_id: &str) -> AppResult<String> {
    let tax_id = tax_id.trim();
    let digits = tax_id.chars().all(|c| c.is_ascii_digit());
    if !digits || !(tax_id.len() == 8 || tax_id.len() == 11) {
        return Err(AppError::validation("Tax id must be a DNI (8 digits) or a RUC (11 digits)"));
    }
    Ok(tax_id.to_string())
}
