//! SeaORM implementation of UserRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::{CreateUserInput, DomainError, UpdateUserInput, UserRepository};
use crate::models::loan::{self, Entity as LoanEntity};
use crate::models::reservation::{self, Entity as ReservationEntity};
use crate::models::user::{ActiveModel, Column, Entity as UserEntity};
use crate::models::{Role, UserDto};

const DUPLICATE_ACCOUNT: &str = "An account with this email or code already exists";

/// SeaORM-based implementation of UserRepository
pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Card number handed out when staff do not pick one, e.g. `MBR-1a2b3c4d`.
fn generate_code(role: Role) -> String {
    let prefix = match role {
        Role::Member => "MBR",
        Role::Employee => "EMP",
        Role::Admin => "ADM",
    };
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &id[..8])
}

fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::Validation("a valid email is required".to_string()));
    }
    Ok(email)
}

fn validate_names(first_name: &str, last_name: &str) -> Result<(), DomainError> {
    if first_name.trim().is_empty() || last_name.trim().is_empty() {
        return Err(DomainError::Validation(
            "first and last name are required".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn find_all(&self, role: Option<Role>) -> Result<Vec<UserDto>, DomainError> {
        let mut query = UserEntity::find();
        if let Some(role) = role {
            query = query.filter(Column::Role.eq(role));
        }

        let users = query
            .order_by_asc(Column::LastName)
            .order_by_asc(Column::FirstName)
            .all(&self.db)
            .await?;

        Ok(users.into_iter().map(UserDto::from).collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<UserDto>, DomainError> {
        let user = UserEntity::find_by_id(id).one(&self.db).await?;
        Ok(user.map(UserDto::from))
    }

    async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(UserDto, String)>, DomainError> {
        let user = UserEntity::find()
            .filter(Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await?;

        Ok(user.map(|u| {
            let hash = u.password_hash.clone();
            (UserDto::from(u), hash)
        }))
    }

    async fn create(&self, input: CreateUserInput) -> Result<UserDto, DomainError> {
        let email = normalize_email(&input.email)?;
        validate_names(&input.first_name, &input.last_name)?;

        let now = chrono::Utc::now().to_rfc3339();
        let code = input
            .code
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| generate_code(input.role));

        let user = ActiveModel {
            code: Set(code),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            email: Set(email),
            phone: Set(input.phone),
            address: Set(input.address),
            password_hash: Set(input.password_hash),
            role: Set(input.role),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = user
            .insert(&self.db)
            .await
            .map_err(|e| DomainError::from_write(e, DUPLICATE_ACCOUNT))?;

        Ok(UserDto::from(result))
    }

    async fn update(&self, id: i32, input: UpdateUserInput) -> Result<UserDto, DomainError> {
        let existing = UserEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("User"))?;

        validate_names(
            input.first_name.as_deref().unwrap_or(&existing.first_name),
            input.last_name.as_deref().unwrap_or(&existing.last_name),
        )?;
        let email = input.email.as_deref().map(normalize_email).transpose()?;

        let mut active: ActiveModel = existing.into();

        if let Some(first_name) = input.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = input.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(phone) = input.phone {
            active.phone = Set(phone);
        }
        if let Some(address) = input.address {
            active.address = Set(address);
        }
        if let Some(hash) = input.password_hash {
            active.password_hash = Set(hash);
        }
        if let Some(role) = input.role {
            active.role = Set(role);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let result = active
            .update(&self.db)
            .await
            .map_err(|e| DomainError::from_write(e, DUPLICATE_ACCOUNT))?;

        Ok(UserDto::from(result))
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let loans = LoanEntity::find()
            .filter(loan::Column::MemberId.eq(id))
            .count(&self.db)
            .await?;
        let reservations = ReservationEntity::find()
            .filter(reservation::Column::MemberId.eq(id))
            .count(&self.db)
            .await?;

        if loans > 0 || reservations > 0 {
            return Err(DomainError::Conflict(
                "User is referenced by loans or reservations".to_string(),
            ));
        }

        let result = UserEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("User"));
        }

        Ok(())
    }
}
