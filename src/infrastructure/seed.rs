use crate::auth::hash_password;
use crate::models::user::Role;
use crate::models::{document, user};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

/// Demo accounts: (code, first name, last name, email, password, role)
const DEMO_USERS: &[(&str, &str, &str, &str, &str, Role)] = &[
    ("ADM-0001", "Ada", "Admin", "admin@librarysphere.local", "admin", Role::Admin),
    ("EMP-0001", "Eli", "Desk", "staff@librarysphere.local", "staff", Role::Employee),
    ("MBR-0001", "Mia", "Reader", "mia@librarysphere.local", "member", Role::Member),
    ("MBR-0002", "Noah", "Reader", "noah@librarysphere.local", "member", Role::Member),
];

/// Demo catalog: (code, title, author, year, category, type, age)
const DEMO_DOCUMENTS: &[(&str, &str, &str, i32, &str, &str, &str)] = &[
    ("DOC-0001", "The Hobbit", "J.R.R. Tolkien", 1937, "Fantasy", "book", "all"),
    ("DOC-0002", "Foundation", "Isaac Asimov", 1951, "Science Fiction", "book", "12+"),
    ("DOC-0003", "Dune", "Frank Herbert", 1965, "Science Fiction", "book", "12+"),
    ("DOC-0004", "National Geographic, May", "Various", 2023, "Science", "magazine", "all"),
];

pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    let now = chrono::Utc::now().to_rfc3339();

    for (code, first_name, last_name, email, password, role) in DEMO_USERS {
        let password_hash = hash_password(password).map_err(DbErr::Custom)?;

        let account = user::ActiveModel {
            code: Set(code.to_string()),
            first_name: Set(first_name.to_string()),
            last_name: Set(last_name.to_string()),
            email: Set(email.to_string()),
            phone: Set(None),
            address: Set(None),
            password_hash: Set(password_hash),
            role: Set(*role),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        };

        user::Entity::insert(account)
            .on_conflict(
                OnConflict::column(user::Column::Email)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(db)
            .await?;
    }

    for (code, title, author, year, category, document_type, age) in DEMO_DOCUMENTS {
        let doc = document::ActiveModel {
            code: Set(code.to_string()),
            title: Set(title.to_string()),
            author: Set(author.to_string()),
            year: Set(Some(*year)),
            category: Set(category.to_string()),
            document_type: Set(document_type.to_string()),
            age_classification: Set(age.to_string()),
            description: Set(None),
            isbn: Set(None),
            image_url: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        };

        document::Entity::insert(doc)
            .on_conflict(
                OnConflict::column(document::Column::Code)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(db)
            .await?;
    }

    tracing::info!(
        users = DEMO_USERS.len(),
        documents = DEMO_DOCUMENTS.len(),
        "Demo data ensured"
    );
    Ok(())
}
