//! Row seeding for database-backed tests.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::repo_types::{NewUser, Role, User},
    recipes::{repo, repo_types::RecipeInput},
};

pub async fn user(db: &PgPool, username: &str) -> anyhow::Result<Uuid> {
    let email = format!("{username}@foodvault.test");
    let user = User::create(
        db,
        NewUser {
            email: &email,
            username,
            password_hash: "not-a-real-hash",
            name: None,
            role: Role::User,
            email_confirmed: true,
        },
    )
    .await?;
    Ok(user.id)
}

pub async fn recipe(db: &PgPool, owner: Uuid, title: &str) -> anyhow::Result<Uuid> {
    let input = RecipeInput {
        title: title.into(),
        ..Default::default()
    };
    Ok(repo::insert(db, owner, &input).await?.id)
}
