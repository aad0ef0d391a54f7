use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::repo_types::{NewUser, Role, User};
use crate::auth::services::hash_password;
use crate::config::{SeedAdmin, DEFAULT_ADMIN_PASSWORD};

/// Make sure the configured administrator exists and holds the Admin role.
pub async fn ensure_admin(db: &PgPool, admin: &SeedAdmin) -> anyhow::Result<()> {
    let email = admin.email.trim().to_lowercase();

    if admin.password == DEFAULT_ADMIN_PASSWORD {
        warn!(%email, "default admin password in use; set ADMIN_PASSWORD");
    }

    match User::find_by_email(db, &email).await? {
        Some(user) if user.role() == Role::Admin => {
            info!(user_id = %user.id, "admin user present");
        }
        Some(user) => {
            User::set_role(db, user.id, Role::Admin).await?;
            info!(user_id = %user.id, "existing user promoted to admin");
        }
        None => {
            let hash = hash_password(&admin.password)?;
            let user = User::create(
                db,
                NewUser {
                    email: &email,
                    username: "admin",
                    password_hash: &hash,
                    name: Some("System Administrator"),
                    role: Role::Admin,
                    email_confirmed: true,
                },
            )
            .await?;
            info!(user_id = %user.id, %email, "admin user created");
        }
    }
    Ok(())
}
