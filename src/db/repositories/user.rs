use anyhow::{Context, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tokio::task;

use crate::db::now_rfc3339;
use crate::entities::{
    banned_users, links, password_reset_tokens, profiles, sessions, uid_sequence, user_badges,
    users, verification_codes,
};

/// Everything needed to insert a user row. Password hash is absent for
/// Discord-created accounts.
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub uid: i64,
    pub role: users::Role,
    pub is_verified: bool,
    pub discord_id: Option<String>,
    pub discord_username: Option<String>,
    pub discord_avatar: Option<String>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Next public UID. A bare insert into the sequence table; AUTOINCREMENT
    /// makes the returned id monotonic and never reused, including under
    /// concurrent registrations.
    pub async fn allocate_uid(&self) -> Result<i64> {
        let row = uid_sequence::ActiveModel {
            created_at: Set(now_rfc3339()),
            ..Default::default()
        };

        let res = uid_sequence::Entity::insert(row)
            .exec(&self.conn)
            .await
            .context("Failed to allocate UID")?;

        Ok(res.last_insert_id)
    }

    pub async fn create(&self, new: NewUser) -> Result<users::Model> {
        let now = now_rfc3339();

        let user = users::ActiveModel {
            username: Set(new.username.to_lowercase()),
            email: Set(new.email.to_lowercase()),
            password_hash: Set(new.password_hash),
            uid: Set(new.uid),
            role: Set(new.role),
            is_verified: Set(new.is_verified),
            discord_id: Set(new.discord_id),
            discord_username: Set(new.discord_username),
            discord_avatar: Set(new.discord_avatar),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert user")?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by id")
    }

    pub async fn get_by_uid(&self, uid: i64) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Uid.eq(uid))
            .one(&self.conn)
            .await
            .context("Failed to query user by UID")
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username.to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email.to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")
    }

    /// Login lookup: one identifier matched against username OR email,
    /// case-insensitively.
    pub async fn get_by_username_or_email(&self, ident: &str) -> Result<Option<users::Model>> {
        let ident = ident.to_lowercase();
        users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Username.eq(ident.clone()))
                    .add(users::Column::Email.eq(ident)),
            )
            .one(&self.conn)
            .await
            .context("Failed to query user by username or email")
    }

    pub async fn get_by_discord_id(&self, discord_id: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::DiscordId.eq(discord_id))
            .one(&self.conn)
            .await
            .context("Failed to query user by Discord id")
    }

    pub async fn username_or_email_taken(&self, username: &str, email: &str) -> Result<bool> {
        let count = users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Username.eq(username.to_lowercase()))
                    .add(users::Column::Email.eq(email.to_lowercase())),
            )
            .count(&self.conn)
            .await
            .context("Failed to check username/email availability")?;

        Ok(count > 0)
    }

    pub async fn username_taken(&self, username: &str) -> Result<bool> {
        let count = users::Entity::find()
            .filter(users::Column::Username.eq(username.to_lowercase()))
            .count(&self.conn)
            .await
            .context("Failed to check username availability")?;

        Ok(count > 0)
    }

    pub async fn set_verified(&self, user_id: i32) -> Result<()> {
        let user = self.require(user_id).await?;

        let mut active: users::ActiveModel = user.into();
        active.is_verified = Set(true);
        active.updated_at = Set(now_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn update_password(&self, user_id: i32, password_hash: String) -> Result<()> {
        let user = self.require(user_id).await?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(Some(password_hash));
        active.updated_at = Set(now_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn set_role(&self, user_id: i32, role: users::Role) -> Result<users::Model> {
        let user = self.require(user_id).await?;

        let mut active: users::ActiveModel = user.into();
        active.role = Set(role);
        active.updated_at = Set(now_rfc3339());
        let updated = active.update(&self.conn).await?;

        Ok(updated)
    }

    pub async fn set_status(
        &self,
        user_id: i32,
        is_verified: Option<bool>,
        role: Option<users::Role>,
    ) -> Result<users::Model> {
        let user = self.require(user_id).await?;

        let mut active: users::ActiveModel = user.into();
        if let Some(v) = is_verified {
            active.is_verified = Set(v);
        }
        if let Some(r) = role {
            active.role = Set(r);
        }
        active.updated_at = Set(now_rfc3339());
        let updated = active.update(&self.conn).await?;

        Ok(updated)
    }

    /// Refresh the cached Discord handle/avatar on an already-linked account.
    pub async fn update_discord_profile(
        &self,
        user_id: i32,
        discord_username: Option<String>,
        discord_avatar: Option<String>,
    ) -> Result<users::Model> {
        let user = self.require(user_id).await?;

        let mut active: users::ActiveModel = user.into();
        active.discord_username = Set(discord_username);
        active.discord_avatar = Set(discord_avatar);
        active.updated_at = Set(now_rfc3339());
        let updated = active.update(&self.conn).await?;

        Ok(updated)
    }

    /// Bind a Discord identity to an existing local account (account merge).
    pub async fn link_discord(
        &self,
        user_id: i32,
        discord_id: String,
        discord_username: Option<String>,
        discord_avatar: Option<String>,
    ) -> Result<users::Model> {
        let user = self.require(user_id).await?;

        let mut active: users::ActiveModel = user.into();
        active.discord_id = Set(Some(discord_id));
        active.discord_username = Set(discord_username);
        active.discord_avatar = Set(discord_avatar);
        active.updated_at = Set(now_rfc3339());
        let updated = active.update(&self.conn).await?;

        Ok(updated)
    }

    /// Paginated listing with a contains-style search over username, email
    /// and the UID rendered as text.
    pub async fn search(
        &self,
        page: u64,
        per_page: u64,
        query: Option<&str>,
    ) -> Result<(Vec<users::Model>, u64)> {
        let mut find = users::Entity::find();

        if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
            let needle = q.to_lowercase();
            let mut cond = Condition::any()
                .add(users::Column::Username.contains(needle.clone()))
                .add(users::Column::Email.contains(needle));
            if let Ok(uid) = q.parse::<i64>() {
                cond = cond.add(users::Column::Uid.eq(uid));
            }
            find = find.filter(cond);
        }

        let paginator = find
            .order_by_desc(users::Column::CreatedAt)
            .paginate(&self.conn, per_page.max(1));

        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((rows, total))
    }

    pub async fn recent(&self, limit: u64) -> Result<Vec<users::Model>> {
        users::Entity::find()
            .order_by_desc(users::Column::CreatedAt)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list recent users")
    }

    pub async fn list_recipients(&self, admins_only: bool) -> Result<Vec<users::Model>> {
        let mut find = users::Entity::find().filter(users::Column::IsVerified.eq(true));
        if admins_only {
            find = find.filter(
                Condition::any()
                    .add(users::Column::Role.eq(users::Role::Admin))
                    .add(users::Column::Role.eq(users::Role::Owner)),
            );
        }

        find.all(&self.conn)
            .await
            .context("Failed to list email recipients")
    }

    pub async fn count(&self) -> Result<u64> {
        users::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")
    }

    pub async fn count_verified(&self) -> Result<u64> {
        users::Entity::find()
            .filter(users::Column::IsVerified.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to count verified users")
    }

    pub async fn count_created_since(&self, cutoff: &str) -> Result<u64> {
        users::Entity::find()
            .filter(users::Column::CreatedAt.gt(cutoff))
            .count(&self.conn)
            .await
            .context("Failed to count recent users")
    }

    /// Hard delete with explicit cleanup of every dependent table. sqlite
    /// foreign keys are not relied upon.
    pub async fn delete_cascade(&self, user_id: i32) -> Result<()> {
        profiles::Entity::delete_many()
            .filter(profiles::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;
        links::Entity::delete_many()
            .filter(links::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;
        verification_codes::Entity::delete_many()
            .filter(verification_codes::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;
        password_reset_tokens::Entity::delete_many()
            .filter(password_reset_tokens::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;
        banned_users::Entity::delete_many()
            .filter(banned_users::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;
        user_badges::Entity::delete_many()
            .filter(user_badges::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;
        sessions::Entity::delete_many()
            .filter(sessions::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;
        // Audit entries referencing the user stay; the log is append-only.
        users::Entity::delete_by_id(user_id)
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(())
    }

    async fn require(&self, user_id: i32) -> Result<users::Model> {
        self.get_by_id(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {user_id}"))
    }
}

/// Hash a password with Argon2id and a fresh random salt. CPU-bound; call
/// sites wrap this in `spawn_blocking`.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored hash off the async runtime.
pub async fn verify_password(password_hash: String, password: String) -> Result<bool> {
    let is_valid = task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        Ok::<bool, anyhow::Error>(
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")??;

    Ok(is_valid)
}
