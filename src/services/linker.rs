use anyhow::Result;

use crate::db::Store;
use crate::entities::users::{self, Role};
use crate::services::oauth::DiscordProfile;

/// How a Discord identity mapped onto a local account. First match wins:
/// an existing link, then an email merge, then a fresh account.
#[derive(Debug)]
pub enum LinkOutcome {
    Existing(users::Model),
    Merged(users::Model),
    Created(users::Model),
}

impl LinkOutcome {
    #[must_use]
    pub fn user(&self) -> &users::Model {
        match self {
            Self::Existing(u) | Self::Merged(u) | Self::Created(u) => u,
        }
    }
}

/// Binds third-party identities to local accounts.
#[derive(Clone)]
pub struct LinkService {
    store: Store,
}

impl LinkService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, profile: &DiscordProfile) -> Result<LinkOutcome> {
        let users = self.store.user_repo();

        // Already linked: refresh the cached handle and avatar.
        if let Some(user) = users.get_by_discord_id(&profile.id).await? {
            let user = users
                .update_discord_profile(
                    user.id,
                    Some(profile.username.clone()),
                    profile.avatar.clone(),
                )
                .await?;
            return Ok(LinkOutcome::Existing(user));
        }

        // Same email as an unlinked local account: merge.
        if let Some(email) = &profile.email
            && let Some(user) = users.get_by_email(email).await?
        {
            let user = users
                .link_discord(
                    user.id,
                    profile.id.clone(),
                    Some(profile.username.clone()),
                    profile.avatar.clone(),
                )
                .await?;
            return Ok(LinkOutcome::Merged(user));
        }

        // Nothing matched: create a pre-verified account with the next UID.
        let uid = users.allocate_uid().await?;
        let role = if uid == 1 { Role::Owner } else { Role::User };

        let username = self.unique_username(&profile.username, uid).await?;
        let email = profile
            .email
            .as_ref()
            .map_or_else(|| placeholder_email(&profile.id), |e| e.to_lowercase());

        let user = users
            .create(crate::db::repositories::user::NewUser {
                username,
                email,
                password_hash: None,
                uid,
                role,
                is_verified: true,
                discord_id: Some(profile.id.clone()),
                discord_username: Some(profile.username.clone()),
                discord_avatar: profile.avatar.clone(),
            })
            .await?;

        self.store.profile_repo().create_default(user.id).await?;

        Ok(LinkOutcome::Created(user))
    }

    /// Sanitized handle, with numeric suffixes appended until free.
    async fn unique_username(&self, handle: &str, uid: i64) -> Result<String> {
        let base = sanitize_handle(handle, uid);
        let users = self.store.user_repo();

        if !users.username_taken(&base).await? {
            return Ok(base);
        }

        let mut counter = 1u32;
        loop {
            let candidate = format!("{base}{counter}");
            if !users.username_taken(&candidate).await? {
                return Ok(candidate);
            }
            counter += 1;
        }
    }
}

/// Lowercase the handle and drop whitespace and angle brackets, the same
/// characters local registration rejects. Empty results fall back to
/// `user{uid}`.
#[must_use]
pub fn sanitize_handle(handle: &str, uid: i64) -> String {
    let cleaned: String = handle
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '<' && *c != '>')
        .collect();

    if cleaned.is_empty() {
        format!("user{uid}")
    } else {
        cleaned
    }
}

/// Synthesized address for providers that withhold the email.
#[must_use]
pub fn placeholder_email(discord_id: &str) -> String {
    format!("{discord_id}@discord.user")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_rejected_characters() {
        assert_eq!(sanitize_handle("Cool User<1>", 9), "cooluser1");
        assert_eq!(sanitize_handle("plain", 9), "plain");
    }

    #[test]
    fn sanitize_falls_back_to_uid_name() {
        assert_eq!(sanitize_handle("< > \t", 12), "user12");
        assert_eq!(sanitize_handle("", 3), "user3");
    }

    #[test]
    fn placeholder_email_uses_discord_id() {
        assert_eq!(placeholder_email("987"), "987@discord.user");
    }
}
