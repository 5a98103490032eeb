pub use super::audit_log::Entity as AuditLog;
pub use super::badges::Entity as Badges;
pub use super::banned_users::Entity as BannedUsers;
pub use super::links::Entity as Links;
pub use super::password_reset_tokens::Entity as PasswordResetTokens;
pub use super::profiles::Entity as Profiles;
pub use super::sessions::Entity as Sessions;
pub use super::uid_sequence::Entity as UidSequence;
pub use super::user_badges::Entity as UserBadges;
pub use super::users::Entity as Users;
pub use super::verification_codes::Entity as VerificationCodes;
