pub mod prelude;

pub mod audit_log;
pub mod badges;
pub mod banned_users;
pub mod links;
pub mod password_reset_tokens;
pub mod profiles;
pub mod sessions;
pub mod uid_sequence;
pub mod user_badges;
pub mod users;
pub mod verification_codes;
