pub mod account;
pub mod account_impl;
pub mod audit;
pub mod linker;
pub mod mailer;
pub mod oauth;
pub mod token;

pub use account::{AccountError, AccountService, AuthenticatedUser};
pub use account_impl::SeaOrmAccountService;
pub use audit::AuditService;
pub use linker::{LinkOutcome, LinkService};
pub use mailer::{Mailer, NoopMailer, ResendMailer};
pub use oauth::{DiscordApi, DiscordClient, DiscordProfile, ProfileFetch, TokenExchange};
pub use token::{Claims, TokenSigner};
