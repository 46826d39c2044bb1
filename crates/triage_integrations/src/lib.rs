pub mod oauth;
pub mod outlook;
pub mod token_store;

pub use oauth::{AuthorizationRequest, OAuthClient, OAuthConfig, OAuthToken};
pub use outlook::{EmailAddress, EmailMessage, ItemBody, OutlookMailClient, Recipient};
pub use token_store::{StoredToken, TokenStore};
