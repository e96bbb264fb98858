// Domain operations over the database. Every operation takes the acting user's id
// explicitly.

pub mod account_service;
pub mod chat_service;
pub mod social_service;

pub use account_service::{AccountOverview, AccountService, Submission};
pub use chat_service::{ChatDetail, ChatService};
pub use social_service::{LikeOutcome, PostDetail, SocialService, UserProfile};
