pub mod avatar;
pub mod github;
pub mod post_service;
pub mod profile_service;
pub mod user_service;

pub use github::{GithubClient, GithubError, GithubRepo};
pub use post_service::{PostError, PostService};
pub use profile_service::{ProfileError, ProfileService};
pub use user_service::{UserError, UserService};
