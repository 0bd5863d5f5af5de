pub mod checkout;
pub mod claims;
pub mod github_login;
pub mod login;
pub mod logout;
pub mod session;
pub mod signup;

pub use checkout::handle_checkout;
pub use login::handle_login;
pub use login::handle_me;
pub use logout::handle_logout;
pub use signup::handle_signup;
