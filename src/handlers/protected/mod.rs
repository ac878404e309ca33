// handlers/protected/mod.rs - Handlers behind the auth gate
//
// These run only after the gate admitted the request, so SessionUser is always
// present in the request extensions.

pub mod profile;
pub mod session;
pub mod signup;

pub use profile::profile_get as user_profile;
pub use session::logout as user_logout;
pub use signup::signup_page as user_signup_page;
pub use signup::signup_submit as user_signup_submit;
pub use signup::signup_success as user_signup_success;
