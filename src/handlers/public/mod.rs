// handlers/public/mod.rs - Handlers reachable without a verified session
//
// Every route here must also be listed in middleware::auth::BYPASS_PATHS,
// otherwise the gate rejects it before the handler runs.

pub mod login;

pub use login::login_page as user_login_page;
pub use login::login_submit as user_login_submit;
