// handlers/mod.rs - Page handlers by security tier
//
// Public (bypassed by the auth gate) → Protected (session verified by the gate)
pub mod public;    // /users/login
pub mod protected; // /users/profile, /users/logout, /users/signup
