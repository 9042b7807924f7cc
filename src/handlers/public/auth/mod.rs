// handlers/public/auth - sign-up, confirmation and login against the identity provider
//
// POST /auth/signup  - register with email + password, a confirmation code is issued
// POST /auth/confirm - confirm the account with that code
// POST /auth/login   - exchange credentials for id/access/refresh tokens

pub mod confirm;
pub mod login;
pub mod sign_up;

pub use confirm::confirm;
pub use login::login;
pub use sign_up::sign_up;
