pub mod guard;
pub mod session;

pub use guard::AuthorizedSession;
pub use session::{SessionContext, SessionLifetime};
