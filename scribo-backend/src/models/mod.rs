mod note;
mod pagination;
mod session;
mod user;

pub use note::*;
pub use pagination::*;
pub use session::*;
pub use user::*;
