mod member;
mod organization;
mod upload;
mod user;
mod workspace;

pub use member::*;
pub use organization::*;
pub use upload::*;
pub use user::*;
pub use workspace::*;
