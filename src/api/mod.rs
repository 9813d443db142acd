pub mod access_log;
pub mod envelope;
pub mod handlers;
pub mod routes;

pub use access_log::*;
pub use envelope::*;
pub use handlers::*;
pub use routes::*;
