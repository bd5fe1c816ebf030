pub mod admin;
pub mod load;
pub mod route;

pub use admin::{run_create, run_drop, run_info, run_rollover, run_update, run_validate};
pub use load::{run_load, DocumentSource, LoadOptions};
pub use route::run_route;
