mod build;
mod deploy;
mod eject;
mod routes;

pub use build::build;
pub use deploy::deploy;
pub use eject::eject;
pub use routes::routes;
