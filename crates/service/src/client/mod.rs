pub mod repository;
pub mod repo;
pub mod service;

pub use repository::ClientRepository;
pub use service::ClientCatalogService;
