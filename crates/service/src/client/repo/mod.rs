pub mod memory;
pub mod seaorm;

pub use memory::InMemoryClientRepository;
pub use seaorm::SeaOrmClientRepository;
