pub mod loader;
pub mod verify;

pub use loader::ProgramLoader;
pub use verify::verify;
