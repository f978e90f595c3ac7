mod engine;
mod generator;
mod input;
mod llm;
mod profile;
mod renderer;
mod setup;

pub use input::JobInput;
pub use setup::ConfigChanges;

// Export the main engine
pub use engine::{Engine, GeneratedLetter, SetupOptions};
