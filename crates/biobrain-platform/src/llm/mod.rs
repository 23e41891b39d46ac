pub mod wire;
pub mod openrouter;

pub use openrouter::OpenRouterProvider;
