pub mod mock;
pub mod openrouter;

pub use mock::MockProvider;
pub use openrouter::{OpenRouterProvider, OPENROUTER_BASE_URL};
