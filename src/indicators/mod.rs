pub mod error;
pub mod evaluator;
pub mod validation;

pub mod momentum;
pub mod trend;

pub use error::IndicatorError;
pub use evaluator::{evaluate, try_evaluate};
pub use validation::*;
