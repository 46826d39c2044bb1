pub mod classifier;
pub mod label;

pub use classifier::{ClassifierError, GeminiClassifier};
pub use label::Label;
