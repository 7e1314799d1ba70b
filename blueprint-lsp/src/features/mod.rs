pub mod completion;
pub mod diagnostics;
pub mod settings;
