pub mod classifier;
pub mod lifecycle;
pub mod scanner;

pub use lifecycle::ScanLifecycle;
pub use scanner::BluerScanner;
