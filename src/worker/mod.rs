pub mod analysis_worker;

pub use analysis_worker::run as run_analysis_worker;
pub use analysis_worker::run_with_channel as run_analysis_worker_with_channel;
