pub mod history;
pub mod host_service;
pub mod metrics_service;
pub mod sample_store;
pub mod threshold_service;

pub use host_service::HostService;
pub use threshold_service::ThresholdService;
