pub mod payment_processor_client;
pub mod payment_service;
pub mod signature;

pub use payment_processor_client::PaymentProcessorClient;
pub use payment_service::PaymentService;
