pub mod rules;
pub mod service;

pub use service::AgencyService;
