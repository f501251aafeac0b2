pub mod booking;
pub mod payment;
pub mod refund_request;
