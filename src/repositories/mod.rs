pub mod booking_repo;
pub mod refund_request_repo;
