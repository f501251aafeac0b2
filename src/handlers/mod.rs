pub mod payment_handler;
pub mod razorpay_service;
pub mod refund_request_handler;
