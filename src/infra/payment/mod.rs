pub mod http_payment_service;
