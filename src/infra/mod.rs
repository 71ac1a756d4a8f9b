pub mod email;
pub mod factory;
pub mod payment;
pub mod provisioner;
pub mod repositories;
