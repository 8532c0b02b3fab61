pub mod eap;
pub mod health;
