pub mod aka;
pub mod mppe;
pub mod sqn;
pub mod validation;

pub use aka::{gen_mac, sign_packet, verify_packet_mac, AkaKeys};
pub use sqn::{check_freshness, extract_sqn, SqnError};
pub use validation::{validate_authentication_vector, HexVector, ValidationError, ValidationResult};
