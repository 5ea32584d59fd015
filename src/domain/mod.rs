pub mod asn1; // minimal DER reader/writer for timestamp exchanges
pub mod constants;
pub mod crypto;
pub mod document;
pub mod key_entry;
pub mod parameters;
pub mod timestamp;
pub mod to_be_signed;
pub mod types;
pub mod verification;
