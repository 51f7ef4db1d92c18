pub mod credential;

pub use credential::{SasCredential, mask_sas_in, mask_token};
