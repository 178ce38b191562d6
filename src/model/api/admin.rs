use serde::{Deserialize, Serialize};

/// Raw admin credentials, received from a user. These are never stored
/// directly, since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub reference_number: String,
    pub password: String,
}
