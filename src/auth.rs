use crate::types::LongString;

/// Broker credentials. PLAIN is the supported SASL mechanism.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new("guest".to_string(), "guest".to_string())
    }
}

impl Credentials {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn sasl_plain_auth_string(&self) -> LongString {
        format!("\u{0}{}\u{0}{}", self.username, self.password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_auth_string_is_null_delimited() {
        let credentials = Credentials::new("user".to_string(), "pass".to_string());
        assert_eq!(credentials.sasl_plain_auth_string(), "\u{0}user\u{0}pass");
    }
}
