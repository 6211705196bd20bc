/// CRUD provider configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Message carried by internal errors in place of the store fault
    pub error_message: String,
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self {
            error_message: "data provider error".to_string(),
        }
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.error_message.trim().is_empty() {
            return Err("error_message must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new()
    }
}
