use super::LicenseClient;
use crate::error::Result;
use crate::models::{Command, License, LicenseCode, ValidateOptions};

impl LicenseClient {
    /// Validate a key for this machine, activating the machine if needed.
    ///
    /// When the first validation reports an activation-required code the
    /// machine is activated once and the key validated again; the second
    /// result is returned whatever it says. Invalid licenses are returned,
    /// not raised. Only failed backend calls produce an error.
    pub async fn validate_key(&self, options: ValidateOptions) -> Result<License> {
        let ValidateOptions {
            key,
            entitlements,
            cache_valid_response,
        } = options;

        let command = Command::ValidateKey {
            key,
            entitlements,
            cache_valid_response,
        };

        let license: License = self.fetch(command.clone()).await?;
        if !LicenseCode::code_requires_activation(&license.code) {
            return Ok(license);
        }

        tracing::info!(
            key = %license.key,
            code = %license.code,
            "machine not activated, activating"
        );

        // the reply describes a machine, not a license
        self.send(Command::Activate).await?;

        let license: License = self.fetch(command).await?;
        if LicenseCode::code_requires_activation(&license.code) {
            tracing::warn!(
                key = %license.key,
                code = %license.code,
                "activation did not bind this machine"
            );
        }

        Ok(license)
    }
}
