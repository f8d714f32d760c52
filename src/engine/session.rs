use chrono::Utc;

use super::LicenseClient;
use crate::error::Result;
use crate::models::{Command, License};

impl LicenseClient {
    /// The backend's current license. `None` when nothing is loaded.
    pub async fn license(&self) -> Result<Option<License>> {
        self.fetch(Command::GetLicense).await
    }

    /// The backend's current license key. `None` when nothing is stored.
    pub async fn license_key(&self) -> Result<Option<String>> {
        self.fetch(Command::GetLicenseKey).await
    }

    /// Whether a license is loaded and valid.
    pub async fn has_valid_license(&self) -> Result<bool> {
        Ok(self.license().await?.is_some_and(|license| license.valid))
    }

    /// Whether the current license still covers updates released now.
    pub async fn can_update(&self) -> Result<bool> {
        let now = Utc::now();
        Ok(self
            .license()
            .await?
            .is_some_and(|license| !license.has_expired(now)))
    }

    /// Clear the current license.
    ///
    /// A soft reset keeps cached validation responses and leases; a hard
    /// reset drops them too.
    pub async fn reset_license(&self, hard_reset: bool) -> Result<()> {
        self.send(Command::ResetLicense { hard_reset }).await?;
        Ok(())
    }

    /// Forget the stored license key. The current license is left alone.
    pub async fn reset_license_key(&self) -> Result<()> {
        self.send(Command::ResetLicenseKey).await?;
        Ok(())
    }
}
