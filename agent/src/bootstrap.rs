use custodian_license::{Custody, LicenseError, LicenseResult};
use std::time::Duration;
use tracing::{info, warn};

/// Retries `load` every `interval` until it succeeds, then saves the license
/// to the cache file. A failed save is logged and otherwise ignored; the
/// license stays usable in memory.
///
/// Gives up with [`LicenseError::ChannelClosed`] once the custody worker is
/// gone, since no later attempt can succeed.
pub async fn load_until_ready(custody: &Custody, interval: Duration) -> LicenseResult<()> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match custody.load().await {
            Ok(()) => break,
            Err(LicenseError::ChannelClosed) => return Err(LicenseError::ChannelClosed),
            Err(e) => {
                warn!("License load attempt {attempt} failed: {e}");
                tokio::time::sleep(interval).await;
            }
        }
    }

    info!("License ready after {attempt} attempt(s)");
    if let Err(e) = custody.save().await {
        warn!("Could not cache license: {e}");
    }
    Ok(())
}
