use std::path::Path;

use log::info;

use crate::error::IngestError;
use crate::roster::TenantRoster;
use crate::storage;

/// Creates the destination root, the error bucket, and one directory per
/// active tenant. Existing directories are left untouched.
///
/// Returns the number of tenant directories created by this call.
pub fn provision_destination(
    root: &Path,
    error_bucket: &str,
    roster: &dyn TenantRoster,
) -> Result<usize, IngestError> {
    let tenants = roster.active_tenants()?;
    for tenant in &tenants {
        tenant.validate()?;
    }
    info!(
        "Provisioning {} tenant directories under {}",
        tenants.len(),
        root.display()
    );

    storage::ensure_directory(root)?;
    storage::ensure_directory(&root.join(error_bucket))?;

    let mut created = 0;
    for tenant in &tenants {
        let dir = root.join(tenant.directory_name());
        if !dir.exists() {
            storage::ensure_directory(&dir)?;
            info!("Created tenant directory {}", dir.display());
            created += 1;
        }
    }

    Ok(created)
}
