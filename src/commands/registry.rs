use crate::types::CameraDefinition;
use tauri::command;

/// Cameras currently visible to the shim, in enumeration order.
#[command]
pub async fn get_cameras() -> Result<Vec<CameraDefinition>, String> {
    let shim = super::shim();
    shim.registry().wait_until_loaded().await;
    Ok(shim.registry().snapshot().to_vec())
}

/// Replace the persisted camera list. Takes effect on the next call to either
/// entry point.
#[command]
pub async fn set_cameras(cameras: Vec<CameraDefinition>) -> Result<(), String> {
    log::info!("Updating camera registry with {} camera(s)", cameras.len());
    // Make sure a client is following the store before publishing.
    super::shim();

    super::store().save(&cameras).await.map_err(|e| {
        log::error!("Failed to save cameras: {}", e);
        format!("Failed to save cameras: {}", e)
    })
}
