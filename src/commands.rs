use crate::scheduler::Status;
use crate::{lock_scheduler, sync_tray, SharedScheduler};
use tauri::{AppHandle, State};

#[tauri::command]
pub fn get_status(scheduler: State<'_, SharedScheduler>) -> Result<Status, String> {
    Ok(lock_scheduler(&scheduler).status())
}

#[tauri::command]
pub fn start_jiggling(app: AppHandle, scheduler: State<'_, SharedScheduler>) -> Result<(), String> {
    lock_scheduler(&scheduler).start();
    sync_tray(&app);
    Ok(())
}

#[tauri::command]
pub fn stop_jiggling(app: AppHandle, scheduler: State<'_, SharedScheduler>) -> Result<(), String> {
    lock_scheduler(&scheduler).stop();
    sync_tray(&app);
    Ok(())
}
