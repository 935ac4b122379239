use crate::application::services::IntegrationOverview;
use crate::domain::entities::{SyncProgress, SyncStatus};
use crate::domain::value_objects::SyncWindowOption;
use crate::presentation::dto::ApiResponse;
use crate::presentation::dto::sync_dto::{
    AuthStatusResponse, IntegrationRequest, SetAutoSyncEnabledRequest, SetSyncIntervalRequest,
    SetSyncWindowRequest, SyncedRecordResponse, TriggerSyncResponse,
};
use crate::shared::AppError;
use crate::state::AppState;
use tauri::State;

/// 全連携の同期概要を取得
#[tauri::command]
pub async fn get_sync_overview(
    state: State<'_, AppState>,
) -> Result<ApiResponse<Vec<IntegrationOverview>>, AppError> {
    let result = state.sync_handler.get_overview().await;
    Ok(ApiResponse::from_result(result))
}

/// 完了/エラー表示を閉じてIdleに戻す
#[tauri::command]
pub async fn dismiss_sync_result(
    state: State<'_, AppState>,
    request: IntegrationRequest,
) -> Result<ApiResponse<SyncProgress>, AppError> {
    let result = state.sync_handler.dismiss_sync_result(request);
    Ok(ApiResponse::from_result(result))
}

#[tauri::command]
pub async fn get_sync_status(
    state: State<'_, AppState>,
    request: IntegrationRequest,
) -> Result<ApiResponse<Option<SyncStatus>>, AppError> {
    let result = state.sync_handler.get_status(request).await;
    Ok(ApiResponse::from_result(result))
}

/// 手動同期（実行中ならスキップ）
#[tauri::command]
pub async fn trigger_sync(
    state: State<'_, AppState>,
    request: IntegrationRequest,
) -> Result<ApiResponse<TriggerSyncResponse>, AppError> {
    let result = state.sync_handler.trigger_sync(request).await;
    Ok(ApiResponse::from_result(result))
}

#[tauri::command]
pub async fn set_auto_sync_enabled(
    state: State<'_, AppState>,
    request: SetAutoSyncEnabledRequest,
) -> Result<ApiResponse<()>, AppError> {
    let result = state.sync_handler.set_auto_sync_enabled(request).await;
    Ok(ApiResponse::from_result(result))
}

#[tauri::command]
pub async fn set_sync_interval_minutes(
    state: State<'_, AppState>,
    request: SetSyncIntervalRequest,
) -> Result<ApiResponse<u32>, AppError> {
    let result = state.sync_handler.set_sync_interval_minutes(request).await;
    Ok(ApiResponse::from_result(result))
}

#[tauri::command]
pub async fn set_sync_window(
    state: State<'_, AppState>,
    request: SetSyncWindowRequest,
) -> Result<ApiResponse<String>, AppError> {
    let result = state.sync_handler.set_sync_window(request).await;
    Ok(ApiResponse::from_result(result))
}

#[tauri::command]
pub async fn get_sync_windows(
    state: State<'_, AppState>,
) -> Result<ApiResponse<Vec<SyncWindowOption>>, AppError> {
    Ok(ApiResponse::success(state.sync_handler.get_sync_windows()))
}

#[tauri::command]
pub async fn get_auth_status(
    state: State<'_, AppState>,
    request: IntegrationRequest,
) -> Result<ApiResponse<AuthStatusResponse>, AppError> {
    let result = state.sync_handler.get_auth_status(request).await;
    Ok(ApiResponse::from_result(result))
}

/// ソース側のログインフローを起動
#[tauri::command]
pub async fn reauthenticate_source(
    state: State<'_, AppState>,
    request: IntegrationRequest,
) -> Result<ApiResponse<AuthStatusResponse>, AppError> {
    let result = state.sync_handler.reauthenticate(request).await;
    Ok(ApiResponse::from_result(result))
}

#[tauri::command]
pub async fn acknowledge_reauthentication(
    state: State<'_, AppState>,
    request: IntegrationRequest,
) -> Result<ApiResponse<AuthStatusResponse>, AppError> {
    let result = state.sync_handler.acknowledge_reauthentication(request).await;
    Ok(ApiResponse::from_result(result))
}

#[tauri::command]
pub async fn list_synced_records(
    state: State<'_, AppState>,
    request: IntegrationRequest,
) -> Result<ApiResponse<Vec<SyncedRecordResponse>>, AppError> {
    let result = state.sync_handler.list_synced_records(request).await;
    Ok(ApiResponse::from_result(result))
}
