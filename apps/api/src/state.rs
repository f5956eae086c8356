use std::sync::Arc;

use wardkeep_application::{
    AuthorizationService, ChangeRequestService, PermissionAdminService, UserRepository,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub authorization_service: AuthorizationService,
    pub permission_admin_service: PermissionAdminService,
    pub change_request_service: ChangeRequestService,
    pub user_repository: Arc<dyn UserRepository>,
}
