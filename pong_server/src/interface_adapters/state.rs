use crate::use_cases::SessionHandle;

pub struct AppState {
    // Command and status access for the single game session.
    pub session: SessionHandle,
}
