use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

#[derive(Debug, Clone, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifySessionQuery {
    /// Checkout session id returned when the session was opened
    pub session_id: Option<String>,
}
