use serde::{Deserialize, Serialize};

/// Response envelope shared by every gateway endpoint.
///
/// `status` is 0 on success and -1 on failure; `msg` carries either "ok"
/// or a `CODE: detail` string the client can branch on.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: i32,
    pub msg: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: 0,
            msg: "ok".to_string(),
            data,
        }
    }

    pub fn error(status: i32, msg: String, data: T) -> Self {
        Self { status, msg, data }
    }
}
