//! Reference API served by the `swift-api` binary and used by `api-cli`.

use serde::{Deserialize, Serialize};

use crate::api::{define_api, route, ApiDefinition};
use crate::http::{ApiRequest, ApiServer, ServerError};
use crate::schema::Typed;

pub const AUTH: &str = "/auth";
pub const GREET: &str = "/greet";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub logged_in: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreetRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreetResponse {
    pub msg: String,
}

/// The demo API: `/auth` and `/greet`.
pub fn api() -> ApiDefinition {
    define_api(
        ApiDefinition::new()
            .route(
                AUTH,
                route(Typed::<AuthRequest>::new(), Typed::<AuthResponse>::new()),
            )
            .route(
                GREET,
                route(Typed::<GreetRequest>::new(), Typed::<GreetResponse>::new()),
            ),
    )
}

pub async fn auth(req: ApiRequest<AuthRequest>) -> AuthResponse {
    let logged_in = req.body.username == "admin" && req.body.password == "password";
    AuthResponse { logged_in }
}

pub async fn greet(req: ApiRequest<GreetRequest>) -> GreetResponse {
    let name = req.body.name.as_deref().unwrap_or("World");
    GreetResponse {
        msg: format!("Hello, {}!", name),
    }
}

/// Bind the demo handlers to `server`.
pub fn register(server: &mut ApiServer) -> Result<(), ServerError> {
    server.on(AUTH, auth)?.on(GREET, greet)?;
    Ok(())
}
