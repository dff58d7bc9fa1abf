use actix_web::{post, web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

use crate::errors::RelayError;
use crate::relay;
use crate::AppState;

/// JSON body of `POST /verify`. Fields are optional so that a missing value
/// gets the relay's own error instead of a deserializer message.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub signature: Option<String>,
    pub buyer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub txid: String,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /verify
#[post("/verify")]
async fn verify(
    state: web::Data<AppState>,
    req: web::Json<VerifyRequest>,
) -> Result<HttpResponse, RelayError> {
    let VerifyRequest { signature, buyer } = req.into_inner();
    let (Some(signature), Some(buyer)) = (present(signature), present(buyer)) else {
        return Err(RelayError::MissingField);
    };

    match relay::redeem(state.get_ref(), &signature, &buyer).await {
        Ok(redemption) => Ok(HttpResponse::Ok().json(VerifyResponse {
            success: true,
            txid: redemption.txid.to_string(),
        })),
        Err(e) => {
            if e.status_code().is_server_error() {
                tracing::error!(?e, %signature, %buyer, "verify failed");
            }
            Err(e)
        }
    }
}

/// Registers `/verify` along with its JSON rejection handler.
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    let json = web::JsonConfig::default()
        .error_handler(|err, _req| RelayError::MalformedBody(err.to_string()).into());
    cfg.app_data(json).service(verify);
}
