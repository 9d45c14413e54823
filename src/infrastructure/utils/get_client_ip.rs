use actix_web::HttpRequest;

use crate::entities::submission::ClientInfo;

/// Extract the client's IP address from the request, considering X-Forwarded-For if trusted.
/// Only the first (client-most) hop of the header is used.
pub fn get_client_ip(req: &HttpRequest, trust_x_forwarded_for: bool) -> String {
    if trust_x_forwarded_for {
        let forwarded = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn client_info(req: &HttpRequest, trust_x_forwarded_for: bool) -> ClientInfo {
    ClientInfo {
        ip: get_client_ip(req, trust_x_forwarded_for),
        user_agent: req
            .headers()
            .get("user-agent")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    }
}
