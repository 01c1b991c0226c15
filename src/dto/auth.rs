use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by staff bearer tokens. Tokens are issued by the identity
/// provider; the `seed` binary mints one for local use.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub shop_id: String,
    pub exp: usize,
}
