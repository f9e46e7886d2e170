pub mod auth;
pub mod health;
pub mod pay;
pub mod rpc;

use actix_web::web;
use nitro_auth::ChannelVerifier;

/// Mount every gateway route.
pub fn configure<V: ChannelVerifier + 'static>(cfg: &mut web::ServiceConfig) {
    health::configure::<V>(cfg);
    pay::configure::<V>(cfg);
    auth::configure::<V>(cfg);
    rpc::configure::<V>(cfg);
}
