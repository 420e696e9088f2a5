use std::sync::Arc;
use std::time::Instant;

use sea_orm::DatabaseConnection;

use crate::auth::NonceAuthenticator;
use crate::eligibility::EligibilityPolicy;
use crate::ratelimit::RateLimiter;
use crate::reconciler::CacheReconciler;
use crate::registrar::TransactionRegistrar;
use crate::rpc::RpcClient;

#[derive(Clone)]
pub struct AppState {
    pub database: DatabaseConnection,
    pub rpc: RpcClient,
    pub authenticator: Arc<NonceAuthenticator>,
    pub rate_limiter: Arc<RateLimiter>,
    pub reconciler: CacheReconciler,
    pub eligibility: EligibilityPolicy,
    pub registrar: TransactionRegistrar,
    pub mint_rate_limit: u32,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        database: DatabaseConnection,
        rpc: RpcClient,
        authenticator: Arc<NonceAuthenticator>,
        rate_limiter: Arc<RateLimiter>,
        reconciler: CacheReconciler,
        mint_rate_limit: u32,
    ) -> Self {
        assert!(mint_rate_limit > 0, "Mint rate limit must be positive");
        let eligibility = EligibilityPolicy::new(rpc.clone());
        let registrar = TransactionRegistrar::new(database.clone(), rpc.clone());
        Self {
            database,
            rpc,
            authenticator,
            rate_limiter,
            reconciler,
            eligibility,
            registrar,
            mint_rate_limit,
            start_time: Instant::now(),
        }
    }
}
