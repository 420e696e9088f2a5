//! Serves display data with graceful degradation: live chain state when
//! the contract answers, the persisted advisory cache when it does not.
//! Fresh reads are mirrored back into the project record through a
//! bounded queue consumed by a background writer, so the caller's
//! response never waits on persistence.

use chrono::{DateTime, Utc};
use sea_orm::ActiveModelTrait;
use sea_orm::ActiveValue::Set;
use sea_orm::DatabaseConnection;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::entities::mint_project;
use crate::mint::{self, MintStatus, NATIVE_DECIMALS};
use crate::models::mint::DisplayState;
use crate::rpc::{ContractSnapshot, RpcClient};

pub const REFRESH_QUEUE_CAPACITY: usize = 256;

/// One advisory cache write. Last writer wins; there is no ordering
/// guarantee between refreshes for the same record.
#[derive(Debug, Clone)]
pub struct CacheRefresh {
    pub project_id: i64,
    pub cached_supply: i64,
    pub cached_minted: i64,
    pub cached_price: String,
    pub cached_status: String,
}

#[derive(Clone)]
pub struct CacheReconciler {
    rpc: RpcClient,
    updates: mpsc::Sender<CacheRefresh>,
}

impl CacheReconciler {
    pub fn new(rpc: RpcClient, updates: mpsc::Sender<CacheRefresh>) -> Self {
        Self { rpc, updates }
    }

    pub async fn display_state(&self, project: &mint_project::Model) -> DisplayState {
        match self.rpc.fetch_snapshot(&project.contract_address).await {
            Ok(snapshot) => {
                self.enqueue_refresh(project, &snapshot);
                snapshot_display(project, &snapshot, mint::unix_now())
            }
            Err(err) => {
                debug!("Serving cached state for project {}: {err}", project.id);
                cached_display(project)
            }
        }
    }

    fn enqueue_refresh(&self, project: &mint_project::Model, snapshot: &ContractSnapshot) {
        let refresh = CacheRefresh {
            project_id: project.id,
            cached_supply: clamp_i64(snapshot.max_supply),
            cached_minted: clamp_i64(snapshot.total_supply),
            cached_price: mint::format_price(snapshot.mint_price, NATIVE_DECIMALS),
            cached_status: mint::derive_status(Some(snapshot), mint::unix_now())
                .as_str()
                .to_string(),
        };
        // A full queue drops the refresh; the cache is advisory and the
        // next read will enqueue again
        if let Err(err) = self.updates.try_send(refresh) {
            warn!("Cache refresh dropped for project {}: {err}", project.id);
        }
    }
}

/// Display view from a fresh snapshot. Admin overrides take precedence
/// over computed values here and only here.
pub fn snapshot_display(
    project: &mint_project::Model,
    snapshot: &ContractSnapshot,
    now_secs: u64,
) -> DisplayState {
    let status = mint::derive_status(Some(snapshot), now_secs);
    DisplayState {
        id: project.id,
        name: project.name.clone(),
        description: project.description.clone(),
        image: project.image.clone(),
        network: project.network.clone(),
        contract_address: project.contract_address.clone(),
        status: project
            .admin_status
            .clone()
            .unwrap_or_else(|| status.as_str().to_string()),
        price: mint::format_price(snapshot.mint_price, NATIVE_DECIMALS),
        supply: clamp_i64(snapshot.max_supply),
        minted: clamp_i64(snapshot.total_supply),
        wallet_limit: snapshot.wallet_mint_limit,
        start_time: project
            .admin_start_time
            .map(|ts| ts.with_timezone(&Utc))
            .or_else(|| snapshot.start_time.and_then(unix_to_utc)),
        end_time: project
            .admin_end_time
            .map(|ts| ts.with_timezone(&Utc))
            .or_else(|| snapshot.end_time.and_then(unix_to_utc)),
    }
}

/// Display view when the chain is unreachable: previously cached mirror
/// fields, neutral defaults for anything never synced.
pub fn cached_display(project: &mint_project::Model) -> DisplayState {
    DisplayState {
        id: project.id,
        name: project.name.clone(),
        description: project.description.clone(),
        image: project.image.clone(),
        network: project.network.clone(),
        contract_address: project.contract_address.clone(),
        status: project
            .admin_status
            .clone()
            .or_else(|| project.cached_status.clone())
            .unwrap_or_else(|| MintStatus::Ended.as_str().to_string()),
        price: project
            .cached_price
            .clone()
            .unwrap_or_else(|| mint::format_price(0, NATIVE_DECIMALS)),
        supply: project.cached_supply.unwrap_or(0),
        minted: project.cached_minted.unwrap_or(0),
        wallet_limit: 0,
        start_time: project.admin_start_time.map(|ts| ts.with_timezone(&Utc)),
        end_time: project.admin_end_time.map(|ts| ts.with_timezone(&Utc)),
    }
}

/// Consumes queued cache refreshes until shutdown. Write failures are
/// logged and discarded; they never reach the read path.
pub struct CacheWriter {
    database: DatabaseConnection,
    updates: mpsc::Receiver<CacheRefresh>,
}

impl CacheWriter {
    pub fn new(database: DatabaseConnection, updates: mpsc::Receiver<CacheRefresh>) -> Self {
        Self { database, updates }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting cache writer loop");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    match changed {
                        Ok(_) => {
                            if *shutdown.borrow() {
                                info!("Cache writer shutdown signal received");
                                break;
                            }
                        }
                        Err(_) => {
                            warn!("Shutdown channel closed unexpectedly. Exiting cache writer");
                            break;
                        }
                    }
                }
                update = self.updates.recv() => {
                    match update {
                        Some(update) => self.apply(update).await,
                        None => break,
                    }
                }
            }
        }
    }

    async fn apply(&self, update: CacheRefresh) {
        let project_id = update.project_id;
        let refresh = mint_project::ActiveModel {
            id: Set(project_id),
            cached_supply: Set(Some(update.cached_supply)),
            cached_minted: Set(Some(update.cached_minted)),
            cached_price: Set(Some(update.cached_price)),
            cached_status: Set(Some(update.cached_status)),
            last_sync_at: Set(Some(Utc::now().fixed_offset())),
            ..Default::default()
        };

        if let Err(err) = refresh.update(&self.database).await {
            warn!("Cache refresh failed for project {project_id}: {err}");
        }
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn unix_to_utc(ts: u64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(i64::try_from(ts).ok()?, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn project() -> mint_project::Model {
        mint_project::Model {
            id: 7,
            name: "Cyber Punks Genesis".to_string(),
            description: "First generation on Arc Testnet".to_string(),
            image: "/cyberpunk-neon-avatar.jpg".to_string(),
            network: "Arc Testnet".to_string(),
            contract_address: "0x177b3e8d4e3a4a2bfd191aacafdae76e4444fbb2".to_string(),
            admin_status: None,
            admin_start_time: None,
            admin_end_time: None,
            cached_supply: None,
            cached_minted: None,
            cached_price: None,
            cached_status: None,
            last_sync_at: None,
            created_at: Utc::now().fixed_offset(),
        }
    }

    fn snapshot() -> ContractSnapshot {
        ContractSnapshot {
            address: "0x177b3e8d4e3a4a2bfd191aacafdae76e4444fbb2".to_string(),
            total_supply: 120,
            max_supply: 1000,
            mint_price: 1_500_000_000_000_000_000,
            minting_active: true,
            wallet_mint_limit: 5,
            start_time: Some(1_000),
            end_time: Some(2_000),
        }
    }

    #[test]
    fn fresh_snapshot_display() {
        let state = snapshot_display(&project(), &snapshot(), 1_500);
        assert_eq!(state.status, "live");
        assert_eq!(state.price, "1.5 USDC");
        assert_eq!(state.supply, 1000);
        assert_eq!(state.minted, 120);
        assert_eq!(state.wallet_limit, 5);
        assert_eq!(state.start_time, Some(Utc.timestamp_opt(1_000, 0).unwrap()));
    }

    #[test]
    fn admin_override_beats_computed_status_and_times() {
        let mut record = project();
        record.admin_status = Some("upcoming".to_string());
        let admin_start = Utc.timestamp_opt(5_000, 0).unwrap().fixed_offset();
        record.admin_start_time = Some(admin_start);

        let state = snapshot_display(&record, &snapshot(), 1_500);
        assert_eq!(state.status, "upcoming");
        assert_eq!(state.start_time, Some(admin_start.with_timezone(&Utc)));
        // Computed fields still come from the chain
        assert_eq!(state.minted, 120);
    }

    #[test]
    fn unreachable_chain_serves_cached_fields() {
        let mut record = project();
        record.cached_status = Some("live".to_string());
        record.cached_price = Some("2 USDC".to_string());
        record.cached_supply = Some(500);
        record.cached_minted = Some(42);

        let state = cached_display(&record);
        assert_eq!(state.status, "live");
        assert_eq!(state.price, "2 USDC");
        assert_eq!(state.supply, 500);
        assert_eq!(state.minted, 42);
        assert_eq!(state.wallet_limit, 0);
    }

    #[test]
    fn never_synced_record_falls_back_to_neutral_defaults() {
        let state = cached_display(&project());
        assert_eq!(state.status, "ended");
        assert_eq!(state.price, "0 USDC");
        assert_eq!(state.supply, 0);
        assert_eq!(state.minted, 0);
        assert!(state.start_time.is_none());
    }
}
