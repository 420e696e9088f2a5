use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::Expr;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Mint projects: off-chain display metadata plus the advisory cache
        // of the contract state last observed on chain
        manager
            .create_table(
                Table::create()
                    .table(MintProjects::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MintProjects::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MintProjects::Name)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(MintProjects::Description).text().not_null())
                    .col(
                        ColumnDef::new(MintProjects::Image)
                            .string_len(512)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MintProjects::Network)
                            .string_len(64)
                            .not_null(),
                    )
                    // One project per deployed sale contract
                    .col(
                        ColumnDef::new(MintProjects::ContractAddress)
                            .string_len(42)
                            .not_null()
                            .unique_key(),
                    )
                    // Admin overrides, display only
                    .col(ColumnDef::new(MintProjects::AdminStatus).string_len(16))
                    .col(ColumnDef::new(MintProjects::AdminStartTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(MintProjects::AdminEndTime).timestamp_with_time_zone())
                    // Advisory mirror of chain state, refreshed opportunistically
                    .col(ColumnDef::new(MintProjects::CachedSupply).big_integer())
                    .col(ColumnDef::new(MintProjects::CachedMinted).big_integer())
                    .col(ColumnDef::new(MintProjects::CachedPrice).string_len(64))
                    .col(ColumnDef::new(MintProjects::CachedStatus).string_len(16))
                    .col(ColumnDef::new(MintProjects::LastSyncAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(MintProjects::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Mint transactions submitted by wallets; tx_hash uniqueness makes
        // registration idempotent
        manager
            .create_table(
                Table::create()
                    .table(MintTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MintTransactions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MintTransactions::ProjectId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MintTransactions::WalletAddress)
                            .string_len(42)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MintTransactions::TxHash)
                            .string_len(66)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(MintTransactions::TokenId).big_integer())
                    .col(
                        ColumnDef::new(MintTransactions::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(MintTransactions::BlockNumber).big_integer())
                    .col(
                        ColumnDef::new(MintTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(MintTransactions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_mint_tx_project")
                            .from(MintTransactions::Table, MintTransactions::ProjectId)
                            .to(MintProjects::Table, MintProjects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_mint_tx_project")
                    .table(MintTransactions::Table)
                    .col(MintTransactions::ProjectId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_mint_tx_wallet")
                    .table(MintTransactions::Table)
                    .col(MintTransactions::WalletAddress)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MintTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MintProjects::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MintProjects {
    Table,
    Id,
    Name,
    Description,
    Image,
    Network,
    ContractAddress,
    AdminStatus,
    AdminStartTime,
    AdminEndTime,
    CachedSupply,
    CachedMinted,
    CachedPrice,
    CachedStatus,
    LastSyncAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum MintTransactions {
    Table,
    Id,
    ProjectId,
    WalletAddress,
    TxHash,
    TokenId,
    Status,
    BlockNumber,
    CreatedAt,
    UpdatedAt,
}
