use sea_orm_migration::prelude::*;
use staking_db_entity::db::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20260801_000002_create_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(staking_transaction::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(staking_transaction::Column::TxHash)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(staking_transaction::Column::UserAddress)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(staking_transaction::Column::Token).string().not_null())
                    .col(
                        ColumnDef::new(staking_transaction::Column::TokenAddress)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(staking_transaction::Column::Amount).string().not_null())
                    .col(
                        ColumnDef::new(staking_transaction::Column::Protocol)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(staking_transaction::Column::AdapterAddress)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(staking_transaction::Column::Status).string().not_null())
                    .col(ColumnDef::new(staking_transaction::Column::Fee).string().not_null())
                    .col(ColumnDef::new(staking_transaction::Column::Network).string().not_null())
                    .col(
                        ColumnDef::new(staking_transaction::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(staking_transaction::Column::UnstakeTxHash).string())
                    .col(ColumnDef::new(staking_transaction::Column::UnstakedAt).big_integer())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_staking_transaction_user_address")
                    .table(staking_transaction::Entity)
                    .col(staking_transaction::Column::UserAddress)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(staking_transaction::Entity).to_owned())
            .await
    }
}
