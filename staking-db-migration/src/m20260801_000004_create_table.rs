use sea_orm_migration::prelude::*;
use staking_db_entity::db::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20260801_000004_create_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(transaction_job::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(transaction_job::Column::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(transaction_job::Column::JobKind).string().not_null())
                    .col(ColumnDef::new(transaction_job::Column::TxHash).string().not_null())
                    .col(
                        ColumnDef::new(transaction_job::Column::UserAddress)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(transaction_job::Column::Token).string().not_null())
                    .col(ColumnDef::new(transaction_job::Column::TokenAddress).string())
                    .col(ColumnDef::new(transaction_job::Column::AdapterAddress).string())
                    .col(ColumnDef::new(transaction_job::Column::Amount).string().not_null())
                    .col(ColumnDef::new(transaction_job::Column::Fee).string())
                    .col(
                        ColumnDef::new(transaction_job::Column::BlockNumber)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(transaction_job::Column::Status).string().not_null())
                    .col(ColumnDef::new(transaction_job::Column::Attempts).integer().not_null())
                    .col(
                        ColumnDef::new(transaction_job::Column::AvailableAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(transaction_job::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(transaction_job::Column::LastError).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uniq_transaction_job_kind_tx_hash")
                    .table(transaction_job::Entity)
                    .col(transaction_job::Column::JobKind)
                    .col(transaction_job::Column::TxHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_transaction_job_status_available_at")
                    .table(transaction_job::Entity)
                    .col(transaction_job::Column::Status)
                    .col(transaction_job::Column::AvailableAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(transaction_job::Entity).to_owned())
            .await
    }
}
