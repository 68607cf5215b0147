use sea_orm::{EntityName, Schema};
use sea_orm_migration::prelude::*;

use crate::entity::{OrderItems, Orders, Products, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        // parents before children so the restrict foreign keys resolve
        manager
            .create_table(schema.create_table_from_entity(Users).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(Products).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(Orders).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(OrderItems).if_not_exists().to_owned())
            .await?;

        let indexes = schema
            .create_index_from_entity(Orders)
            .into_iter()
            .chain(schema.create_index_from_entity(OrderItems));
        for mut index in indexes {
            manager.create_index(index.if_not_exists().to_owned()).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            OrderItems.table_name(),
            Orders.table_name(),
            Products.table_name(),
            Users.table_name(),
        ] {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}
