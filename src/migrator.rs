use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_users_table::Migration),
            Box::new(m20240601_000002_create_stores_table::Migration),
            Box::new(m20240601_000003_create_items_tables::Migration),
            Box::new(m20240601_000004_create_reservations_table::Migration),
            Box::new(m20240601_000005_create_reviews_table::Migration),
            Box::new(m20240601_000006_create_chat_tables::Migration),
            Box::new(m20240601_000007_create_outfits_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240601_000001_create_users_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Uid)
                                .string_len(128)
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Users::Email).string().not_null())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::Role).string_len(20).not_null())
                        .col(ColumnDef::new(Users::ProfileImageUrl).string().null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_email")
                        .table(Users::Table)
                        .col(Users::Email)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Uid,
        Email,
        Name,
        Role,
        ProfileImageUrl,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000002_create_stores_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_stores_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Stores::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Stores::StoreId)
                                .string_len(64)
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Stores::OwnerId)
                                .string_len(128)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Stores::Name).string().not_null())
                        .col(ColumnDef::new(Stores::Description).text().null())
                        .col(ColumnDef::new(Stores::Address).string().null())
                        .col(ColumnDef::new(Stores::Latitude).double().null())
                        .col(ColumnDef::new(Stores::Longitude).double().null())
                        .col(ColumnDef::new(Stores::ProfileImageUrl).string().null())
                        .col(
                            ColumnDef::new(Stores::AverageRating)
                                .double()
                                .not_null()
                                .default(0.0),
                        )
                        .col(
                            ColumnDef::new(Stores::ReviewCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Stores::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Stores::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Stores::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Stores {
        Table,
        StoreId,
        OwnerId,
        Name,
        Description,
        Address,
        Latitude,
        Longitude,
        ProfileImageUrl,
        AverageRating,
        ReviewCount,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000003_create_items_tables {

    use super::m20240601_000002_create_stores_table::Stores;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_items_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Items::ItemId)
                                .string_len(64)
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Items::StoreId).string_len(64).not_null())
                        .col(ColumnDef::new(Items::Name).string().not_null())
                        .col(ColumnDef::new(Items::Description).text().null())
                        .col(ColumnDef::new(Items::Category).string().null())
                        .col(ColumnDef::new(Items::Style).string().null())
                        .col(ColumnDef::new(Items::Department).string().null())
                        .col(ColumnDef::new(Items::Size).string().null())
                        .col(ColumnDef::new(Items::Price).decimal_len(12, 2).not_null())
                        .col(
                            ColumnDef::new(Items::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Items::Status).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Items::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_items_store_id")
                                .from(Items::Table, Items::StoreId)
                                .to(Stores::Table, Stores::StoreId)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, col) in [
                ("idx_items_store_id", Items::StoreId),
                ("idx_items_status", Items::Status),
                ("idx_items_category", Items::Category),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(Items::Table)
                            .col(col)
                            .to_owned(),
                    )
                    .await?;
            }

            manager
                .create_table(
                    Table::create()
                        .table(ItemImages::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ItemImages::ImageId)
                                .string_len(64)
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ItemImages::ItemId).string_len(64).not_null())
                        .col(ColumnDef::new(ItemImages::ImageUrl).string().not_null())
                        .col(ColumnDef::new(ItemImages::PublicId).string().not_null())
                        .col(
                            ColumnDef::new(ItemImages::IsPrimary)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ItemImages::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ItemImages::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_item_images_item_id")
                                .from(ItemImages::Table, ItemImages::ItemId)
                                .to(Items::Table, Items::ItemId)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_item_images_item_id")
                        .table(ItemImages::Table)
                        .col(ItemImages::ItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ItemImages::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Items {
        Table,
        ItemId,
        StoreId,
        Name,
        Description,
        Category,
        Style,
        Department,
        Size,
        Price,
        Quantity,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ItemImages {
        Table,
        ImageId,
        ItemId,
        ImageUrl,
        PublicId,
        IsPrimary,
        Position,
        CreatedAt,
    }
}

mod m20240601_000004_create_reservations_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_reservations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Reservations outlive deleted items, so no foreign keys here.
            manager
                .create_table(
                    Table::create()
                        .table(Reservations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Reservations::ReservationId)
                                .string_len(64)
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reservations::ItemId)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reservations::UserId)
                                .string_len(128)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reservations::StoreId)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reservations::Status)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reservations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reservations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, col) in [
                ("idx_reservations_item_id", Reservations::ItemId),
                ("idx_reservations_user_id", Reservations::UserId),
                ("idx_reservations_store_id", Reservations::StoreId),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(Reservations::Table)
                            .col(col)
                            .to_owned(),
                    )
                    .await?;
            }

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Reservations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Reservations {
        Table,
        ReservationId,
        ItemId,
        UserId,
        StoreId,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000005_create_reviews_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000005_create_reviews_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Reviews::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Reviews::ReviewId)
                                .string_len(64)
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reviews::ReservationId)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Reviews::ItemId).string_len(64).not_null())
                        .col(ColumnDef::new(Reviews::StoreId).string_len(64).not_null())
                        .col(ColumnDef::new(Reviews::UserId).string_len(128).not_null())
                        .col(ColumnDef::new(Reviews::Rating).integer().not_null())
                        .col(
                            ColumnDef::new(Reviews::Review)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Reviews::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reviews_store_id")
                        .table(Reviews::Table)
                        .col(Reviews::StoreId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Reviews::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Reviews {
        Table,
        ReviewId,
        ReservationId,
        ItemId,
        StoreId,
        UserId,
        Rating,
        Review,
        CreatedAt,
    }
}

mod m20240601_000006_create_chat_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000006_create_chat_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Chats::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Chats::ChatId)
                                .string_len(260)
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Chats::ParticipantA)
                                .string_len(128)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Chats::ParticipantB)
                                .string_len(128)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Chats::LastMessage).text().null())
                        .col(
                            ColumnDef::new(Chats::LastTimestamp)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Chats::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, col) in [
                ("idx_chats_participant_a", Chats::ParticipantA),
                ("idx_chats_participant_b", Chats::ParticipantB),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(Chats::Table)
                            .col(col)
                            .to_owned(),
                    )
                    .await?;
            }

            manager
                .create_table(
                    Table::create()
                        .table(Messages::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Messages::MessageId)
                                .string_len(64)
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Messages::ChatId).string_len(260).not_null())
                        .col(
                            ColumnDef::new(Messages::SenderId)
                                .string_len(128)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Messages::ReceiverId)
                                .string_len(128)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Messages::Text).text().not_null())
                        .col(
                            ColumnDef::new(Messages::Read)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Messages::Timestamp)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_messages_chat_id")
                                .from(Messages::Table, Messages::ChatId)
                                .to(Chats::Table, Chats::ChatId)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_messages_chat_id_timestamp")
                        .table(Messages::Table)
                        .col(Messages::ChatId)
                        .col(Messages::Timestamp)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Messages::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Chats::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Chats {
        Table,
        ChatId,
        ParticipantA,
        ParticipantB,
        LastMessage,
        LastTimestamp,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Messages {
        Table,
        MessageId,
        ChatId,
        SenderId,
        ReceiverId,
        Text,
        Read,
        Timestamp,
    }
}

mod m20240601_000007_create_outfits_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000007_create_outfits_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Outfits::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Outfits::OutfitId)
                                .string_len(64)
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Outfits::UserId).string_len(128).not_null())
                        .col(ColumnDef::new(Outfits::Name).string().null())
                        .col(ColumnDef::new(Outfits::Slots).json().not_null())
                        .col(
                            ColumnDef::new(Outfits::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Outfits::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_outfits_user_id")
                        .table(Outfits::Table)
                        .col(Outfits::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Outfits::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Outfits {
        Table,
        OutfitId,
        UserId,
        Name,
        Slots,
        CreatedAt,
        UpdatedAt,
    }
}
