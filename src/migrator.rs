use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_catalog_tables::Migration),
            Box::new(m20240101_000003_create_cart_tables::Migration),
            Box::new(m20240101_000004_create_order_tables::Migration),
            Box::new(m20240101_000005_create_ratings_table::Migration),
            Box::new(m20240101_000006_create_rating_votes_table::Migration),
        ]
    }
}

mod m20240101_000001_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_table"
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
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Users::Username)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Users::Email)
                                .string_len(255)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::FullName).string().not_null())
                        .col(ColumnDef::new(Users::Phone).string_len(32).null())
                        .col(ColumnDef::new(Users::Address).text().null())
                        .col(
                            ColumnDef::new(Users::Role)
                                .string_len(16)
                                .not_null()
                                .default("USER"),
                        )
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
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Username,
        Email,
        PasswordHash,
        FullName,
        Phone,
        Address,
        Role,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Categories::Name)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Categories::Description).text().null())
                        .col(
                            ColumnDef::new(Categories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Books::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Books::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Books::Title).string().not_null())
                        .col(ColumnDef::new(Books::Description).text().null())
                        .col(ColumnDef::new(Books::Price).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(Books::Stock).integer().not_null().default(0))
                        .col(ColumnDef::new(Books::ImageUrl).string().null())
                        .col(ColumnDef::new(Books::CategoryId).uuid().null())
                        .col(
                            ColumnDef::new(Books::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Books::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .check(Expr::col(Books::Stock).gte(0))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_books_category")
                                .from(Books::Table, Books::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_books_category")
                        .table(Books::Table)
                        .col(Books::CategoryId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_books_title")
                        .table(Books::Table)
                        .col(Books::Title)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PaymentMethods::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentMethods::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentMethods::Name)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(PaymentMethods::Description).string().null())
                        .col(
                            ColumnDef::new(PaymentMethods::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(PaymentMethods::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PaymentMethods::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Books::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
        Name,
        Description,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Books {
        Table,
        Id,
        Title,
        Description,
        Price,
        Stock,
        ImageUrl,
        CategoryId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum PaymentMethods {
        Table,
        Id,
        Name,
        Description,
        IsActive,
        CreatedAt,
    }
}

mod m20240101_000003_create_cart_tables {
    use super::m20240101_000001_create_users_table::Users;
    use super::m20240101_000002_create_catalog_tables::Books;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_cart_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Carts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Carts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Carts::UserId).uuid().not_null().unique_key())
                        .col(
                            ColumnDef::new(Carts::Total)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Carts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Carts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_carts_user")
                                .from(Carts::Table, Carts::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CartItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartItems::CartId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::BookId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(CartItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_cart")
                                .from(CartItems::Table, CartItems::CartId)
                                .to(Carts::Table, Carts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_book")
                                .from(CartItems::Table, CartItems::BookId)
                                .to(Books::Table, Books::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_cart_items_cart_book")
                        .table(CartItems::Table)
                        .col(CartItems::CartId)
                        .col(CartItems::BookId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Carts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Carts {
        Table,
        Id,
        UserId,
        Total,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CartItems {
        Table,
        Id,
        CartId,
        BookId,
        Quantity,
        CreatedAt,
    }
}

mod m20240101_000004_create_order_tables {
    use super::m20240101_000001_create_users_table::Users;
    use super::m20240101_000002_create_catalog_tables::{Books, PaymentMethods};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                        .col(ColumnDef::new(Orders::ShippingAddress).text().not_null())
                        .col(ColumnDef::new(Orders::Total).decimal_len(12, 2).not_null())
                        .col(
                            ColumnDef::new(Orders::Status)
                                .string_len(20)
                                .not_null()
                                .default("PENDING"),
                        )
                        .col(ColumnDef::new(Orders::ConfirmedById).uuid().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_user")
                                .from(Orders::Table, Orders::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_confirmed_by")
                                .from(Orders::Table, Orders::ConfirmedById)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_user_created")
                        .table(Orders::Table)
                        .col(Orders::UserId)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::BookId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::Price)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_book")
                                .from(OrderItems::Table, OrderItems::BookId)
                                .to(Books::Table, Books::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Payments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Payments::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Payments::OrderId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Payments::PaymentMethodId).uuid().not_null())
                        .col(
                            ColumnDef::new(Payments::Status)
                                .string_len(20)
                                .not_null()
                                .default("PENDING"),
                        )
                        .col(ColumnDef::new(Payments::Total).decimal_len(12, 2).not_null())
                        .col(
                            ColumnDef::new(Payments::PaymentDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Payments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Payments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payments_order")
                                .from(Payments::Table, Payments::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payments_method")
                                .from(Payments::Table, Payments::PaymentMethodId)
                                .to(PaymentMethods::Table, PaymentMethods::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Payments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        UserId,
        ShippingAddress,
        Total,
        Status,
        ConfirmedById,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        BookId,
        Quantity,
        Price,
    }

    #[derive(DeriveIden)]
    enum Payments {
        Table,
        Id,
        OrderId,
        PaymentMethodId,
        Status,
        Total,
        PaymentDate,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_ratings_table {
    use super::m20240101_000001_create_users_table::Users;
    use super::m20240101_000002_create_catalog_tables::Books;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_ratings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Ratings::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Ratings::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Ratings::UserId).uuid().not_null())
                        .col(ColumnDef::new(Ratings::BookId).uuid().not_null())
                        .col(ColumnDef::new(Ratings::Stars).small_integer().not_null())
                        .col(ColumnDef::new(Ratings::Content).text().null())
                        .col(
                            ColumnDef::new(Ratings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Ratings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_ratings_user")
                                .from(Ratings::Table, Ratings::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_ratings_book")
                                .from(Ratings::Table, Ratings::BookId)
                                .to(Books::Table, Books::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_ratings_user_book")
                        .table(Ratings::Table)
                        .col(Ratings::UserId)
                        .col(Ratings::BookId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Ratings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Ratings {
        Table,
        Id,
        UserId,
        BookId,
        Stars,
        Content,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000006_create_rating_votes_table {
    use super::m20240101_000001_create_users_table::Users;
    use super::m20240101_000005_create_ratings_table::Ratings;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_rating_votes_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(RatingVotes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RatingVotes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RatingVotes::RatingId).uuid().not_null())
                        .col(ColumnDef::new(RatingVotes::UserId).uuid().not_null())
                        .col(ColumnDef::new(RatingVotes::VoteType).small_integer().not_null())
                        .col(
                            ColumnDef::new(RatingVotes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RatingVotes::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .check(Expr::col(RatingVotes::VoteType).is_in([1, -1]))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_rating_votes_rating")
                                .from(RatingVotes::Table, RatingVotes::RatingId)
                                .to(Ratings::Table, Ratings::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_rating_votes_user")
                                .from(RatingVotes::Table, RatingVotes::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_rating_votes_rating_user")
                        .table(RatingVotes::Table)
                        .col(RatingVotes::RatingId)
                        .col(RatingVotes::UserId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RatingVotes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum RatingVotes {
        Table,
        Id,
        RatingId,
        UserId,
        VoteType,
        CreatedAt,
        UpdatedAt,
    }
}
