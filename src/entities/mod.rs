pub mod user;
pub mod category;
pub mod product;
pub mod product_category;
pub mod supplier;
pub mod supplier_product;
pub mod customer;
pub mod order;
pub mod order_product;
pub mod review;
pub mod shipping;
pub mod payment;
pub mod staff;
pub mod promotion;

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use chrono::Utc;
use rand::rngs::OsRng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbErr, EntityTrait, IntoActiveModel, QueryFilter, Schema, Set, TryIntoModel,
};
use serde::{Serialize, Serializer};
use tracing::info;

/// Rows are never physically removed through the API; "deleting" flips
/// `is_deleted` and persists the row.
pub trait SoftDelete: ActiveModelTrait {
    fn mark_deleted(&mut self);
}

pub async fn soft_delete<A, C>(
    model: <A::Entity as EntityTrait>::Model,
    db: &C,
) -> Result<<A::Entity as EntityTrait>::Model, DbErr>
where
    A: SoftDelete + ActiveModelBehavior + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    let mut active = model.into_active_model();
    active.mark_deleted();
    active.update(db).await
}

/// Persists a partially edited row. A PATCH that touched nothing skips the
/// UPDATE and hands back the row as loaded.
pub async fn save_changes<A, C>(
    active: A,
    db: &C,
) -> Result<<A::Entity as EntityTrait>::Model, DbErr>
where
    A: ActiveModelBehavior + TryIntoModel<<A::Entity as EntityTrait>::Model> + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    if active.is_changed() {
        active.update(db).await
    } else {
        active.try_into_model()
    }
}

/// Rounds a monetary value to cents, the scale its column stores.
pub fn to_cents(value: Decimal) -> Decimal {
    let mut value = value;
    value.rescale(2);
    value
}

/// Serializes money with exactly two decimals whatever scale the backend
/// hands back.
pub fn serialize_money<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    Serialize::serialize(&to_cents(*value), serializer)
}

pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = vec![
        schema.create_table_from_entity(user::Entity),
        schema.create_table_from_entity(category::Entity),
        schema.create_table_from_entity(product::Entity),
        schema.create_table_from_entity(product_category::Entity),
        schema.create_table_from_entity(supplier::Entity),
        schema.create_table_from_entity(supplier_product::Entity),
        schema.create_table_from_entity(customer::Entity),
        schema.create_table_from_entity(order::Entity),
        schema.create_table_from_entity(order_product::Entity),
        schema.create_table_from_entity(review::Entity),
        schema.create_table_from_entity(shipping::Entity),
        schema.create_table_from_entity(payment::Entity),
        schema.create_table_from_entity(staff::Entity),
        schema.create_table_from_entity(promotion::Entity),
    ];

    for statement in statements.iter_mut() {
        statement.if_not_exists();
        db.execute(backend.build(&*statement)).await?;
    }

    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();

    Ok(password_hash)
}

/// Creates the bootstrap administrator unless a user with that name exists.
pub async fn seed_admin(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    email: &str,
) -> Result<(), DbErr> {
    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let password_hash =
        hash_password(password).map_err(|err| DbErr::Custom(format!("Failed to hash password: {err}")))?;

    let admin = user::ActiveModel {
        username: Set(username.to_owned()),
        email: Set(email.to_owned()),
        password: Set(password_hash),
        role: Set(user::Role::Admin),
        date_joined: Set(Utc::now()),
        is_deleted: Set(false),
        ..Default::default()
    };
    admin.insert(db).await?;
    info!(username = %username, "Seeded administrator account");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("s3cret").expect("Failed to hash password");
        let account = user::Model {
            id: 1,
            username: "someone".to_string(),
            email: String::new(),
            password: hash,
            role: user::Role::default(),
            date_joined: Utc::now(),
            is_deleted: false,
        };

        assert_eq!(account.role, user::Role::Customer);
        assert!(account.check_hash("s3cret").is_ok());
        assert!(account.check_hash("wrong").is_err());
    }

    #[test]
    fn money_serializes_with_cents() {
        #[derive(Serialize)]
        struct Priced {
            #[serde(serialize_with = "serialize_money")]
            price: Decimal,
        }

        let whole = serde_json::to_value(Priced { price: Decimal::from(100) }).expect("serializable");
        assert_eq!(whole["price"], "100.00");

        let half = serde_json::to_value(Priced { price: Decimal::new(125, 1) }).expect("serializable");
        assert_eq!(half["price"], "12.50");
    }

    #[test]
    fn link_tables_join_both_sides() {
        let categories = product_category::Entity::find()
            .find_also_related(category::Entity)
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(categories.contains(r#"JOIN "category""#));

        let suppliers = supplier_product::Entity::find()
            .find_also_related(supplier::Entity)
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(suppliers.contains(r#"JOIN "supplier""#));

        let orders = order_product::Entity::find()
            .find_also_related(order::Entity)
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(orders.contains(r#"JOIN "orders""#));
    }
}
