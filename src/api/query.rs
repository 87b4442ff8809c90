use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, Order, PrimaryKeyTrait, QueryFilter, QueryOrder,
    Select,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;
use validator::ValidationError;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingTerm<'a> {
    pub field: &'a str,
    pub descending: bool,
}

/// Parses `?ordering=name,-price` into terms, `-` meaning descending.
pub fn parse_ordering(raw: &str) -> Vec<OrderingTerm<'_>> {
    raw.split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty() && *term != "-")
        .map(|term| match term.strip_prefix('-') {
            Some(field) => OrderingTerm {
                field,
                descending: true,
            },
            None => OrderingTerm {
                field: term,
                descending: false,
            },
        })
        .collect()
}

/// Fields not listed in `allowed` are ignored; when nothing usable is left
/// the list falls back to `default` ascending.
pub fn apply_ordering<E>(
    mut select: Select<E>,
    ordering: Option<&str>,
    allowed: &[(&str, E::Column)],
    default: E::Column,
) -> Select<E>
where
    E: EntityTrait,
{
    let mut applied = false;
    for term in ordering.map(parse_ordering).unwrap_or_default() {
        if let Some((_, column)) = allowed.iter().find(|(name, _)| *name == term.field) {
            let order = if term.descending { Order::Desc } else { Order::Asc };
            select = select.order_by(*column, order);
            applied = true;
        }
    }

    if !applied {
        select = select.order_by_asc(default);
    }
    select
}

pub async fn find_or_404<E, C>(db: &C, id: i32) -> ApiResult<E::Model>
where
    E: EntityTrait,
    C: ConnectionTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i32>,
{
    E::find_by_id(id).one(db).await?.ok_or(ApiError::NotFound)
}

/// Looks up a row referenced from a request body; a dangling id is a
/// client error.
pub async fn referenced<E, C>(db: &C, id: i32, field: &str) -> ApiResult<E::Model>
where
    E: EntityTrait,
    C: ConnectionTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i32>,
{
    E::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| invalid_pk(field, id))
}

/// Checks a many-to-many id list and returns it deduplicated.
pub async fn referenced_all<E, C>(
    db: &C,
    id_column: E::Column,
    ids: &[i32],
    field: &str,
) -> ApiResult<Vec<i32>>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let wanted: BTreeSet<i32> = ids.iter().copied().collect();
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let found = E::find()
        .filter(id_column.is_in(wanted.iter().copied()))
        .all(db)
        .await?
        .len();

    if found != wanted.len() {
        return Err(ApiError::BadRequest(format!(
            "{field}: one or more referenced objects do not exist"
        )));
    }
    Ok(wanted.into_iter().collect())
}

pub fn invalid_pk(field: &str, id: i32) -> ApiError {
    ApiError::BadRequest(format!(
        "{field}: Invalid pk \"{id}\" - object does not exist."
    ))
}

/// Money columns are `DECIMAL(10, 2)`: at most two decimal places and eight
/// integer digits.
pub fn valid_money(value: &Decimal) -> Result<(), ValidationError> {
    let normalized = value.normalize();
    if normalized.scale() > MONEY_SCALE {
        return Err(ValidationError::new("decimal_places")
            .with_message("Ensure that there are no more than 2 decimal places.".into()));
    }
    if normalized.abs().trunc() >= Decimal::from(MONEY_INTEGER_LIMIT) {
        return Err(ValidationError::new("max_digits")
            .with_message("Ensure that there are no more than 10 digits in total.".into()));
    }
    Ok(())
}

const MONEY_SCALE: u32 = 2;
const MONEY_INTEGER_LIMIT: i64 = 100_000_000;

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in PATCH bodies.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_terms_keep_direction() {
        assert_eq!(
            parse_ordering("name,-price"),
            vec![
                OrderingTerm {
                    field: "name",
                    descending: false
                },
                OrderingTerm {
                    field: "price",
                    descending: true
                },
            ]
        );
    }

    #[test]
    fn ordering_skips_blank_terms() {
        assert_eq!(
            parse_ordering(" , -, -rating ,"),
            vec![OrderingTerm {
                field: "rating",
                descending: true
            }]
        );
        assert!(parse_ordering("").is_empty());
    }

    #[test]
    fn money_accepts_cents_and_rejects_finer_or_larger() {
        for ok in ["0", "1.5", "1.50", "99999999.99", "-3.10"] {
            let value = Decimal::from_str_exact(ok).expect("valid decimal");
            assert!(valid_money(&value).is_ok(), "{ok}");
        }

        let finer = Decimal::from_str_exact("1.005").expect("valid decimal");
        assert_eq!(valid_money(&finer).unwrap_err().code, "decimal_places");

        let larger = Decimal::from_str_exact("12345678901.00").expect("valid decimal");
        assert_eq!(valid_money(&larger).unwrap_err().code, "max_digits");
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        shipped_date: Option<Option<String>>,
    }

    #[test]
    fn double_option_separates_null_from_missing() {
        let missing: Patch = serde_json::from_str("{}").expect("valid json");
        assert_eq!(missing.shipped_date, None);

        let null: Patch = serde_json::from_str(r#"{"shipped_date": null}"#).expect("valid json");
        assert_eq!(null.shipped_date, Some(None));

        let set: Patch = serde_json::from_str(r#"{"shipped_date": "x"}"#).expect("valid json");
        assert_eq!(set.shipped_date, Some(Some("x".to_string())));
    }
}
