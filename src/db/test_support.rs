// src/db/test_support.rs
//
// Dados mínimos para os testes de banco (`#[sqlx::test]`).

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    db::ResourceRepository,
    models::{
        resources::{Currency, Material, NewMaterial},
        tenancy::TenantId,
    },
};

pub(crate) async fn company(pool: &PgPool, name: &str) -> TenantId {
    let id: Uuid = sqlx::query_scalar("INSERT INTO companies (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap();
    TenantId::new(id)
}

/// Transação com a chave RLS da empresa, como `begin_tenant_tx`.
pub(crate) async fn tenant_tx(pool: &PgPool, tenant_id: TenantId) -> Transaction<'static, Postgres> {
    let mut tx = pool.begin().await.unwrap();
    sqlx::query("SELECT set_config('app.tenant_id', $1, true)")
        .bind(tenant_id.to_string())
        .execute(&mut *tx)
        .await
        .unwrap();
    tx
}

/// Unidade, tipo e categoria que todo material exige.
pub(crate) struct MaterialRefs {
    pub unit_id: Uuid,
    pub type_id: Uuid,
    pub category_id: Uuid,
}

pub(crate) async fn material_refs(conn: &mut PgConnection, tenant_id: TenantId) -> MaterialRefs {
    let unit_id: Uuid =
        sqlx::query_scalar("INSERT INTO units (tenant_id, name) VALUES ($1, 'bolsa') RETURNING id")
            .bind(tenant_id.as_uuid())
            .fetch_one(&mut *conn)
            .await
            .unwrap();
    let type_id: Uuid = sqlx::query_scalar(
        "INSERT INTO material_types (tenant_id, name) VALUES ($1, 'Áridos') RETURNING id",
    )
    .bind(tenant_id.as_uuid())
    .fetch_one(&mut *conn)
    .await
    .unwrap();
    let category_id: Uuid = sqlx::query_scalar(
        "INSERT INTO material_categories (tenant_id, parent_id, name) VALUES ($1, $2, 'Gruesos') RETURNING id",
    )
    .bind(tenant_id.as_uuid())
    .bind(type_id)
    .fetch_one(&mut *conn)
    .await
    .unwrap();

    MaterialRefs {
        unit_id,
        type_id,
        category_id,
    }
}

pub(crate) async fn material(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    refs: &MaterialRefs,
    name: &str,
    price: Decimal,
    currency: Currency,
) -> Material {
    let input = NewMaterial {
        name: name.into(),
        supplier_id: None,
        type_id: refs.type_id,
        category_id: refs.category_id,
        sale_unit_id: refs.unit_id,
        quantity_per_sale_unit: Decimal::ONE,
        unit_price_sale_unit: price,
        currency,
    };
    ResourceRepository::new()
        .create_material(conn, tenant_id, &input)
        .await
        .unwrap()
}
