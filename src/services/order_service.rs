use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, OrderSummary, OrderWithItems},
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const ORDER_STATUS_PENDING: &str = "Pending";

/// A line validated against the catalog, carrying the price at staging time.
struct StagedLine {
    product_id: i32,
    quantity: i32,
    unit_price: Decimal,
}

/// Creates the order and all of its lines in one transaction.
///
/// Every product is looked up before anything is written; an unknown id
/// rejects the whole checkout. Unit prices are copied from the catalog at
/// this moment and never re-read.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderSummary>> {
    payload.validate()?;

    let txn = state.orm.begin().await?;

    let mut lines: Vec<StagedLine> = Vec::with_capacity(payload.items.len());
    for item in &payload.items {
        let product = Products::find_by_id(item.product_id).one(&txn).await?;
        let product = match product {
            Some(p) => p,
            None => {
                return Err(AppError::BadRequest(format!(
                    "Product with id {} does not exist",
                    item.product_id
                )));
            }
        };
        lines.push(StagedLine {
            product_id: product.id,
            quantity: item.quantity,
            unit_price: product.price,
        });
    }

    let total_amount: Decimal = lines
        .iter()
        .map(|line| line.unit_price * Decimal::from(line.quantity))
        .sum();

    let order = OrderActive {
        id: NotSet,
        user_id: Set(user.user_id),
        order_date: Set(Utc::now().into()),
        status: Set(ORDER_STATUS_PENDING.into()),
        // stands in for a payment reference
        transaction_id: Set(Uuid::new_v4().to_string()),
    }
    .insert(&txn)
    .await
    .map_err(|err| constraint_to_bad_request(err, "Unknown user for this order"))?;

    let rows = lines.iter().map(|line| OrderItemActive {
        id: NotSet,
        order_id: Set(order.id),
        product_id: Set(line.product_id),
        quantity: Set(line.quantity),
        unit_price: Set(line.unit_price),
    });
    OrderItems::insert_many(rows)
        .exec(&txn)
        .await
        .map_err(|err| constraint_to_bad_request(err, "Order references a missing product"))?;

    txn.commit().await?;

    tracing::info!(
        order_id = order.id,
        user_id = user.user_id,
        lines = lines.len(),
        total = %total_amount,
        "order created"
    );

    let order = Order::from(order);
    Ok(ApiResponse::success(
        "Order created",
        OrderSummary {
            order_id: order.id,
            total: total_amount,
            status: order.status,
            order_date: order.order_date,
            transaction_id: order.transaction_id,
        },
        Some(Meta::empty()),
    ))
}

/// The caller's own orders, newest first.
pub async fn list_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let orders: Vec<Order> = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::OrderDate)
        .order_by_desc(OrderCol::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::single_page(orders.len());
    Ok(ApiResponse::success("Ok", OrderList { items: orders }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

fn constraint_to_bad_request(err: DbErr, message: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => AppError::BadRequest(message.to_string()),
        _ => AppError::from(err),
    }
}
