use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::jwt::UserClaims;
use crate::auth::rbac;
use crate::entities::Paginate;
use crate::error::ApiError;
use crate::products;
use crate::state::AppState;

use super::dto::{
    CreateOrderRequest, Order, OrderFilter, OrderStatus, TransferSlip, UpdateOrderRequest,
};
use super::insert_builder::{NewOrder, NewOrderLine};
use super::repo;

/// Admins may place an order on another user's behalf; any `user_id` in the
/// request from a non-admin is ignored.
fn order_owner(caller: &UserClaims, requested: Option<Uuid>, admin: bool) -> Uuid {
    match requested {
        Some(user_id) if admin => user_id,
        _ => caller.id,
    }
}

fn validate_create(req: &CreateOrderRequest) -> Result<(), ApiError> {
    if req.address.trim().is_empty() {
        return Err(ApiError::Validation("address is required".into()));
    }
    if req.contact.trim().is_empty() {
        return Err(ApiError::Validation("contact is required".into()));
    }
    if req.products.is_empty() {
        return Err(ApiError::Validation("order needs at least one product".into()));
    }
    if req.products.iter().any(|line| line.qty < 1) {
        return Err(ApiError::Validation("qty must be at least 1".into()));
    }
    Ok(())
}

pub async fn find_orders(
    state: &AppState,
    filter: OrderFilter,
) -> Result<Paginate<Order>, ApiError> {
    let filter = filter.normalized()?;
    let (orders, total) = repo::find_orders(&state.db, &filter).await?;
    Ok(Paginate::new(orders, filter.page, filter.limit, total))
}

pub async fn find_one_order(
    state: &AppState,
    caller: &UserClaims,
    order_id: Uuid,
) -> Result<Order, ApiError> {
    let pin = if rbac::is_admin(state, caller).await? {
        None
    } else {
        Some(caller.id)
    };
    repo::find_one_order(&state.db, order_id, pin).await
}

/// Places an order. Each line re-reads the product and freezes it into the
/// line as JSON; whatever the client sent for the product body is ignored.
/// New orders always start out waiting.
pub async fn create_order(
    state: &AppState,
    caller: &UserClaims,
    req: CreateOrderRequest,
) -> Result<Order, ApiError> {
    validate_create(&req)?;
    let admin = rbac::is_admin(state, caller).await?;
    let owner = order_owner(caller, req.user_id, admin);

    let mut lines = Vec::with_capacity(req.products.len());
    for line in &req.products {
        let product = products::repo::find_one_product(&state.db, line.product_id).await?;
        let snapshot = serde_json::to_value(&product).map_err(anyhow::Error::from)?;
        lines.push(NewOrderLine {
            qty: line.qty,
            product: snapshot,
        });
    }

    let order = NewOrder {
        user_id: owner,
        address: req.address,
        contact: req.contact,
        status: OrderStatus::Waiting,
    };
    let order_id = repo::insert_order(&state.db, &order, &lines).await?;
    repo::find_one_order(&state.db, order_id, None).await
}

/// Order updates. Admins may move an order to any status; the owner may only
/// cancel it or attach a transfer slip, and only on their own order.
pub async fn update_order(
    state: &AppState,
    caller: &UserClaims,
    order_id: Uuid,
    req: UpdateOrderRequest,
) -> Result<Order, ApiError> {
    let admin = rbac::is_admin(state, caller).await?;

    let status = match &req.status {
        Some(raw) => {
            let status = OrderStatus::parse(raw)
                .ok_or_else(|| ApiError::Validation(format!("unknown status: {raw}")))?;
            if !admin && status != OrderStatus::Canceled {
                return Err(ApiError::Forbidden("no permission to access".into()));
            }
            Some(status)
        }
        None => None,
    };

    let slip = match &req.transfer_slip {
        Some(slip) => {
            let slip = TransferSlip {
                id: Uuid::new_v4(),
                filename: slip.filename.clone(),
                url: slip.url.clone(),
                created_at: OffsetDateTime::now_utc(),
            };
            Some(serde_json::to_value(&slip).map_err(anyhow::Error::from)?)
        }
        None => None,
    };

    if status.is_none() && slip.is_none() {
        return Err(ApiError::Validation("no fields to update".into()));
    }

    let pin = if admin { None } else { Some(caller.id) };
    repo::update_order(&state.db, order_id, status, slip, pin).await?;
    repo::find_one_order(&state.db, order_id, pin).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::dto::OrderLineRequest;

    fn create_req() -> CreateOrderRequest {
        CreateOrderRequest {
            user_id: None,
            address: "123 Main St".into(),
            contact: "555-1234".into(),
            products: vec![OrderLineRequest {
                product_id: Uuid::new_v4(),
                qty: 2,
            }],
        }
    }

    #[test]
    fn create_validation() {
        assert!(validate_create(&create_req()).is_ok());

        let mut req = create_req();
        req.address = " ".into();
        assert!(matches!(validate_create(&req), Err(ApiError::Validation(_))));

        let mut req = create_req();
        req.products.clear();
        assert!(matches!(validate_create(&req), Err(ApiError::Validation(_))));

        let mut req = create_req();
        req.products[0].qty = 0;
        assert!(matches!(validate_create(&req), Err(ApiError::Validation(_))));
    }

    #[test]
    fn only_admins_order_on_behalf_of_others() {
        let caller = UserClaims {
            id: Uuid::new_v4(),
            role_id: 1,
        };
        let other = Uuid::new_v4();

        assert_eq!(order_owner(&caller, Some(other), true), other);
        assert_eq!(order_owner(&caller, Some(other), false), caller.id);
        assert_eq!(order_owner(&caller, None, true), caller.id);
        assert_eq!(order_owner(&caller, None, false), caller.id);
    }
}
