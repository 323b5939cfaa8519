use axum::{extract::State, http::StatusCode, Json};
use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::money::round_money;
use crate::core::shared::schema::{subscription_plans, user_subscriptions};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::core::shared::DbConn;
use crate::security::{ActionBody, ApiPath, FilterQuery, ValidatedJson};

use super::types::{
    BillingInterval, CreatePlanRequest, CreateSubscriptionRequest, ListPlansQuery,
    ListSubscriptionsQuery, RedeemRequest, SubscriptionPlan, UpdatePlanRequest,
    UpdateSubscriptionRequest, UserSubscription,
};

pub async fn handle_list_plans(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListPlansQuery>,
) -> Result<Json<Vec<SubscriptionPlan>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = subscription_plans::table.into_boxed();
        if let Some(is_active) = query.is_active {
            db_query = db_query.filter(subscription_plans::is_active.eq(is_active));
        }
        Ok(db_query
            .order((subscription_plans::price.asc(), subscription_plans::id.asc()))
            .load::<SubscriptionPlan>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn handle_get_plan(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SubscriptionPlan>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        subscription_plans::table
            .find(id)
            .first::<SubscriptionPlan>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Subscription plan"))
    })
    .await?;
    Ok(Json(row))
}

pub async fn handle_create_plan(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreatePlanRequest>,
) -> Result<(StatusCode, Json<SubscriptionPlan>), ApiError> {
    let now = Utc::now();
    let plan = SubscriptionPlan {
        id: Uuid::new_v4(),
        name: req.name,
        description: req.description,
        price: round_money(&req.price),
        currency: req.currency,
        billing_interval: req.billing_interval.unwrap_or(BillingInterval::Monthly),
        wash_credits_per_period: req.wash_credits_per_period.unwrap_or(0),
        discount_percent: req
            .discount_percent
            .map(|d| round_money(&d))
            .unwrap_or_else(|| BigDecimal::from(0)),
        trial_days: req.trial_days.unwrap_or(0),
        is_active: req.is_active.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };

    let row = with_conn(&state.conn, move |conn| {
        Ok(diesel::insert_into(subscription_plans::table)
            .values(&plan)
            .get_result::<SubscriptionPlan>(conn)?)
    })
    .await?;
    info!("Created subscription plan {} ({})", row.name, row.id);
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn handle_update_plan(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdatePlanRequest>,
) -> Result<Json<SubscriptionPlan>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut plan: SubscriptionPlan = subscription_plans::table
                .find(id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("Subscription plan"))?;

            if let Some(name) = req.name {
                plan.name = name;
            }
            if let Some(description) = req.description {
                plan.description = Some(description);
            }
            if let Some(price) = req.price {
                plan.price = round_money(&price);
            }
            if let Some(currency) = req.currency {
                plan.currency = currency;
            }
            if let Some(interval) = req.billing_interval {
                plan.billing_interval = interval;
            }
            if let Some(credits) = req.wash_credits_per_period {
                plan.wash_credits_per_period = credits;
            }
            if let Some(discount) = req.discount_percent {
                plan.discount_percent = round_money(&discount);
            }
            if let Some(trial_days) = req.trial_days {
                plan.trial_days = trial_days;
            }
            if let Some(is_active) = req.is_active {
                plan.is_active = is_active;
            }
            plan.updated_at = Utc::now();

            Ok(diesel::update(subscription_plans::table.find(id))
                .set(&plan)
                .get_result::<SubscriptionPlan>(conn)?)
        })
    })
    .await?;
    Ok(Json(row))
}

pub async fn handle_list_subscriptions(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListSubscriptionsQuery>,
) -> Result<Json<Vec<UserSubscription>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = user_subscriptions::table.into_boxed();
        if let Some(user_id) = query.user_id {
            db_query = db_query.filter(user_subscriptions::user_id.eq(user_id));
        }
        if let Some(plan_id) = query.plan_id {
            db_query = db_query.filter(user_subscriptions::plan_id.eq(plan_id));
        }
        if let Some(status) = query.status {
            db_query = db_query.filter(user_subscriptions::status.eq(status));
        }
        Ok(db_query
            .order((
                user_subscriptions::created_at.desc(),
                user_subscriptions::id.asc(),
            ))
            .load::<UserSubscription>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn handle_get_subscription(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<UserSubscription>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        user_subscriptions::table
            .find(id)
            .first::<UserSubscription>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Subscription"))
    })
    .await?;
    Ok(Json(row))
}

pub async fn handle_create_subscription(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<UserSubscription>), ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        let plan = subscription_plans::table
            .find(req.plan_id)
            .first::<SubscriptionPlan>(conn)
            .optional()?
            .ok_or_else(|| ApiError::BadRequest("Unknown planId".to_string()))?;
        if !plan.is_active {
            return Err(ApiError::BadRequest(format!(
                "Plan {} is not open for new subscriptions",
                plan.name
            )));
        }
        let subscription = UserSubscription::start(
            req.user_id,
            &plan,
            req.start_trial.unwrap_or(true),
            Utc::now(),
        )?;
        Ok(diesel::insert_into(user_subscriptions::table)
            .values(&subscription)
            .get_result::<UserSubscription>(conn)?)
    })
    .await?;
    info!(
        "User {} subscribed to plan {} ({})",
        row.user_id, row.plan_id, row.status
    );
    Ok((StatusCode::CREATED, Json(row)))
}

fn lock_subscription(conn: &mut DbConn, id: Uuid) -> Result<UserSubscription, ApiError> {
    user_subscriptions::table
        .find(id)
        .for_update()
        .first::<UserSubscription>(conn)
        .optional()?
        .ok_or_else(|| ApiError::not_found("Subscription"))
}

fn save_subscription(
    conn: &mut DbConn,
    subscription: &UserSubscription,
) -> Result<UserSubscription, ApiError> {
    Ok(diesel::update(user_subscriptions::table.find(subscription.id))
        .set(subscription)
        .get_result(conn)?)
}

pub async fn handle_update_subscription(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateSubscriptionRequest>,
) -> Result<Json<UserSubscription>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut subscription = lock_subscription(conn, id)?;
            let now = Utc::now();
            if let Some(status) = req.status {
                subscription.transition(status, now)?;
            }
            if let Some(cancel_at_period_end) = req.cancel_at_period_end {
                subscription.cancel_at_period_end = cancel_at_period_end;
            }
            subscription.updated_at = now;
            save_subscription(conn, &subscription)
        })
    })
    .await?;
    Ok(Json(row))
}

/// Deducts wash credits. Only `trial` and `active` subscriptions redeem.
pub async fn handle_redeem_credits(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ActionBody(req): ActionBody<RedeemRequest>,
) -> Result<Json<UserSubscription>, ApiError> {
    let credits = req.credits();
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut subscription = lock_subscription(conn, id)?;
            subscription.redeem(credits, Utc::now())?;
            save_subscription(conn, &subscription)
        })
    })
    .await?;
    info!(
        "Redeemed {} credit(s) on subscription {}, {} left",
        credits, row.id, row.wash_credits_remaining
    );
    Ok(Json(row))
}

pub async fn handle_renew_subscription(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<UserSubscription>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut subscription = lock_subscription(conn, id)?;
            let plan = subscription_plans::table
                .find(subscription.plan_id)
                .first::<SubscriptionPlan>(conn)?;
            subscription.renew(&plan, Utc::now())?;
            save_subscription(conn, &subscription)
        })
    })
    .await?;
    info!(
        "Subscription {} renewed through {} ({})",
        row.id, row.current_period_end, row.status
    );
    Ok(Json(row))
}
