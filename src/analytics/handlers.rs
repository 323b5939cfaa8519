use axum::{extract::State, Json};
use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate, Utc};
use diesel::dsl::{count_star, sum};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::{
    accounts_payable, franchisees, maintenance_work_orders, pet_wash_stations, spare_parts,
    station_alerts, station_assets, station_bills, station_performance_metrics,
    station_spare_parts,
};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::core::shared::DbConn;
use crate::finance::PaymentStatus;
use crate::franchise::types::Franchisee;
use crate::maintenance::types::WorkOrderStatus;
use crate::security::ApiPath;
use crate::stations::alerts::AlertStatus;

use super::types::{
    money_by_currency, outstanding, tally, AlertStats, FinancialStats, FranchiseeAnalytics,
    FranchiseeStats, GlobalAnalytics, InventoryStats, MaintenanceStats, StationStats,
};

const REVENUE_WINDOW_DAYS: i64 = 30;

const OPEN_BALANCE: [PaymentStatus; 3] = [
    PaymentStatus::Unpaid,
    PaymentStatus::Overdue,
    PaymentStatus::PartiallyPaid,
];

const OPEN_WORK: [WorkOrderStatus; 3] = [
    WorkOrderStatus::Pending,
    WorkOrderStatus::Scheduled,
    WorkOrderStatus::InProgress,
];

/// Restricts every figure to one franchisee's stations.
struct Scope {
    franchisee_id: Uuid,
    station_ids: Vec<Uuid>,
}

fn station_stats(conn: &mut DbConn, scope: Option<&Scope>) -> Result<StationStats, ApiError> {
    let mut by_operational = pet_wash_stations::table
        .group_by(pet_wash_stations::operational_status)
        .select((pet_wash_stations::operational_status, count_star()))
        .into_boxed();
    let mut by_health = pet_wash_stations::table
        .group_by(pet_wash_stations::health_status)
        .select((pet_wash_stations::health_status, count_star()))
        .into_boxed();
    if let Some(scope) = scope {
        by_operational =
            by_operational.filter(pet_wash_stations::franchisee_id.eq(scope.franchisee_id));
        by_health = by_health.filter(pet_wash_stations::franchisee_id.eq(scope.franchisee_id));
    }
    let operational = tally(by_operational.load::<(String, i64)>(conn)?);
    let health = tally(by_health.load::<(String, i64)>(conn)?);
    Ok(StationStats::new(operational, health))
}

fn franchisee_stats(conn: &mut DbConn) -> Result<FranchiseeStats, ApiError> {
    let rows = franchisees::table
        .group_by(franchisees::status)
        .select((franchisees::status, count_star()))
        .load::<(String, i64)>(conn)?;
    let breakdown = tally(rows);
    Ok(FranchiseeStats {
        total: breakdown.total,
        by_status: breakdown.by_key,
    })
}

fn financial_stats(
    conn: &mut DbConn,
    scope: Option<&Scope>,
    today: NaiveDate,
) -> Result<FinancialStats, ApiError> {
    let mut bills = station_bills::table
        .filter(station_bills::status.eq_any(OPEN_BALANCE.to_vec()))
        .group_by(station_bills::currency)
        .select((
            station_bills::currency,
            sum(station_bills::total_amount),
            sum(station_bills::paid_amount),
            count_star(),
        ))
        .into_boxed();
    let mut overdue = station_bills::table
        .filter(station_bills::status.eq_any(OPEN_BALANCE.to_vec()))
        .filter(
            station_bills::status
                .eq(PaymentStatus::Overdue)
                .or(station_bills::due_date.lt(today)),
        )
        .into_boxed();
    let mut payables = accounts_payable::table
        .filter(accounts_payable::status.eq_any(OPEN_BALANCE.to_vec()))
        .group_by(accounts_payable::currency)
        .select((
            accounts_payable::currency,
            sum(accounts_payable::total_amount),
            sum(accounts_payable::paid_amount),
            count_star(),
        ))
        .into_boxed();
    let mut revenue = station_performance_metrics::table
        .filter(
            station_performance_metrics::metric_date
                .ge(today - Duration::days(REVENUE_WINDOW_DAYS)),
        )
        .group_by(station_performance_metrics::currency)
        .select((
            station_performance_metrics::currency,
            sum(station_performance_metrics::revenue),
            sum(station_performance_metrics::total_washes),
        ))
        .into_boxed();

    if let Some(scope) = scope {
        bills = bills.filter(station_bills::station_id.eq_any(scope.station_ids.clone()));
        overdue = overdue.filter(station_bills::station_id.eq_any(scope.station_ids.clone()));
        payables = payables.filter(
            accounts_payable::franchisee_id
                .eq(scope.franchisee_id)
                .or(accounts_payable::station_id.eq_any(scope.station_ids.clone())),
        );
        revenue = revenue
            .filter(station_performance_metrics::station_id.eq_any(scope.station_ids.clone()));
    }

    let revenue_rows =
        revenue.load::<(String, Option<BigDecimal>, Option<i64>)>(conn)?;
    let washes_last_30_days = revenue_rows.iter().filter_map(|(_, _, washes)| *washes).sum();
    let revenue_last_30_days = money_by_currency(
        revenue_rows
            .into_iter()
            .map(|(currency, amount, _)| (currency, amount))
            .collect(),
    );

    Ok(FinancialStats {
        outstanding_bills: outstanding(bills.load(conn)?),
        overdue_bills: overdue.count().get_result(conn)?,
        outstanding_payables: outstanding(payables.load(conn)?),
        revenue_last_30_days,
        washes_last_30_days,
    })
}

fn maintenance_stats(
    conn: &mut DbConn,
    scope: Option<&Scope>,
) -> Result<MaintenanceStats, ApiError> {
    let mut orders = maintenance_work_orders::table
        .group_by(maintenance_work_orders::status)
        .select((maintenance_work_orders::status, count_star()))
        .into_boxed();
    let mut cost = maintenance_work_orders::table
        .filter(maintenance_work_orders::status.eq(WorkOrderStatus::Completed))
        .group_by(maintenance_work_orders::currency)
        .select((
            maintenance_work_orders::currency,
            sum(maintenance_work_orders::total_cost),
        ))
        .into_boxed();
    let mut assets = station_assets::table
        .group_by(station_assets::status)
        .select((station_assets::status, count_star()))
        .into_boxed();
    if let Some(scope) = scope {
        orders = orders
            .filter(maintenance_work_orders::station_id.eq_any(scope.station_ids.clone()));
        cost = cost.filter(maintenance_work_orders::station_id.eq_any(scope.station_ids.clone()));
        assets = assets.filter(station_assets::station_id.eq_any(scope.station_ids.clone()));
    }

    let orders = tally(orders.load::<(String, i64)>(conn)?);
    let open_work_orders = OPEN_WORK
        .iter()
        .filter_map(|status| orders.by_key.get(status.as_str()))
        .sum();
    Ok(MaintenanceStats {
        work_orders_by_status: orders.by_key,
        open_work_orders,
        completed_cost: money_by_currency(cost.load(conn)?),
        assets_by_status: tally(assets.load::<(String, i64)>(conn)?).by_key,
    })
}

fn alert_stats(conn: &mut DbConn, scope: Option<&Scope>) -> Result<AlertStats, ApiError> {
    let mut by_status = station_alerts::table
        .group_by(station_alerts::status)
        .select((station_alerts::status, count_star()))
        .into_boxed();
    let mut by_severity = station_alerts::table
        .filter(station_alerts::status.eq_any(AlertStatus::ACTIVE.to_vec()))
        .group_by(station_alerts::severity)
        .select((station_alerts::severity, count_star()))
        .into_boxed();
    if let Some(scope) = scope {
        by_status = by_status.filter(station_alerts::station_id.eq_any(scope.station_ids.clone()));
        by_severity =
            by_severity.filter(station_alerts::station_id.eq_any(scope.station_ids.clone()));
    }
    let active = tally(by_severity.load::<(String, i64)>(conn)?);
    Ok(AlertStats {
        active: active.total,
        active_by_severity: active.by_key,
        by_status: tally(by_status.load::<(String, i64)>(conn)?).by_key,
    })
}

fn station_parts_low(conn: &mut DbConn, scope: Option<&Scope>) -> Result<i64, ApiError> {
    let mut query = station_spare_parts::table
        .filter(station_spare_parts::quantity.le(station_spare_parts::minimum_quantity))
        .into_boxed();
    if let Some(scope) = scope {
        query = query.filter(station_spare_parts::station_id.eq_any(scope.station_ids.clone()));
    }
    Ok(query.count().get_result(conn)?)
}

fn inventory_stats(conn: &mut DbConn) -> Result<InventoryStats, ApiError> {
    Ok(InventoryStats {
        total_parts: spare_parts::table.count().get_result(conn)?,
        low_stock_parts: spare_parts::table
            .filter(spare_parts::quantity_in_stock.le(spare_parts::reorder_point))
            .count()
            .get_result(conn)?,
        below_minimum_parts: spare_parts::table
            .filter(spare_parts::quantity_in_stock.lt(spare_parts::minimum_stock_level))
            .count()
            .get_result(conn)?,
        low_stock_station_parts: station_parts_low(conn, None)?,
    })
}

fn franchisee_inventory_stats(conn: &mut DbConn, scope: &Scope) -> Result<InventoryStats, ApiError> {
    let held = || {
        station_spare_parts::table
            .filter(station_spare_parts::station_id.eq_any(scope.station_ids.clone()))
    };
    let low = station_parts_low(conn, Some(scope))?;
    Ok(InventoryStats {
        total_parts: held().count().get_result(conn)?,
        low_stock_parts: low,
        below_minimum_parts: held()
            .filter(station_spare_parts::quantity.lt(station_spare_parts::minimum_quantity))
            .count()
            .get_result(conn)?,
        low_stock_station_parts: low,
    })
}

pub async fn handle_global_analytics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GlobalAnalytics>, ApiError> {
    let analytics = with_conn(&state.conn, |conn| {
        let now = Utc::now();
        Ok(GlobalAnalytics {
            station_stats: station_stats(conn, None)?,
            franchisee_stats: franchisee_stats(conn)?,
            financial_stats: financial_stats(conn, None, now.date_naive())?,
            maintenance_stats: maintenance_stats(conn, None)?,
            alert_stats: alert_stats(conn, None)?,
            inventory_stats: inventory_stats(conn)?,
            generated_at: now,
        })
    })
    .await?;
    Ok(Json(analytics))
}

pub async fn handle_franchisee_analytics(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<FranchiseeAnalytics>, ApiError> {
    let analytics = with_conn(&state.conn, move |conn| {
        let franchisee = franchisees::table
            .find(id)
            .first::<Franchisee>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Franchisee"))?;
        let station_ids = pet_wash_stations::table
            .filter(pet_wash_stations::franchisee_id.eq(id))
            .select(pet_wash_stations::id)
            .load::<Uuid>(conn)?;
        let scope = Scope {
            franchisee_id: id,
            station_ids,
        };

        let now = Utc::now();
        Ok(FranchiseeAnalytics {
            station_stats: station_stats(conn, Some(&scope))?,
            financial_stats: financial_stats(conn, Some(&scope), now.date_naive())?,
            maintenance_stats: maintenance_stats(conn, Some(&scope))?,
            alert_stats: alert_stats(conn, Some(&scope))?,
            inventory_stats: franchisee_inventory_stats(conn, &scope)?,
            franchisee,
            generated_at: now,
        })
    })
    .await?;
    Ok(Json(analytics))
}
