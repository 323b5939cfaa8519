pub mod enterprise;
pub use self::enterprise::*;

pub mod finance;
pub use self::finance::*;

diesel::allow_tables_to_appear_in_same_query!(
    countries,
    franchise_territories,
    franchisees,
    pet_wash_stations,
    station_bills,
    station_assets,
    spare_parts,
    station_spare_parts,
    inventory_movements,
    maintenance_work_orders,
    subscription_plans,
    user_subscriptions,
    station_telemetry,
    station_alerts,
    station_performance_metrics,
    accounts_payable,
    ledger_entries,
    electronic_invoices,
);
