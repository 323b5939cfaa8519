diesel::table! {
    countries (id) {
        id -> Uuid,
        code -> Varchar,
        name -> Varchar,
        currency_code -> Varchar,
        timezone -> Varchar,
        vat_rate -> Numeric,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    franchise_territories (id) {
        id -> Uuid,
        country_id -> Uuid,
        territory_code -> Varchar,
        name -> Varchar,
        region -> Nullable<Varchar>,
        status -> Varchar,
        population -> Nullable<Int4>,
        max_stations -> Nullable<Int4>,
        is_exclusive -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    franchisees (id) {
        id -> Uuid,
        country_id -> Uuid,
        territory_id -> Nullable<Uuid>,
        business_name -> Varchar,
        legal_name -> Nullable<Varchar>,
        tax_id -> Nullable<Varchar>,
        contact_name -> Varchar,
        contact_email -> Varchar,
        contact_phone -> Nullable<Varchar>,
        agreement_type -> Varchar,
        agreement_start_date -> Nullable<Date>,
        agreement_end_date -> Nullable<Date>,
        royalty_percent -> Numeric,
        marketing_fee_percent -> Numeric,
        franchise_fee -> Numeric,
        currency -> Varchar,
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    pet_wash_stations (id) {
        id -> Uuid,
        franchisee_id -> Nullable<Uuid>,
        territory_id -> Uuid,
        country_id -> Uuid,
        station_code -> Varchar,
        identity_number -> Varchar,
        qr_code -> Varchar,
        name -> Varchar,
        address -> Text,
        city -> Varchar,
        latitude -> Nullable<Float8>,
        longitude -> Nullable<Float8>,
        operational_status -> Varchar,
        health_status -> Varchar,
        installation_date -> Nullable<Date>,
        last_maintenance_at -> Nullable<Timestamptz>,
        firmware_version -> Nullable<Varchar>,
        operating_hours -> Jsonb,
        notes -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    station_bills (id) {
        id -> Uuid,
        station_id -> Uuid,
        bill_type -> Varchar,
        vendor_name -> Varchar,
        bill_number -> Nullable<Varchar>,
        billing_period_start -> Nullable<Date>,
        billing_period_end -> Nullable<Date>,
        due_date -> Date,
        amount -> Numeric,
        vat -> Numeric,
        total_amount -> Numeric,
        currency -> Varchar,
        status -> Varchar,
        paid_amount -> Numeric,
        payment_date -> Nullable<Date>,
        payment_method -> Nullable<Varchar>,
        payment_reference -> Nullable<Varchar>,
        is_recurring -> Bool,
        notes -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    station_assets (id) {
        id -> Uuid,
        station_id -> Uuid,
        asset_tag -> Varchar,
        asset_type -> Varchar,
        name -> Varchar,
        manufacturer -> Nullable<Varchar>,
        model -> Nullable<Varchar>,
        serial_number -> Nullable<Varchar>,
        purchase_date -> Nullable<Date>,
        purchase_cost -> Nullable<Numeric>,
        currency -> Varchar,
        warranty_expiry -> Nullable<Date>,
        status -> Varchar,
        last_maintenance_date -> Nullable<Date>,
        next_maintenance_date -> Nullable<Date>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    spare_parts (id) {
        id -> Uuid,
        part_number -> Varchar,
        name -> Varchar,
        category -> Varchar,
        description -> Nullable<Text>,
        unit_cost -> Numeric,
        currency -> Varchar,
        quantity_in_stock -> Int4,
        reorder_point -> Int4,
        minimum_stock_level -> Int4,
        supplier_name -> Nullable<Varchar>,
        lead_time_days -> Nullable<Int4>,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    station_spare_parts (id) {
        id -> Uuid,
        station_id -> Uuid,
        spare_part_id -> Uuid,
        quantity -> Int4,
        minimum_quantity -> Int4,
        last_restocked_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    inventory_movements (id) {
        id -> Uuid,
        spare_part_id -> Uuid,
        station_id -> Nullable<Uuid>,
        movement_type -> Varchar,
        quantity -> Int4,
        reason -> Nullable<Text>,
        performed_by -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    maintenance_work_orders (id) {
        id -> Uuid,
        work_order_number -> Varchar,
        station_id -> Uuid,
        asset_id -> Nullable<Uuid>,
        title -> Varchar,
        description -> Nullable<Text>,
        work_type -> Varchar,
        priority -> Varchar,
        status -> Varchar,
        assigned_to -> Nullable<Varchar>,
        scheduled_date -> Nullable<Date>,
        started_at -> Nullable<Timestamptz>,
        completed_at -> Nullable<Timestamptz>,
        labor_hours -> Numeric,
        labor_cost -> Numeric,
        parts_cost -> Numeric,
        total_cost -> Numeric,
        currency -> Varchar,
        parts_used -> Jsonb,
        resolution_notes -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    subscription_plans (id) {
        id -> Uuid,
        name -> Varchar,
        description -> Nullable<Text>,
        price -> Numeric,
        currency -> Varchar,
        billing_interval -> Varchar,
        wash_credits_per_period -> Int4,
        discount_percent -> Numeric,
        trial_days -> Int4,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    user_subscriptions (id) {
        id -> Uuid,
        user_id -> Varchar,
        plan_id -> Uuid,
        status -> Varchar,
        current_period_start -> Timestamptz,
        current_period_end -> Timestamptz,
        wash_credits_remaining -> Int4,
        cancel_at_period_end -> Bool,
        cancelled_at -> Nullable<Timestamptz>,
        trial_ends_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    station_telemetry (id) {
        id -> Uuid,
        station_id -> Uuid,
        recorded_at -> Timestamptz,
        water_pressure_psi -> Nullable<Float8>,
        water_temperature_c -> Nullable<Float8>,
        power_consumption_kw -> Nullable<Float8>,
        water_flow_lpm -> Nullable<Float8>,
        shampoo_level_percent -> Nullable<Float8>,
        conditioner_level_percent -> Nullable<Float8>,
        is_online -> Bool,
        error_codes -> Array<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    station_alerts (id) {
        id -> Uuid,
        station_id -> Uuid,
        alert_type -> Varchar,
        severity -> Varchar,
        title -> Varchar,
        message -> Text,
        status -> Varchar,
        work_order_id -> Nullable<Uuid>,
        source_telemetry_id -> Nullable<Uuid>,
        notifications_sent -> Jsonb,
        acknowledged_at -> Nullable<Timestamptz>,
        acknowledged_by -> Nullable<Varchar>,
        resolved_at -> Nullable<Timestamptz>,
        resolved_by -> Nullable<Varchar>,
        resolution_notes -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    station_performance_metrics (id) {
        id -> Uuid,
        station_id -> Uuid,
        metric_date -> Date,
        total_washes -> Int4,
        revenue -> Numeric,
        currency -> Varchar,
        average_wash_duration_sec -> Nullable<Int4>,
        uptime_percent -> Nullable<Numeric>,
        water_usage_liters -> Nullable<Numeric>,
        energy_usage_kwh -> Nullable<Numeric>,
        customer_rating -> Nullable<Numeric>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(franchise_territories -> countries (country_id));
diesel::joinable!(franchisees -> countries (country_id));
diesel::joinable!(franchisees -> franchise_territories (territory_id));
diesel::joinable!(pet_wash_stations -> franchisees (franchisee_id));
diesel::joinable!(pet_wash_stations -> franchise_territories (territory_id));
diesel::joinable!(pet_wash_stations -> countries (country_id));
diesel::joinable!(station_bills -> pet_wash_stations (station_id));
diesel::joinable!(station_assets -> pet_wash_stations (station_id));
diesel::joinable!(station_spare_parts -> pet_wash_stations (station_id));
diesel::joinable!(station_spare_parts -> spare_parts (spare_part_id));
diesel::joinable!(inventory_movements -> spare_parts (spare_part_id));
diesel::joinable!(inventory_movements -> pet_wash_stations (station_id));
diesel::joinable!(maintenance_work_orders -> pet_wash_stations (station_id));
diesel::joinable!(maintenance_work_orders -> station_assets (asset_id));
diesel::joinable!(user_subscriptions -> subscription_plans (plan_id));
diesel::joinable!(station_telemetry -> pet_wash_stations (station_id));
diesel::joinable!(station_alerts -> pet_wash_stations (station_id));
diesel::joinable!(station_alerts -> maintenance_work_orders (work_order_id));
diesel::joinable!(station_alerts -> station_telemetry (source_telemetry_id));
diesel::joinable!(station_performance_metrics -> pet_wash_stations (station_id));
