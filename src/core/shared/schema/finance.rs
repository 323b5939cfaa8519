use super::enterprise::{franchisees, pet_wash_stations};

diesel::table! {
    accounts_payable (id) {
        id -> Uuid,
        vendor_name -> Varchar,
        invoice_number -> Varchar,
        description -> Nullable<Text>,
        category -> Varchar,
        station_id -> Nullable<Uuid>,
        franchisee_id -> Nullable<Uuid>,
        amount -> Numeric,
        vat -> Numeric,
        total_amount -> Numeric,
        currency -> Varchar,
        due_date -> Date,
        status -> Varchar,
        paid_amount -> Numeric,
        payment_date -> Nullable<Date>,
        payment_method -> Nullable<Varchar>,
        payment_reference -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    ledger_entries (id) {
        id -> Uuid,
        entry_date -> Date,
        account_code -> Varchar,
        description -> Text,
        debit -> Numeric,
        credit -> Numeric,
        currency -> Varchar,
        source_type -> Varchar,
        source_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    electronic_invoices (id) {
        id -> Uuid,
        invoice_number -> Varchar,
        station_id -> Nullable<Uuid>,
        franchisee_id -> Nullable<Uuid>,
        customer_name -> Varchar,
        customer_tax_id -> Nullable<Varchar>,
        issue_date -> Date,
        amount_before_vat -> Numeric,
        vat_rate -> Numeric,
        vat_amount -> Numeric,
        total_amount -> Numeric,
        currency -> Varchar,
        requires_allocation -> Bool,
        ita_submission_status -> Varchar,
        ita_allocation_number -> Nullable<Varchar>,
        ita_submission_attempts -> Int4,
        ita_last_error -> Nullable<Text>,
        ita_submitted_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(accounts_payable -> pet_wash_stations (station_id));
diesel::joinable!(accounts_payable -> franchisees (franchisee_id));
diesel::joinable!(electronic_invoices -> pet_wash_stations (station_id));
diesel::joinable!(electronic_invoices -> franchisees (franchisee_id));
