//! Reference data every deployment starts with. Seeding is idempotent: rows
//! whose natural key already exists are left untouched.

use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use uuid::Uuid;

use crate::core::shared::schema::{countries, subscription_plans};
use crate::core::shared::DbConn;
use crate::geography::Country;
use crate::subscriptions::{BillingInterval, SubscriptionPlan};

struct CountrySeed {
    code: &'static str,
    name: &'static str,
    currency_code: &'static str,
    timezone: &'static str,
    vat_rate: i64,
}

const COUNTRIES: &[CountrySeed] = &[
    CountrySeed {
        code: "IL",
        name: "Israel",
        currency_code: "ILS",
        timezone: "Asia/Jerusalem",
        vat_rate: 18,
    },
    CountrySeed {
        code: "US",
        name: "United States",
        currency_code: "USD",
        timezone: "America/New_York",
        vat_rate: 0,
    },
    CountrySeed {
        code: "GB",
        name: "United Kingdom",
        currency_code: "GBP",
        timezone: "Europe/London",
        vat_rate: 20,
    },
    CountrySeed {
        code: "AU",
        name: "Australia",
        currency_code: "AUD",
        timezone: "Australia/Sydney",
        vat_rate: 10,
    },
];

struct PlanSeed {
    name: &'static str,
    description: &'static str,
    price: i64,
    interval: BillingInterval,
    credits: i32,
    discount_percent: i64,
    trial_days: i32,
}

const PLANS: &[PlanSeed] = &[
    PlanSeed {
        name: "Basic Monthly",
        description: "4 washes a month",
        price: 120,
        interval: BillingInterval::Monthly,
        credits: 4,
        discount_percent: 0,
        trial_days: 7,
    },
    PlanSeed {
        name: "Premium Monthly",
        description: "10 washes a month with premium shampoo",
        price: 250,
        interval: BillingInterval::Monthly,
        credits: 10,
        discount_percent: 10,
        trial_days: 7,
    },
    PlanSeed {
        name: "Family Yearly",
        description: "120 washes a year for multi-pet households",
        price: 2400,
        interval: BillingInterval::Yearly,
        credits: 120,
        discount_percent: 20,
        trial_days: 0,
    },
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub countries_inserted: usize,
    pub plans_inserted: usize,
}

pub fn seed_reference_data(conn: &mut DbConn) -> QueryResult<SeedReport> {
    conn.transaction(|conn| {
        let now = Utc::now();

        let country_rows: Vec<Country> = COUNTRIES
            .iter()
            .map(|c| Country {
                id: Uuid::new_v4(),
                code: c.code.to_string(),
                name: c.name.to_string(),
                currency_code: c.currency_code.to_string(),
                timezone: c.timezone.to_string(),
                vat_rate: BigDecimal::from(c.vat_rate),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .collect();
        let countries_inserted = diesel::insert_into(countries::table)
            .values(&country_rows)
            .on_conflict(countries::code)
            .do_nothing()
            .execute(conn)?;

        let plan_rows: Vec<SubscriptionPlan> = PLANS
            .iter()
            .map(|p| SubscriptionPlan {
                id: Uuid::new_v4(),
                name: p.name.to_string(),
                description: Some(p.description.to_string()),
                price: BigDecimal::from(p.price),
                currency: "ILS".to_string(),
                billing_interval: p.interval,
                wash_credits_per_period: p.credits,
                discount_percent: BigDecimal::from(p.discount_percent),
                trial_days: p.trial_days,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .collect();
        let plans_inserted = diesel::insert_into(subscription_plans::table)
            .values(&plan_rows)
            .on_conflict(subscription_plans::name)
            .do_nothing()
            .execute(conn)?;

        info!(
            "Seeded {} countries and {} subscription plans",
            countries_inserted, plans_inserted
        );
        Ok(SeedReport {
            countries_inserted,
            plans_inserted,
        })
    })
}
